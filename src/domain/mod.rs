// ==========================================
// 计费主数据导入系统 - 领域模型层
// ==========================================
// 职责: 定义导入规格、类型化记录与结果
// 红线: 不含数据访问逻辑
// ==========================================

pub mod import_record;
pub mod import_spec;
pub mod types;

// 重导出核心类型
pub use import_record::{
    FieldError, FieldValue, ImportOutcome, RowError, TypedRow, ValidatedRow,
};
pub use import_spec::{
    BatchRule, ColumnKind, ColumnSpec, EnumTable, ImportSpec, KeyMode, KeySpace, ReferenceKeys,
};
pub use types::{AssociatedDataType, EntityKind, PackageAssociationType, ProductType};
