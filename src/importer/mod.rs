// ==========================================
// 计费主数据导入系统 - 导入层
// ==========================================
// 职责: CSV 载荷 → 结构检查 → 类型化校验 → 整批提交
// 支持: 17 个实体族（见 catalog）
// ==========================================

// 模块声明
pub mod catalog;
pub mod conflict_handler;
pub mod error;
pub mod error_collector;
pub mod header_validator;
pub mod master_data_importer_impl;
pub mod master_data_importer_trait;
pub mod row_validator;

// 重导出核心类型
pub use catalog::spec_for;
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use error::{ImportError, ImportResult, StructuralError};
pub use error_collector::ErrorCollector;
pub use header_validator::{ColumnIndex, HeaderValidator as HeaderValidatorImpl, ParsedPayload, RawRow};
pub use master_data_importer_impl::MasterDataImporterImpl;
pub use row_validator::RowValidator as RowValidatorImpl;

// 重导出 Trait 接口
pub use master_data_importer_trait::{
    ConflictHandler, HeaderValidator, MasterDataImporter, RowValidator,
};
