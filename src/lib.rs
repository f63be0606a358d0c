// ==========================================
// 计费主数据导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 计费后台主数据的批量 CSV 导入引擎（整批提交或整批拒绝）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 导入规格与记录
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 校验与提交编排
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 导入接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AssociatedDataType, EntityKind, FieldValue, ImportOutcome, ImportSpec, PackageAssociationType,
    ProductType, RowError,
};

// 导入器
pub use importer::{ImportError, MasterDataImporter, MasterDataImporterImpl, StructuralError};

// API
pub use api::{ApiError, ImportApi, ImportRequest, ImportResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "计费主数据导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
