// ==========================================
// 计费主数据导入系统 - 配置层
// ==========================================
// 职责: 导入参数读取（精度、时区偏移、行数上限）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ImportConfigReader, ImportSettings, MAX_DECIMAL_SCALE};
