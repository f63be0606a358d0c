// ==========================================
// 计费主数据导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{FixedOffset, Offset, Utc};

/// rust_decimal 支持的最大小数位数
pub const MAX_DECIMAL_SCALE: u32 = 28;

// ==========================================
// ImportSettings - 单次导入的配置快照
// ==========================================
// 导入开始时读取一次,之后不可变
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    /// 定点小数精度
    pub decimal_scale: u32,
    /// 裸日期（无时区）所在的时区偏移
    pub date_offset: FixedOffset,
    /// 数据行数上限
    pub max_data_rows: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            decimal_scale: 2,
            date_offset: Utc.fix(),
            max_data_rows: 10_000,
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 定点小数精度
    ///
    /// # 默认值
    /// - 2
    async fn get_decimal_scale(&self) -> RepositoryResult<u32>;

    /// 裸日期解释用的时区偏移（分钟,东正西负）
    ///
    /// # 默认值
    /// - 0（UTC 零点）
    async fn get_date_offset_minutes(&self) -> RepositoryResult<i32>;

    /// 单次导入允许的最大数据行数
    ///
    /// # 默认值
    /// - 10000
    async fn get_max_data_rows(&self) -> RepositoryResult<usize>;

    /// 组装配置快照（结构检查通过后调用一次）
    async fn load_import_settings(&self) -> RepositoryResult<ImportSettings> {
        let decimal_scale = self.get_decimal_scale().await?;
        if decimal_scale > MAX_DECIMAL_SCALE {
            return Err(RepositoryError::FieldValueError {
                field: "import.decimal_scale".to_string(),
                message: format!("精度超出范围 (0..={}): {}", MAX_DECIMAL_SCALE, decimal_scale),
            });
        }

        let offset_minutes = self.get_date_offset_minutes().await?;
        let date_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| RepositoryError::FieldValueError {
                field: "import.date_offset_minutes".to_string(),
                message: format!("时区偏移超出范围: {}", offset_minutes),
            })?;

        let max_data_rows = self.get_max_data_rows().await?;

        Ok(ImportSettings {
            decimal_scale,
            date_offset,
            max_data_rows,
        })
    }
}
