// ==========================================
// 计费主数据导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;

        Ok(())
    }

    /// 读取并解析配置值,缺省时返回默认值
    ///
    /// 值存在但无法解析 → FieldValueError（不静默回落到默认值）
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| RepositoryError::FieldValueError {
                    field: key.to_string(),
                    message: format!("配置值无法解析 ({}): {}", raw, e),
                }),
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_decimal_scale(&self) -> RepositoryResult<u32> {
        self.get_parsed_or_default(config_keys::DECIMAL_SCALE, 2)
    }

    async fn get_date_offset_minutes(&self) -> RepositoryResult<i32> {
        self.get_parsed_or_default(config_keys::DATE_OFFSET_MINUTES, 0)
    }

    async fn get_max_data_rows(&self) -> RepositoryResult<usize> {
        self.get_parsed_or_default(config_keys::MAX_DATA_ROWS, 10_000)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 定点小数精度
    pub const DECIMAL_SCALE: &str = "import.decimal_scale";

    // 裸日期时区偏移（分钟）
    pub const DATE_OFFSET_MINUTES: &str = "import.date_offset_minutes";

    // 单次导入数据行上限
    pub const MAX_DATA_ROWS: &str = "import.max_data_rows";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup() -> (tempfile::NamedTempFile, ConfigManager) {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let conn = open_sqlite_connection(&db_path).unwrap();
        init_schema(&conn).unwrap();
        let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap();
        (temp_file, manager)
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let (_tmp, manager) = setup();
        let settings = manager.load_import_settings().await.unwrap();
        assert_eq!(settings.decimal_scale, 2);
        assert_eq!(settings.date_offset.local_minus_utc(), 0);
        assert_eq!(settings.max_data_rows, 10_000);
    }

    #[tokio::test]
    async fn test_overrides_are_read() {
        let (_tmp, manager) = setup();
        manager
            .set_global_config_value(config_keys::DECIMAL_SCALE, "4")
            .unwrap();
        manager
            .set_global_config_value(config_keys::DATE_OFFSET_MINUTES, "-300")
            .unwrap();
        manager
            .set_global_config_value(config_keys::MAX_DATA_ROWS, " 25 ")
            .unwrap();

        let settings = manager.load_import_settings().await.unwrap();
        assert_eq!(settings.decimal_scale, 4);
        assert_eq!(settings.date_offset.local_minus_utc(), -300 * 60);
        assert_eq!(settings.max_data_rows, 25);
    }

    #[tokio::test]
    async fn test_malformed_value_surfaces_error() {
        let (_tmp, manager) = setup();
        manager
            .set_global_config_value(config_keys::DECIMAL_SCALE, "two")
            .unwrap();

        let err = manager.get_decimal_scale().await.unwrap_err();
        match err {
            RepositoryError::FieldValueError { field, .. } => {
                assert_eq!(field, config_keys::DECIMAL_SCALE)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
