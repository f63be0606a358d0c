// ==========================================
// 计费主数据导入系统 - 主数据 Repository 实现
// ==========================================
// 职责: 实现键集合读取与整批提交（使用 rusqlite）
// 提交策略:
// - ById: 空 ID → 生成 UUID 新建;有 ID → 原地更新,保留 created_at
// - ByNaturalKey: 按自然键（NULL 安全比较）覆盖属性并重置时间戳,未命中则新建
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import_record::{FieldValue, TypedRow};
use crate::domain::import_spec::{ImportSpec, KeyMode, KeySpace};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::master_data_repo::MasterDataRepository;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

// ==========================================
// MasterDataRepositoryImpl
// ==========================================
pub struct MasterDataRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl MasterDataRepositoryImpl {
    /// 创建新的 Repository 实例
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

    /// 从已有连接创建（与 ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 在事务中按 ID 新建或更新
    fn commit_by_id_tx(
        tx: &Transaction,
        spec: &ImportSpec,
        id_column: &str,
        rows: Vec<TypedRow>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let id_pos = spec
            .position(id_column)
            .ok_or_else(|| RepositoryError::FieldValueError {
                field: id_column.to_string(),
                message: format!("{} 缺少 ID 列", spec.table),
            })?;
        let attributes = spec.attribute_columns();

        let mut insert_stmt = tx.prepare(&insert_sql(spec))?;
        let mut update_stmt = tx.prepare(&format!(
            "UPDATE {} SET {}, updated_at = ?{} WHERE {} = ?{}",
            spec.table,
            assignments(&attributes),
            attributes.len() + 1,
            id_column,
            attributes.len() + 2,
        ))?;
        let mut created_stmt = tx.prepare(&format!(
            "SELECT created_at FROM {} WHERE {} = ?1",
            spec.table, id_column
        ))?;

        let (mut inserted, mut updated) = (0usize, 0usize);

        for row in rows {
            let mut values = row.values;

            match values.get(id_pos).and_then(FieldValue::key_text) {
                None => {
                    values[id_pos] = FieldValue::Text(Uuid::new_v4().to_string());
                    values.push(FieldValue::Date(now));
                    values.push(FieldValue::Date(now));
                    insert_stmt.execute(params_from_iter(values.iter()))?;
                    inserted += 1;
                }
                Some(id) => {
                    let created_at: DateTime<Utc> = created_stmt
                        .query_row(params![id], |r| r.get(0))
                        .optional()?
                        .ok_or_else(|| RepositoryError::NotFound {
                            entity: spec.table.to_string(),
                            id: id.clone(),
                        })?;

                    let mut bound: Vec<FieldValue> = values
                        .into_iter()
                        .enumerate()
                        .filter(|(pos, _)| *pos != id_pos)
                        .map(|(_, v)| v)
                        .collect();
                    bound.push(FieldValue::Date(advance_past(now, created_at)));
                    bound.push(FieldValue::Text(id));

                    update_stmt.execute(params_from_iter(bound.iter()))?;
                    updated += 1;
                }
            }
        }

        debug!(table = spec.table, inserted, updated, "按 ID 提交完成");
        Ok(inserted + updated)
    }

    /// 在事务中按自然键覆盖或新建
    fn commit_by_natural_key_tx(
        tx: &Transaction,
        spec: &ImportSpec,
        key_columns: &[&str],
        rows: Vec<TypedRow>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let key_positions: Vec<usize> = key_columns
            .iter()
            .filter_map(|name| spec.position(name))
            .collect();
        let attributes = spec.attribute_columns();
        let attr_positions: Vec<usize> = attributes
            .iter()
            .filter_map(|name| spec.position(name))
            .collect();

        // SET 子句: 属性列 + created_at + updated_at
        let mut set_clause = attributes
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} = ?{}", name, i + 1))
            .collect::<Vec<_>>();
        let ts_param = attributes.len() + 1;
        set_clause.push(format!("created_at = ?{}", ts_param));
        set_clause.push(format!("updated_at = ?{}", ts_param));

        // IS 比较: NULL 与 NULL 视为相等
        let where_clause = key_columns
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} IS ?{}", name, ts_param + 1 + i))
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut update_stmt = tx.prepare(&format!(
            "UPDATE {} SET {} WHERE {}",
            spec.table,
            set_clause.join(", "),
            where_clause
        ))?;
        let mut insert_stmt = tx.prepare(&insert_sql(spec))?;

        let (mut inserted, mut overwritten) = (0usize, 0usize);

        let stamp = FieldValue::Date(now);

        for row in rows {
            let changed = {
                let bound: Vec<&FieldValue> = attr_positions
                    .iter()
                    .map(|pos| &row.values[*pos])
                    .chain(std::iter::once(&stamp))
                    .chain(key_positions.iter().map(|pos| &row.values[*pos]))
                    .collect();
                update_stmt.execute(params_from_iter(bound.iter()))?
            };
            if changed > 0 {
                overwritten += 1;
                continue;
            }

            let mut values = row.values;
            values.push(FieldValue::Date(now));
            values.push(FieldValue::Date(now));
            insert_stmt.execute(params_from_iter(values.iter()))?;
            inserted += 1;
        }

        debug!(table = spec.table, inserted, overwritten, "按自然键提交完成");
        Ok(inserted + overwritten)
    }
}

/// INSERT 语句: 全部列 + created_at + updated_at
fn insert_sql(spec: &ImportSpec) -> String {
    let columns = spec.header();
    let placeholders = (1..=columns.len() + 2)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}, created_at, updated_at) VALUES ({})",
        spec.table,
        columns.join(", "),
        placeholders
    )
}

fn assignments(columns: &[&str]) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = ?{}", name, i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 保证 updated_at 严格晚于 created_at（时钟回拨或同一时刻）
fn advance_past(now: DateTime<Utc>, created_at: DateTime<Utc>) -> DateTime<Utc> {
    if now > created_at {
        now
    } else {
        created_at + Duration::microseconds(1)
    }
}

#[async_trait]
impl MasterDataRepository for MasterDataRepositoryImpl {
    async fn fetch_key_set(&self, space: KeySpace) -> RepositoryResult<HashSet<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt = conn.prepare(space.key_query())?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        debug!(key_space = %space, keys = keys.len(), "键集合加载完成");
        Ok(keys)
    }

    async fn commit_batch(
        &self,
        spec: &'static ImportSpec,
        rows: Vec<TypedRow>,
    ) -> RepositoryResult<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let now = Utc::now();
        // 出错时 tx 被 drop,自动回滚
        let count = match spec.key_mode {
            KeyMode::ById { id_column, .. } => {
                Self::commit_by_id_tx(&tx, spec, id_column, rows, now)?
            }
            KeyMode::ByNaturalKey(key_columns) => {
                Self::commit_by_natural_key_tx(&tx, spec, key_columns, rows, now)?
            }
        };

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::importer::catalog::{PRODUCT_LOCATION, PRODUCT_PRICE, TAX};
    use rust_decimal_macros::dec;

    fn setup() -> (Arc<Mutex<Connection>>, MasterDataRepositoryImpl) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO location (location_id, name) VALUES ('LOC-1', 'North'), ('LOC-2', 'South');
             INSERT INTO grade (grade_id, name) VALUES (1, 'G1');",
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let repo = MasterDataRepositoryImpl::from_connection(conn.clone());
        (conn, repo)
    }

    fn tax_row(row_number: usize, id: Option<&str>, name: &str) -> TypedRow {
        TypedRow {
            row_number,
            values: vec![
                id.map_or(FieldValue::Null, |v| FieldValue::Text(v.to_string())),
                FieldValue::Text(name.to_string()),
                FieldValue::Decimal(dec!(8.00)),
                FieldValue::Enum("TAX_CATEGORY_INCLUSIVE"),
                FieldValue::Boolean(false),
                FieldValue::Boolean(false),
            ],
        }
    }

    fn timestamps(conn: &Connection, sql: &str) -> (DateTime<Utc>, DateTime<Utc>) {
        conn.query_row(sql, [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_key_sets() {
        let (_conn, repo) = setup();
        let locations = repo.fetch_key_set(KeySpace::Location).await.unwrap();
        assert_eq!(locations.len(), 2);
        assert!(locations.contains("LOC-1"));

        let grades = repo.fetch_key_set(KeySpace::Grade).await.unwrap();
        assert!(grades.contains("1"));

        let keys = repo
            .fetch_reference_keys(&[KeySpace::Tax, KeySpace::Location, KeySpace::Tax])
            .await
            .unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[&KeySpace::Tax].is_empty());
    }

    #[tokio::test]
    async fn test_by_id_insert_then_update_preserves_created_at() {
        let (conn, repo) = setup();

        let count = repo
            .commit_batch(&TAX, vec![tax_row(2, None, "VAT")])
            .await
            .unwrap();
        assert_eq!(count, 1);

        let (tax_id, percentage): (String, String) = conn
            .lock()
            .unwrap()
            .query_row("SELECT tax_id, tax_percentage FROM tax", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert!(Uuid::parse_str(&tax_id).is_ok());
        assert_eq!(percentage, "8.00");

        let (created_before, updated_before) = timestamps(
            &conn.lock().unwrap(),
            "SELECT created_at, updated_at FROM tax",
        );
        assert_eq!(created_before, updated_before);

        repo.commit_batch(&TAX, vec![tax_row(2, Some(&tax_id), "VAT 2")])
            .await
            .unwrap();

        let guard = conn.lock().unwrap();
        let name: String = guard
            .query_row("SELECT name FROM tax WHERE tax_id = ?1", [&tax_id], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(name, "VAT 2");
        let (created_after, updated_after) =
            timestamps(&guard, "SELECT created_at, updated_at FROM tax");
        assert_eq!(created_after, created_before);
        assert!(updated_after > created_after);
    }

    #[tokio::test]
    async fn test_by_id_missing_record_aborts() {
        let (conn, repo) = setup();
        let err = repo
            .commit_batch(
                &TAX,
                vec![tax_row(2, None, "VAT"), tax_row(3, Some("gone"), "GST")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        let count: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM tax", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_natural_key_upsert_with_null_members() {
        let (conn, repo) = setup();
        let price_row = |price| TypedRow {
            row_number: 2,
            values: vec![
                FieldValue::Reference("FEE-1".to_string()),
                FieldValue::Null,
                FieldValue::Null,
                FieldValue::Decimal(price),
            ],
        };

        repo.commit_batch(&PRODUCT_PRICE, vec![price_row(dec!(10.00))])
            .await
            .unwrap();
        let (created_first, _) = timestamps(
            &conn.lock().unwrap(),
            "SELECT created_at, updated_at FROM product_price",
        );

        repo.commit_batch(&PRODUCT_PRICE, vec![price_row(dec!(12.50))])
            .await
            .unwrap();

        let guard = conn.lock().unwrap();
        let (rows, price): (i64, String) = guard
            .query_row("SELECT COUNT(*), MAX(price) FROM product_price", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(price, "12.50");

        let (created_second, updated_second) = timestamps(
            &guard,
            "SELECT created_at, updated_at FROM product_price",
        );
        assert!(created_second > created_first);
        assert_eq!(created_second, updated_second);
    }

    #[tokio::test]
    async fn test_storage_failure_rolls_back_whole_batch() {
        let (conn, repo) = setup();
        let link = |n: usize, location: &str| TypedRow {
            row_number: n,
            values: vec![
                FieldValue::Reference("FEE-1".to_string()),
                FieldValue::Reference(location.to_string()),
            ],
        };

        // LOC-9 违反外键
        let err = repo
            .commit_batch(&PRODUCT_LOCATION, vec![link(2, "LOC-1"), link(3, "LOC-9")])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));

        let count: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM product_location", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_advance_past() {
        let created = Utc::now();
        assert!(advance_past(created, created) > created);
        assert!(advance_past(created - Duration::seconds(5), created) > created);
        let later = created + Duration::seconds(1);
        assert_eq!(advance_past(later, created), later);
    }
}
