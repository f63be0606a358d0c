// ==========================================
// 计费主数据导入系统 - 主数据导入器实现（导入编排）
// ==========================================
// 职责: 串联导入流程,给出唯一的结构化结果
// 流程: 结构检查 → 读配置（行数上限）→ 加载键集合 → 逐行校验 → 批内规则 → 归并 → 整批提交/整批拒绝
// 状态: Idle → HeaderChecked → RowsValidated → {Committed | Rejected}（无外部可见中间态）
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import_record::{ImportOutcome, TypedRow, ValidatedRow};
use crate::domain::types::EntityKind;
use crate::importer::catalog::spec_for;
use crate::importer::conflict_handler::ConflictHandler as DefaultConflictHandler;
use crate::importer::error::ImportResult;
use crate::importer::error_collector::ErrorCollector;
use crate::importer::header_validator::HeaderValidator as DefaultHeaderValidator;
use crate::importer::master_data_importer_trait::{
    ConflictHandler, HeaderValidator, MasterDataImporter, RowValidator,
};
use crate::importer::row_validator::RowValidator as DefaultRowValidator;
use crate::repository::MasterDataRepository;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

// ==========================================
// MasterDataImporterImpl - 主数据导入器实现
// ==========================================
pub struct MasterDataImporterImpl<R, C>
where
    R: MasterDataRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    repo: R,

    // 配置读取器
    config: C,

    // 导入组件
    header_validator: Box<dyn HeaderValidator>,
    row_validator: Box<dyn RowValidator>,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl<R, C> MasterDataImporterImpl<R, C>
where
    R: MasterDataRepository,
    C: ImportConfigReader,
{
    /// 创建新的 MasterDataImporter 实例
    ///
    /// # 参数
    /// - repo: 主数据仓储
    /// - config: 配置读取器
    /// - header_validator: 表头校验器
    /// - row_validator: 行校验器
    /// - conflict_handler: 批内冲突处理器
    pub fn new(
        repo: R,
        config: C,
        header_validator: Box<dyn HeaderValidator>,
        row_validator: Box<dyn RowValidator>,
        conflict_handler: Box<dyn ConflictHandler>,
    ) -> Self {
        Self {
            repo,
            config,
            header_validator,
            row_validator,
            conflict_handler,
        }
    }

    /// 使用默认组件创建
    pub fn with_default_components(repo: R, config: C) -> Self {
        Self::new(
            repo,
            config,
            Box::new(DefaultHeaderValidator),
            Box::new(DefaultRowValidator),
            Box::new(DefaultConflictHandler),
        )
    }
}

#[async_trait]
impl<R, C> MasterDataImporter for MasterDataImporterImpl<R, C>
where
    R: MasterDataRepository + Send + Sync,
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, payload), fields(entity = %entity, import_id = tracing::field::Empty))]
    async fn import(&self, entity: EntityKind, payload: &[u8]) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        let import_id = Uuid::new_v4().to_string();
        Span::current().record("import_id", import_id.as_str());

        info!(bytes = payload.len(), "开始导入主数据");

        let spec = spec_for(entity);

        // === 步骤 1: 结构检查（快速失败,不读配置、不访问存储）===
        debug!("步骤 1: 结构检查");
        let parsed = self
            .header_validator
            .parse(payload, spec)
            .map_err(|e| {
                warn!(error = %e, "载荷结构错误,未评估任何数据行");
                e
            })?;
        let total_rows = parsed.rows.len();

        // 配置快照只在结构通过后读取,本次导入内不变
        let settings = self.config.load_import_settings().await?;
        debug!(
            decimal_scale = settings.decimal_scale,
            date_offset = %settings.date_offset,
            max_data_rows = settings.max_data_rows,
            "导入配置已加载"
        );
        self.header_validator
            .check_row_limit(&parsed, &settings)
            .map_err(|e| {
                warn!(error = %e, "数据行数超出上限");
                e
            })?;

        // === 步骤 2: 加载键集合（每个键空间一次）===
        debug!("步骤 2: 加载键集合");
        let keys = self.repo.fetch_reference_keys(&spec.key_spaces()).await?;

        // === 步骤 3: 逐行校验（不短路）===
        debug!("步骤 3: 逐行校验");
        let mut validated: Vec<ValidatedRow> = parsed
            .rows
            .iter()
            .map(|row| {
                self.row_validator
                    .validate_row(row, &parsed.index, spec, &keys, &settings)
            })
            .collect();

        // === 步骤 4: 批内规则 ===
        debug!("步骤 4: 批内规则");
        let conflicts = self.conflict_handler.check_batch(spec, &validated);

        // === 步骤 5: 错误归并 ===
        let mut collector = ErrorCollector::new();
        for row in &mut validated {
            let row_number = row.row_number;
            collector.record_all(row_number, std::mem::take(&mut row.errors));
        }
        for (row_number, conflict) in conflicts {
            collector.record(row_number, conflict);
        }

        if !collector.is_clean() {
            let errors = collector.into_row_errors();
            warn!(
                rows = total_rows,
                errors = errors.len(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "校验未通过,整批拒绝"
            );
            return Ok(ImportOutcome::rejected(errors));
        }

        // === 步骤 6: 整批提交 ===
        debug!("步骤 6: 整批提交");
        let rows: Vec<TypedRow> = validated.into_iter().map(ValidatedRow::into_typed).collect();
        let imported_count = self.repo.commit_batch(spec, rows).await.map_err(|e| {
            error!(error = %e, "提交失败,事务已回滚");
            e
        })?;

        info!(
            rows = total_rows,
            imported = imported_count,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "导入完成"
        );

        Ok(ImportOutcome::committed(imported_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::domain::import_spec::{ImportSpec, KeySpace};
    use crate::importer::error::{ImportError, StructuralError};
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CallCounts {
        config_reads: AtomicUsize,
        fetches: AtomicUsize,
        commits: AtomicUsize,
        committed_rows: AtomicUsize,
    }

    struct RecordingRepo {
        calls: Arc<CallCounts>,
        fail_commit: bool,
    }

    #[async_trait]
    impl MasterDataRepository for RecordingRepo {
        async fn fetch_key_set(&self, _space: KeySpace) -> RepositoryResult<HashSet<String>> {
            self.calls.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(HashSet::new())
        }

        async fn commit_batch(
            &self,
            _spec: &'static ImportSpec,
            rows: Vec<TypedRow>,
        ) -> RepositoryResult<usize> {
            self.calls.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail_commit {
                return Err(RepositoryError::DatabaseTransactionError("disk full".to_string()));
            }
            self.calls.committed_rows.fetch_add(rows.len(), Ordering::SeqCst);
            Ok(rows.len())
        }
    }

    struct CountingConfig {
        calls: Arc<CallCounts>,
        malformed: bool,
    }

    #[async_trait]
    impl ImportConfigReader for CountingConfig {
        async fn get_decimal_scale(&self) -> RepositoryResult<u32> {
            self.calls.config_reads.fetch_add(1, Ordering::SeqCst);
            if self.malformed {
                return Err(RepositoryError::FieldValueError {
                    field: "import.decimal_scale".to_string(),
                    message: "two".to_string(),
                });
            }
            Ok(ImportSettings::default().decimal_scale)
        }

        async fn get_date_offset_minutes(&self) -> RepositoryResult<i32> {
            Ok(0)
        }

        async fn get_max_data_rows(&self) -> RepositoryResult<usize> {
            Ok(ImportSettings::default().max_data_rows)
        }
    }

    type TestImporter = MasterDataImporterImpl<RecordingRepo, CountingConfig>;

    fn build_importer(fail_commit: bool, malformed_config: bool) -> (Arc<CallCounts>, TestImporter) {
        let calls = Arc::new(CallCounts::default());
        let repo = RecordingRepo {
            calls: calls.clone(),
            fail_commit,
        };
        let config = CountingConfig {
            calls: calls.clone(),
            malformed: malformed_config,
        };
        (
            calls,
            MasterDataImporterImpl::with_default_components(repo, config),
        )
    }

    fn importer(fail_commit: bool) -> (Arc<CallCounts>, TestImporter) {
        build_importer(fail_commit, false)
    }

    const TAX_HEADER: &str = "tax_id,name,tax_percentage,tax_category,default_flag,is_archived";

    #[tokio::test]
    async fn test_clean_batch_is_committed() {
        let (calls, importer) = importer(false);
        let payload = format!("{}\n,VAT,8,1,true,false\n,GST,10,2,false,false", TAX_HEADER);

        let outcome = importer
            .import(EntityKind::Tax, payload.as_bytes())
            .await
            .unwrap();

        assert_eq!(outcome, ImportOutcome::committed(2));
        assert_eq!(calls.commits.load(Ordering::SeqCst), 1);
        // tax 只引用自身键空间
        assert_eq!(calls.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_structural_error_touches_no_storage() {
        let (calls, importer) = importer(false);
        let payload = "name,tax_id,tax_percentage,tax_category,default_flag,is_archived\nVAT,,8,1,true,false";

        let err = importer
            .import(EntityKind::Tax, payload.as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ImportError::Structural(StructuralError::UnknownColumnName { position: 1, .. })
        ));
        assert_eq!(calls.config_reads.load(Ordering::SeqCst), 0);
        assert_eq!(calls.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(calls.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_payload_wins_over_malformed_config() {
        let (calls, importer) = build_importer(false, true);

        let err = importer.import(EntityKind::Tax, b"").await.unwrap_err();

        assert!(matches!(
            err,
            ImportError::Structural(StructuralError::EmptyPayload)
        ));
        assert_eq!(calls.config_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_config_after_valid_structure_is_storage_error() {
        let (calls, importer) = build_importer(false, true);
        let payload = format!("{}\n,VAT,8,1,true,false", TAX_HEADER);

        let err = importer
            .import(EntityKind::Tax, payload.as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Storage(_)));
        assert_eq!(calls.config_reads.load(Ordering::SeqCst), 1);
        assert_eq!(calls.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_rows_reject_whole_batch() {
        let (calls, importer) = importer(false);
        let payload = format!(
            "{}\n,VAT,8,1,true,false\n,GST,a,2,false,false\n,PST,5,1,true,false",
            TAX_HEADER
        );

        let outcome = importer
            .import(EntityKind::Tax, payload.as_bytes())
            .await
            .unwrap();

        assert_eq!(outcome.imported_count, 0);
        let rows: Vec<usize> = outcome.errors.iter().map(|e| e.row_number).collect();
        assert_eq!(rows, vec![3, 4]);
        assert_eq!(outcome.errors[0].column.as_deref(), Some("tax_percentage"));
        assert_eq!(calls.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_field_and_rule_errors_merge_into_one_row_error() {
        let (_calls, importer) = importer(false);
        let payload = format!(
            "{}\n,VAT,8,1,true,false\n,,8,1,true,false",
            TAX_HEADER
        );

        let outcome = importer
            .import(EntityKind::Tax, payload.as_bytes())
            .await
            .unwrap();

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row_number, 3);
        assert_eq!(outcome.errors[0].column, None);
        assert!(outcome.errors[0].message.contains("; "));
    }

    #[tokio::test]
    async fn test_commit_failure_is_storage_error() {
        let (calls, importer) = importer(true);
        let payload = format!("{}\n,VAT,8,1,true,false", TAX_HEADER);

        let err = importer
            .import(EntityKind::Tax, payload.as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Storage(_)));
        assert_eq!(calls.committed_rows.load(Ordering::SeqCst), 0);
    }
}
