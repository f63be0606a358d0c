// ==========================================
// 主数据导入API
// ==========================================
// 职责: 每个实体族一个导入入口,统一返回 ImportResponse
// 约定: 行级错误随 Ok 返回（imported_count = 0）;结构/系统错误走 ApiError
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::open_sqlite_connection;
use crate::domain::import_record::{ImportOutcome, RowError};
use crate::domain::types::{
    AssociatedDataType, EntityKind, PackageAssociationType, ProductType,
};
use crate::importer::{MasterDataImporter, MasterDataImporterImpl};
use crate::repository::MasterDataRepositoryImpl;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// 导入请求
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub entity: EntityKind,
    /// 原始 CSV 字节
    pub payload: Vec<u8>,
}

/// 导入响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResponse {
    /// 提交的行数（有错误时为 0）
    pub imported_count: usize,
    /// 行级错误（按行号升序）
    pub errors: Vec<RowError>,
}

impl From<ImportOutcome> for ImportResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            imported_count: outcome.imported_count,
            errors: outcome.errors,
        }
    }
}

/// 导入API
pub struct ImportApi {
    importer: MasterDataImporterImpl<MasterDataRepositoryImpl, ConfigManager>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建（仓储与配置共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())?;
        let repo = MasterDataRepositoryImpl::from_connection(conn);

        Ok(Self {
            importer: MasterDataImporterImpl::with_default_components(repo, config),
        })
    }

    /// 通用导入入口
    #[instrument(skip(self, request), fields(entity = %request.entity))]
    pub async fn import(&self, request: ImportRequest) -> ApiResult<ImportResponse> {
        let outcome = self
            .importer
            .import(request.entity, &request.payload)
            .await?;

        info!(
            committed = outcome.is_clean(),
            imported = outcome.imported_count,
            errors = outcome.errors.len(),
            "导入请求完成"
        );

        Ok(outcome.into())
    }

    async fn import_entity(&self, entity: EntityKind, payload: &[u8]) -> ApiResult<ImportResponse> {
        self.import(ImportRequest {
            entity,
            payload: payload.to_vec(),
        })
        .await
    }

    // ===== 参考表 =====

    pub async fn import_tax(&self, payload: &[u8]) -> ApiResult<ImportResponse> {
        self.import_entity(EntityKind::Tax, payload).await
    }

    pub async fn import_discount(&self, payload: &[u8]) -> ApiResult<ImportResponse> {
        self.import_entity(EntityKind::Discount, payload).await
    }

    pub async fn import_billing_schedule(&self, payload: &[u8]) -> ApiResult<ImportResponse> {
        self.import_entity(EntityKind::BillingSchedule, payload).await
    }

    pub async fn import_billing_schedule_period(
        &self,
        payload: &[u8],
    ) -> ApiResult<ImportResponse> {
        self.import_entity(EntityKind::BillingSchedulePeriod, payload)
            .await
    }

    pub async fn import_billing_ratio(&self, payload: &[u8]) -> ApiResult<ImportResponse> {
        self.import_entity(EntityKind::BillingRatio, payload).await
    }

    pub async fn import_accounting_category(&self, payload: &[u8]) -> ApiResult<ImportResponse> {
        self.import_entity(EntityKind::AccountingCategory, payload)
            .await
    }

    /// 导入产品（fee / material / package）
    pub async fn import_product(
        &self,
        product_type: ProductType,
        payload: &[u8],
    ) -> ApiResult<ImportResponse> {
        self.import_entity(product_type.into(), payload).await
    }

    // ===== 关联表 =====

    pub async fn import_product_price(&self, payload: &[u8]) -> ApiResult<ImportResponse> {
        self.import_entity(EntityKind::ProductPrice, payload).await
    }

    /// 导入产品关联数据（location / grade / accounting category / discount / course）
    pub async fn import_product_associated_data(
        &self,
        data_type: AssociatedDataType,
        payload: &[u8],
    ) -> ApiResult<ImportResponse> {
        self.import_entity(data_type.into(), payload).await
    }

    /// 导入课程包关联（fee / material）
    pub async fn import_package_association(
        &self,
        association_type: PackageAssociationType,
        payload: &[u8],
    ) -> ApiResult<ImportResponse> {
        self.import_entity(association_type.into(), payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization() {
        let response = ImportResponse::from(ImportOutcome::rejected(vec![RowError {
            row_number: 3,
            column: None,
            message: "tax_percentage: 无法解析为小数: a".to_string(),
        }]));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["imported_count"], 0);
        assert_eq!(json["errors"][0]["row_number"], 3);
        assert!(json["errors"][0].get("column").is_none());
    }
}
