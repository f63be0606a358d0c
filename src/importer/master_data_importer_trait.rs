// ==========================================
// 计费主数据导入系统 - 导入器 Trait 定义
// ==========================================
// 职责: 定义导入流程及各阶段组件接口（不包含实现）
// 流程: 结构检查 → 逐行校验 → 批内规则 → 错误归并 → 整批提交
// ==========================================

use crate::config::ImportSettings;
use crate::domain::import_record::{FieldError, ImportOutcome, ValidatedRow};
use crate::domain::import_spec::{ImportSpec, ReferenceKeys};
use crate::domain::types::EntityKind;
use crate::importer::error::{ImportResult, StructuralError};
use crate::importer::header_validator::{ColumnIndex, ParsedPayload, RawRow};
use async_trait::async_trait;

// ==========================================
// MasterDataImporter Trait
// ==========================================
// 用途: 主数据导入主接口
// 实现者: MasterDataImporterImpl
#[async_trait]
pub trait MasterDataImporter: Send + Sync {
    /// 导入一个实体族的 CSV 载荷
    ///
    /// # 返回
    /// - Ok(ImportOutcome): errors 为空表示已整批提交;非空表示整批拒绝、未写入
    /// - Err(Structural): 载荷形状错误,未评估任何数据行
    /// - Err(Storage): 存储失败,事务已回滚
    async fn import(&self, entity: EntityKind, payload: &[u8]) -> ImportResult<ImportOutcome>;
}

// ==========================================
// HeaderValidator Trait
// ==========================================
// 用途: 载荷结构检查（快速失败）
// 实现者: header_validator::HeaderValidator
pub trait HeaderValidator: Send + Sync {
    /// 切分载荷并完成表头与列数检查（不依赖配置,不访问存储）
    fn parse(&self, payload: &[u8], spec: &ImportSpec) -> Result<ParsedPayload, StructuralError>;

    /// 数据行数上限检查（依赖已加载的配置）
    fn check_row_limit(
        &self,
        parsed: &ParsedPayload,
        settings: &ImportSettings,
    ) -> Result<(), StructuralError>;
}

// ==========================================
// RowValidator Trait
// ==========================================
// 用途: 单行类型转换与引用校验（从不短路）
// 实现者: row_validator::RowValidator
pub trait RowValidator: Send + Sync {
    /// 校验并转换一行
    ///
    /// # 参数
    /// - row: 已通过列数检查的原始行
    /// - index: 由表头派生的列查找表
    /// - keys: 本次导入预先加载的键集合
    fn validate_row(
        &self,
        row: &RawRow,
        index: &ColumnIndex,
        spec: &ImportSpec,
        keys: &ReferenceKeys,
        settings: &ImportSettings,
    ) -> ValidatedRow;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 跨行规则（唯一默认值、日期先后、批内重复键）
// 实现者: conflict_handler::ConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 检查整批数据
    ///
    /// # 返回
    /// - Vec<(行号, 错误)>: 违反规则的行（首次出现者不报错）
    fn check_batch(&self, spec: &ImportSpec, rows: &[ValidatedRow]) -> Vec<(usize, FieldError)>;
}
