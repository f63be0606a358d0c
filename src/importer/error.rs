// ==========================================
// 计费主数据导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 结构错误 / 系统错误（行级校验错误不走 Err,见 ImportOutcome）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 结构错误: 整个载荷形状不合规,任何数据行都不会被评估
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("载荷为空")]
    EmptyPayload,

    #[error("仅有表头,没有数据行")]
    HeaderOnly,

    #[error("列数不匹配 (行 {row_number}): 期望 {expected} 列,实际 {actual} 列")]
    ColumnCountMismatch {
        row_number: usize,
        expected: usize,
        actual: usize,
    },

    #[error("表头第 {position} 列名称错误: 期望 {expected},实际 {actual}")]
    UnknownColumnName {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("数据行过多: 上限 {limit} 行,实际 {actual} 行")]
    TooManyRows { limit: usize, actual: usize },

    #[error("载荷无法读取 (行 {row_number}): {message}")]
    MalformedPayload { row_number: usize, message: String },
}

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("载荷结构错误: {0}")]
    Structural(#[from] StructuralError),

    #[error("存储失败: {0}")]
    Storage(#[from] RepositoryError),
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
