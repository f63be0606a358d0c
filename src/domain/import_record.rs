// ==========================================
// 计费主数据导入系统 - 导入记录与结果
// ==========================================
// 职责: 类型化行、行级诊断、导入结果
// ==========================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rusqlite::types::{Null, ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};

// ==========================================
// FieldValue - 单个字段的类型化值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    /// 已按配置精度定标
    Decimal(Decimal),
    Date(DateTime<Utc>),
    Boolean(bool),
    /// 枚举常量名
    Enum(&'static str),
    /// 被引用实体的键
    Reference(String),
}

impl FieldValue {
    /// 作为键参与比较时的文本形式（Null → None）
    pub fn key_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(v) | FieldValue::Reference(v) => Some(v.clone()),
            FieldValue::Integer(v) => Some(v.to_string()),
            FieldValue::Decimal(v) => Some(v.to_string()),
            FieldValue::Date(v) => Some(v.to_rfc3339()),
            FieldValue::Boolean(v) => Some(v.to_string()),
            FieldValue::Enum(v) => Some((*v).to_string()),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            FieldValue::Null => Ok(ToSqlOutput::from(Null)),
            FieldValue::Text(v) | FieldValue::Reference(v) => Ok(ToSqlOutput::from(v.as_str())),
            FieldValue::Integer(v) => Ok(ToSqlOutput::from(*v)),
            // 定点小数以文本落库,避免浮点误差
            FieldValue::Decimal(v) => Ok(ToSqlOutput::from(v.to_string())),
            FieldValue::Date(v) => v.to_sql(),
            FieldValue::Boolean(v) => Ok(ToSqlOutput::from(*v)),
            FieldValue::Enum(v) => Ok(ToSqlOutput::from(*v)),
        }
    }
}

// ==========================================
// TypedRow - 通过校验的类型化数据行
// ==========================================
// values 与 ImportSpec.columns 一一对应
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
    pub row_number: usize,
    pub values: Vec<FieldValue>,
}

// ==========================================
// FieldError - 单字段/单规则错误（归并前）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// 涉及多列时为 None
    pub column: Option<&'static str>,
    pub message: String,
}

impl FieldError {
    pub fn at(column: &'static str, message: impl Into<String>) -> Self {
        Self {
            column: Some(column),
            message: message.into(),
        }
    }

    pub fn row_level(message: impl Into<String>) -> Self {
        Self {
            column: None,
            message: message.into(),
        }
    }
}

static NULL_VALUE: FieldValue = FieldValue::Null;

// ==========================================
// ValidatedRow - 行校验结果
// ==========================================
// 出错字段以 Null 占位,批内规则仍可在其余字段上运行
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub row_number: usize,
    pub values: Vec<FieldValue>,
    pub errors: Vec<FieldError>,
}

impl ValidatedRow {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn value(&self, position: usize) -> &FieldValue {
        self.values.get(position).unwrap_or(&NULL_VALUE)
    }

    pub fn into_typed(self) -> TypedRow {
        TypedRow {
            row_number: self.row_number,
            values: self.values,
        }
    }
}

// ==========================================
// RowError - 行级诊断
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based,表头为第 1 行
    pub row_number: usize,
    /// 仅单列出错时给出
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

// ==========================================
// ImportOutcome - 单次导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub imported_count: usize,
    pub errors: Vec<RowError>,
}

impl ImportOutcome {
    pub fn committed(imported_count: usize) -> Self {
        Self {
            imported_count,
            errors: Vec::new(),
        }
    }

    pub fn rejected(errors: Vec<RowError>) -> Self {
        Self {
            imported_count: 0,
            errors,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
