// ==========================================
// 计费主数据导入系统 - 行校验/转换器
// ==========================================
// 职责: 逐字段类型转换、必填检查、枚举映射、引用存在性检查
// 约束: 从不短路,一行内所有字段错误都会被收集
// ==========================================

use crate::config::ImportSettings;
use crate::domain::import_record::{FieldError, FieldValue, ValidatedRow};
use crate::domain::import_spec::{
    ColumnKind, ColumnSpec, EnumTable, ImportSpec, KeyMode, KeySpace, ReferenceKeys,
};
use crate::importer::header_validator::{ColumnIndex, RawRow};
use crate::importer::master_data_importer_trait::RowValidator as RowValidatorTrait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 规范布尔值集合
const TRUE_TOKENS: [&str; 6] = ["1", "t", "T", "TRUE", "true", "True"];
const FALSE_TOKENS: [&str; 6] = ["0", "f", "F", "FALSE", "false", "False"];

/// 裸日期格式
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

pub struct RowValidator;

impl RowValidatorTrait for RowValidator {
    fn validate_row(
        &self,
        row: &RawRow,
        index: &ColumnIndex,
        spec: &ImportSpec,
        keys: &ReferenceKeys,
        settings: &ImportSettings,
    ) -> ValidatedRow {
        let mut values = Vec::with_capacity(spec.column_count());
        let mut errors = Vec::new();

        for column in spec.columns {
            let raw = index.get(column.name).map(|idx| row.field(idx)).unwrap_or("");

            let result = match spec.key_mode {
                KeyMode::ById {
                    id_column,
                    key_space,
                } if id_column == column.name => self.resolve_id(column, raw, key_space, keys),
                _ => self.coerce(column, raw, keys, settings),
            };

            match result {
                Ok(value) => values.push(value),
                Err(message) => {
                    values.push(FieldValue::Null);
                    errors.push(FieldError::at(column.name, message));
                }
            }
        }

        ValidatedRow {
            row_number: row.row_number,
            values,
            errors,
        }
    }
}

impl RowValidator {
    /// ById 键列: 空 → 新建;非空 → 必须已存在
    fn resolve_id(
        &self,
        column: &ColumnSpec,
        raw: &str,
        key_space: KeySpace,
        keys: &ReferenceKeys,
    ) -> Result<FieldValue, String> {
        if raw.is_empty() {
            return Ok(FieldValue::Null);
        }
        if contains_key(keys, key_space, raw) {
            Ok(FieldValue::Text(raw.to_string()))
        } else {
            Err(format!(
                "{}: 要更新的{}记录不存在: {}",
                column.name, key_space, raw
            ))
        }
    }

    /// 按列类型转换单个字段
    fn coerce(
        &self,
        column: &ColumnSpec,
        raw: &str,
        keys: &ReferenceKeys,
        settings: &ImportSettings,
    ) -> Result<FieldValue, String> {
        if raw.is_empty() {
            return if column.required {
                Err(format!("{}: 必填字段为空", column.name))
            } else {
                Ok(FieldValue::Null)
            };
        }

        match column.kind {
            ColumnKind::Text => Ok(FieldValue::Text(raw.to_string())),
            ColumnKind::Integer => parse_integer(raw)
                .map(FieldValue::Integer)
                .ok_or_else(|| format!("{}: 无法解析为整数: {}", column.name, raw)),
            ColumnKind::Decimal => parse_decimal(raw, settings.decimal_scale)
                .map(FieldValue::Decimal)
                .ok_or_else(|| format!("{}: 无法解析为小数: {}", column.name, raw)),
            ColumnKind::Date => parse_date(raw, settings.date_offset)
                .map(FieldValue::Date)
                .ok_or_else(|| format!("{}: 无法解析为日期: {}", column.name, raw)),
            ColumnKind::Boolean => parse_boolean(raw)
                .map(FieldValue::Boolean)
                .ok_or_else(|| format!("{}: 无法解析为布尔值: {}", column.name, raw)),
            ColumnKind::Enum(table) => parse_enum(raw, table)
                .map(FieldValue::Enum)
                .ok_or_else(|| format!("{}: 未知的 {} 编码: {}", column.name, table.name, raw)),
            ColumnKind::ForeignKey(space) => {
                if contains_key(keys, space, raw) {
                    Ok(FieldValue::Reference(raw.to_string()))
                } else {
                    Err(format!("{}: 引用的{}不存在: {}", column.name, space, raw))
                }
            }
        }
    }
}

fn contains_key(keys: &ReferenceKeys, space: KeySpace, raw: &str) -> bool {
    keys.get(&space).map_or(false, |set| set.contains(raw))
}

pub(crate) fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok()
}

/// 解析并定标（8 与 8.00 等价）
///
/// 整数位过多时 rescale 会静默降低精度,此类值视为无法表示
pub(crate) fn parse_decimal(raw: &str, scale: u32) -> Option<Decimal> {
    let mut value = Decimal::from_str(raw).ok()?.round_dp(scale);
    value.rescale(scale);
    (value.scale() == scale).then_some(value)
}

/// RFC 3339 时间戳,或裸日期（按配置偏移的零点）
pub(crate) fn parse_date(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(offset).single())
        .map(|local| local.with_timezone(&Utc))
}

pub(crate) fn parse_boolean(raw: &str) -> Option<bool> {
    if TRUE_TOKENS.contains(&raw) {
        Some(true)
    } else if FALSE_TOKENS.contains(&raw) {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn parse_enum(raw: &str, table: &'static EnumTable) -> Option<&'static str> {
    raw.parse::<i32>().ok().and_then(|code| table.lookup(code))
}
