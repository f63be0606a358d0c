// ==========================================
// 计费主数据导入系统 - 表头校验器
// ==========================================
// 职责: 载荷切行 + 表头精确比对 + 逐行列数检查（快速失败）
// 输出: ColumnIndex（名称 → 位置）与保留原始行号的数据行
// ==========================================

use crate::config::ImportSettings;
use crate::domain::import_spec::ImportSpec;
use crate::importer::error::StructuralError;
use crate::importer::master_data_importer_trait::HeaderValidator as HeaderValidatorTrait;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use tracing::debug;

const UTF8_BOM: char = '\u{feff}';

// ==========================================
// ColumnIndex - 由已校验表头派生的列查找表
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn from_validated_header(spec: &ImportSpec, header: &[String]) -> Self {
        let positions = spec
            .columns
            .iter()
            .filter_map(|column| {
                header
                    .iter()
                    .position(|h| h == column.name)
                    .map(|idx| (column.name, idx))
            })
            .collect();
        Self { positions }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

// ==========================================
// RawRow - 未经类型转换的数据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 原始载荷中的 1-based 行号（表头为 1）
    pub row_number: usize,
    /// 已 trim 的字段
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct ParsedPayload {
    pub index: ColumnIndex,
    pub rows: Vec<RawRow>,
}

// ==========================================
// HeaderValidator
// ==========================================
pub struct HeaderValidator;

impl HeaderValidatorTrait for HeaderValidator {
    /// 解析载荷并完成与配置无关的结构检查
    ///
    /// # 检查顺序
    /// 1. 空载荷 → EmptyPayload
    /// 2. 只有表头 → HeaderOnly（先于表头比对,错误表头 + 无数据行也报 HeaderOnly）
    /// 3. 表头列数 → ColumnCountMismatch（行 1）
    /// 4. 表头列名（逐位置,大小写敏感）→ UnknownColumnName
    /// 5. 每个数据行的列数 → ColumnCountMismatch（该行行号）
    fn parse(&self, payload: &[u8], spec: &ImportSpec) -> Result<ParsedPayload, StructuralError> {
        if payload.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(StructuralError::EmptyPayload);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 列数检查由本模块负责
            .trim(Trim::None)
            .from_reader(payload);

        let mut records = reader.records();

        let header_record = match records.next() {
            None => return Err(StructuralError::EmptyPayload),
            Some(result) => result.map_err(malformed)?,
        };
        let header: Vec<String> = header_record
            .iter()
            .enumerate()
            .map(|(idx, token)| {
                let token = if idx == 0 {
                    token.trim_start_matches(UTF8_BOM)
                } else {
                    token
                };
                token.trim().to_string()
            })
            .collect();

        // 先收集,表头通过后再逐行检查
        let pending: Vec<Result<StringRecord, csv::Error>> = records
            .filter(|result| !matches!(result, Ok(record) if is_blank_line(record)))
            .collect();

        if pending.is_empty() {
            return Err(StructuralError::HeaderOnly);
        }

        Self::validate_header(spec, &header)?;

        let expected = spec.column_count();
        let mut rows = Vec::with_capacity(pending.len());
        for result in pending {
            let record = result.map_err(malformed)?;
            let row_number = line_of(&record);
            if record.len() != expected {
                return Err(StructuralError::ColumnCountMismatch {
                    row_number,
                    expected,
                    actual: record.len(),
                });
            }
            rows.push(RawRow {
                row_number,
                fields: record.iter().map(|f| f.trim().to_string()).collect(),
            });
        }

        debug!(entity = %spec.entity, rows = rows.len(), "载荷结构检查通过");

        Ok(ParsedPayload {
            index: ColumnIndex::from_validated_header(spec, &header),
            rows,
        })
    }

    /// 6. 数据行数上限 → TooManyRows
    fn check_row_limit(
        &self,
        parsed: &ParsedPayload,
        settings: &ImportSettings,
    ) -> Result<(), StructuralError> {
        if parsed.rows.len() > settings.max_data_rows {
            return Err(StructuralError::TooManyRows {
                limit: settings.max_data_rows,
                actual: parsed.rows.len(),
            });
        }
        Ok(())
    }
}

impl HeaderValidator {
    /// 表头按位置精确比对
    pub fn validate_header(spec: &ImportSpec, header: &[String]) -> Result<(), StructuralError> {
        if header.len() != spec.column_count() {
            return Err(StructuralError::ColumnCountMismatch {
                row_number: 1,
                expected: spec.column_count(),
                actual: header.len(),
            });
        }

        for (idx, (column, actual)) in spec.columns.iter().zip(header).enumerate() {
            if column.name != actual {
                return Err(StructuralError::UnknownColumnName {
                    position: idx + 1,
                    expected: column.name.to_string(),
                    actual: actual.clone(),
                });
            }
        }

        Ok(())
    }
}

/// 单字段且全空白的行视为空行（csv 已跳过真正的空行）
fn is_blank_line(record: &StringRecord) -> bool {
    record.len() == 1 && record.get(0).map_or(true, |f| f.trim().is_empty())
}

fn line_of(record: &StringRecord) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(0)
}

fn malformed(err: csv::Error) -> StructuralError {
    StructuralError::MalformedPayload {
        row_number: err.position().map(|p| p.line() as usize).unwrap_or(0),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::catalog::TAX;

    const TAX_HEADER: &str = "tax_id,name,tax_percentage,tax_category,default_flag,is_archived";

    fn parse(payload: &str) -> Result<ParsedPayload, StructuralError> {
        HeaderValidator.parse(payload.as_bytes(), &TAX)
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(parse("").unwrap_err(), StructuralError::EmptyPayload);
        assert_eq!(parse(" \n\n").unwrap_err(), StructuralError::EmptyPayload);
    }

    #[test]
    fn test_header_only() {
        assert_eq!(
            parse(&format!("{}\n", TAX_HEADER)).unwrap_err(),
            StructuralError::HeaderOnly
        );
    }

    #[test]
    fn test_valid_payload_keeps_line_numbers() {
        let payload = format!(
            "{}\n,VAT,8,1,true,false\n\n,GST,10,2,false,false\n",
            TAX_HEADER
        );
        let parsed = parse(&payload).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].row_number, 2);
        // 空行仍占用行号
        assert_eq!(parsed.rows[1].row_number, 4);
        assert_eq!(parsed.index.get("tax_percentage"), Some(2));
        assert_eq!(parsed.index.get("is_archived"), Some(5));
        assert_eq!(parsed.index.get("remarks"), None);
    }

    #[test]
    fn test_fields_and_header_are_trimmed() {
        let payload = " tax_id , name,tax_percentage,tax_category,default_flag,is_archived\n, VAT ,8,1,true,false";
        let parsed = parse(payload).unwrap();
        assert_eq!(parsed.rows[0].field(1), "VAT");
    }

    #[test]
    fn test_bom_is_stripped() {
        let payload = format!("\u{feff}{}\n,VAT,8,1,true,false", TAX_HEADER);
        assert!(parse(&payload).is_ok());
    }

    #[test]
    fn test_reordered_columns() {
        let payload = "name,tax_id,tax_percentage,tax_category,default_flag,is_archived\nVAT,,8,1,true,false";
        assert!(matches!(
            parse(payload).unwrap_err(),
            StructuralError::UnknownColumnName { position: 1, .. }
        ));
    }

    #[test]
    fn test_missing_column() {
        let payload = "tax_id,name,tax_percentage,tax_category,default_flag\n,VAT,8,1,true";
        assert_eq!(
            parse(payload).unwrap_err(),
            StructuralError::ColumnCountMismatch {
                row_number: 1,
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_extra_column() {
        let payload = format!("{},extra\n,VAT,8,1,true,false,x", TAX_HEADER);
        assert!(matches!(
            parse(&payload).unwrap_err(),
            StructuralError::ColumnCountMismatch { row_number: 1, .. }
        ));
    }

    #[test]
    fn test_renamed_column_is_case_sensitive() {
        let payload = "tax_id,Name,tax_percentage,tax_category,default_flag,is_archived\n,VAT,8,1,true,false";
        assert_eq!(
            parse(payload).unwrap_err(),
            StructuralError::UnknownColumnName {
                position: 2,
                expected: "name".to_string(),
                actual: "Name".to_string(),
            }
        );
    }

    #[test]
    fn test_data_row_column_count_mismatch_is_structural() {
        let payload = format!("{}\n,VAT,8,1,true,false\n,GST,10,2,false", TAX_HEADER);
        assert_eq!(
            parse(&payload).unwrap_err(),
            StructuralError::ColumnCountMismatch {
                row_number: 3,
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_too_many_rows() {
        let settings = ImportSettings {
            max_data_rows: 1,
            ..ImportSettings::default()
        };
        let payload = format!("{}\n,VAT,8,1,true,false\n,GST,10,2,false,false", TAX_HEADER);
        let parsed = parse(&payload).unwrap();

        assert_eq!(
            HeaderValidator
                .check_row_limit(&parsed, &settings)
                .unwrap_err(),
            StructuralError::TooManyRows {
                limit: 1,
                actual: 2
            }
        );
        assert!(HeaderValidator
            .check_row_limit(&parsed, &ImportSettings::default())
            .is_ok());
    }

    #[test]
    fn test_wrong_header_without_rows_reports_header_only() {
        assert_eq!(
            parse("tax_id,Name,rate\n").unwrap_err(),
            StructuralError::HeaderOnly
        );
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut payload = format!("{}\n,", TAX_HEADER).into_bytes();
        payload.extend_from_slice(&[0xff, 0xfe]);
        payload.extend_from_slice(b",8,1,true,false");
        assert!(matches!(
            HeaderValidator.parse(&payload, &TAX).unwrap_err(),
            StructuralError::MalformedPayload { row_number: 2, .. }
        ));
    }
}
