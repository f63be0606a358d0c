// ==========================================
// 计费主数据导入系统 - 冲突处理器实现
// ==========================================
// 职责: 批内跨行规则
// - SingleTrueInBatch: 同批至多一行置 true
// - NotAfter: 日期先后
// - 重复键: 同一 ID / 同一自然键元组出现多次
// 约定: 首次出现者不报错,后续行报错
// ==========================================

use crate::domain::import_record::{FieldError, FieldValue, ValidatedRow};
use crate::domain::import_spec::{BatchRule, ImportSpec, KeyMode};
use crate::importer::master_data_importer_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::HashMap;

pub struct ConflictHandler;

impl ConflictHandlerTrait for ConflictHandler {
    fn check_batch(&self, spec: &ImportSpec, rows: &[ValidatedRow]) -> Vec<(usize, FieldError)> {
        let mut conflicts = Vec::new();

        for rule in spec.rules {
            match *rule {
                BatchRule::SingleTrueInBatch(column) => {
                    conflicts.extend(self.detect_multiple_true(spec, rows, column))
                }
                BatchRule::NotAfter { earlier, later } => {
                    conflicts.extend(self.detect_date_inversions(spec, rows, earlier, later))
                }
            }
        }

        conflicts.extend(self.detect_duplicate_keys(spec, rows));
        conflicts
    }
}

impl ConflictHandler {
    /// 同批次内布尔列至多一行为 true
    fn detect_multiple_true(
        &self,
        spec: &ImportSpec,
        rows: &[ValidatedRow],
        column: &'static str,
    ) -> Vec<(usize, FieldError)> {
        let Some(position) = spec.position(column) else {
            return Vec::new();
        };

        let mut first_row: Option<usize> = None;
        let mut conflicts = Vec::new();

        for row in rows {
            if *row.value(position) != FieldValue::Boolean(true) {
                continue;
            }
            match first_row {
                None => first_row = Some(row.row_number),
                Some(first) => conflicts.push((
                    row.row_number,
                    FieldError::at(
                        column,
                        format!("{}: 同一批次只允许一行为 true（第 {} 行已设置）", column, first),
                    ),
                )),
            }
        }

        conflicts
    }

    /// 两个日期都有值时,earlier 不得晚于 later
    fn detect_date_inversions(
        &self,
        spec: &ImportSpec,
        rows: &[ValidatedRow],
        earlier: &'static str,
        later: &'static str,
    ) -> Vec<(usize, FieldError)> {
        let (Some(from_pos), Some(until_pos)) = (spec.position(earlier), spec.position(later))
        else {
            return Vec::new();
        };

        rows.iter()
            .filter_map(|row| match (row.value(from_pos), row.value(until_pos)) {
                (FieldValue::Date(from), FieldValue::Date(until)) if from > until => Some((
                    row.row_number,
                    FieldError::at(later, format!("{} 不得早于 {}", later, earlier)),
                )),
                _ => None,
            })
            .collect()
    }

    /// 检测同批次内重复键
    ///
    /// - ById: 非空 ID 重复（空 ID 均为新建,不参与比较）
    /// - ByNaturalKey: 完整自然键元组重复（Null 与 Null 视为相等）
    fn detect_duplicate_keys(
        &self,
        spec: &ImportSpec,
        rows: &[ValidatedRow],
    ) -> Vec<(usize, FieldError)> {
        let key_columns = spec.key_columns();
        let positions: Vec<usize> = key_columns
            .iter()
            .filter_map(|name| spec.position(name))
            .collect();

        let mut first_occurrence: HashMap<Vec<Option<String>>, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for row in rows {
            let key: Vec<Option<String>> = positions
                .iter()
                .map(|pos| row.value(*pos).key_text())
                .collect();

            if let KeyMode::ById { .. } = spec.key_mode {
                if key.iter().all(Option::is_none) {
                    continue;
                }
            }
            // 键字段本身出错的行已有诊断
            if row
                .errors
                .iter()
                .any(|e| e.column.map_or(false, |c| key_columns.contains(&c)))
            {
                continue;
            }

            if let Some(first_row) = first_occurrence.get(&key) {
                let message = format!(
                    "键 ({}) 与第 {} 行重复",
                    key_columns.join(", "),
                    first_row
                );
                let error = match spec.key_mode {
                    KeyMode::ById { id_column, .. } => FieldError::at(id_column, message),
                    KeyMode::ByNaturalKey(_) => FieldError::row_level(message),
                };
                duplicates.push((row.row_number, error));
            } else {
                first_occurrence.insert(key, row.row_number);
            }
        }

        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::catalog::{DISCOUNT, PRODUCT_LOCATION, PRODUCT_PRICE, TAX};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn tax_row(row_number: usize, id: Option<&str>, default_flag: bool) -> ValidatedRow {
        ValidatedRow {
            row_number,
            values: vec![
                id.map_or(FieldValue::Null, |v| FieldValue::Text(v.to_string())),
                FieldValue::Text("VAT".to_string()),
                FieldValue::Decimal(dec!(8.00)),
                FieldValue::Enum("TAX_CATEGORY_INCLUSIVE"),
                FieldValue::Boolean(default_flag),
                FieldValue::Boolean(false),
            ],
            errors: Vec::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> FieldValue {
        FieldValue::Date(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_single_default_flag_passes() {
        let rows = vec![tax_row(2, None, true), tax_row(3, None, false)];
        assert!(ConflictHandler.check_batch(&TAX, &rows).is_empty());
    }

    #[test]
    fn test_second_default_flag_is_reported() {
        let rows = vec![
            tax_row(2, None, true),
            tax_row(3, None, false),
            tax_row(4, None, true),
            tax_row(5, None, true),
        ];
        let conflicts = ConflictHandler.check_batch(&TAX, &rows);

        let reported: Vec<usize> = conflicts.iter().map(|(row, _)| *row).collect();
        assert_eq!(reported, vec![4, 5]);
        assert_eq!(conflicts[0].1.column, Some("default_flag"));
    }

    #[test]
    fn test_duplicate_ids_but_blank_ids_never_collide() {
        let rows = vec![
            tax_row(2, Some("TAX-1"), false),
            tax_row(3, None, false),
            tax_row(4, None, false),
            tax_row(5, Some("TAX-1"), false),
        ];
        let conflicts = ConflictHandler.check_batch(&TAX, &rows);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].0, 5);
        assert_eq!(conflicts[0].1.column, Some("tax_id"));
    }

    #[test]
    fn test_duplicate_natural_key_is_row_level() {
        let row = |n: usize, location: &str| ValidatedRow {
            row_number: n,
            values: vec![
                FieldValue::Reference("FEE-1".to_string()),
                FieldValue::Reference(location.to_string()),
            ],
            errors: Vec::new(),
        };
        let rows = vec![row(2, "LOC-1"), row(3, "LOC-2"), row(4, "LOC-1")];
        let conflicts = ConflictHandler.check_batch(&PRODUCT_LOCATION, &rows);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].0, 4);
        assert_eq!(conflicts[0].1.column, None);
        assert!(conflicts[0].1.message.contains('2'));
    }

    #[test]
    fn test_null_natural_key_members_compare_equal() {
        let row = |n: usize| ValidatedRow {
            row_number: n,
            values: vec![
                FieldValue::Reference("FEE-1".to_string()),
                FieldValue::Null,
                FieldValue::Null,
                FieldValue::Decimal(dec!(10.00)),
            ],
            errors: Vec::new(),
        };
        let conflicts = ConflictHandler.check_batch(&PRODUCT_PRICE, &[row(2), row(3)]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].0, 3);
    }

    #[test]
    fn test_date_inversion() {
        let row = |n: usize, from: FieldValue, until: FieldValue| {
            let mut values = vec![FieldValue::Null; DISCOUNT.column_count()];
            values[DISCOUNT.position("available_from").unwrap()] = from;
            values[DISCOUNT.position("available_until").unwrap()] = until;
            ValidatedRow {
                row_number: n,
                values,
                errors: Vec::new(),
            }
        };
        let rows = vec![
            row(2, date(2024, 1, 1), date(2024, 12, 31)),
            row(3, date(2024, 6, 1), date(2024, 6, 1)),
            row(4, date(2025, 1, 1), date(2024, 1, 1)),
            // 缺值时不比较
            row(5, FieldValue::Null, date(2024, 1, 1)),
        ];
        let conflicts = ConflictHandler.check_batch(&DISCOUNT, &rows);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].0, 4);
        assert_eq!(conflicts[0].1.column, Some("available_until"));
    }
}
