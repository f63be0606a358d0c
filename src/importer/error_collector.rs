// ==========================================
// 计费主数据导入系统 - 错误收集器
// ==========================================
// 职责: 按行归并字段错误与规则错误,每个出错行输出一条 RowError
// ==========================================

use crate::domain::import_record::{FieldError, RowError};
use std::collections::BTreeMap;

/// 同一行多条消息的分隔符
const MESSAGE_SEPARATOR: &str = "; ";

#[derive(Debug, Default)]
pub struct ErrorCollector {
    by_row: BTreeMap<usize, Vec<FieldError>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, row_number: usize, error: FieldError) {
        self.by_row.entry(row_number).or_default().push(error);
    }

    pub fn record_all(&mut self, row_number: usize, errors: impl IntoIterator<Item = FieldError>) {
        for error in errors {
            self.record(row_number, error);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.by_row.is_empty()
    }

    /// 按行号升序输出
    pub fn into_row_errors(self) -> Vec<RowError> {
        self.by_row
            .into_iter()
            .map(|(row_number, errors)| {
                let column = single_column(&errors).map(str::to_string);
                let message = errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join(MESSAGE_SEPARATOR);
                RowError {
                    row_number,
                    column,
                    message,
                }
            })
            .collect()
    }
}

/// 所有错误都指向同一列时返回该列
fn single_column(errors: &[FieldError]) -> Option<&'static str> {
    let first = errors.first()?.column?;
    errors
        .iter()
        .all(|e| e.column == Some(first))
        .then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collector_is_clean() {
        let collector = ErrorCollector::new();
        assert!(collector.is_clean());
        assert!(collector.into_row_errors().is_empty());
    }

    #[test]
    fn test_one_error_per_row_in_row_order() {
        let mut collector = ErrorCollector::new();
        collector.record(5, FieldError::at("name", "name: 必填字段为空"));
        collector.record_all(
            3,
            vec![
                FieldError::at("tax_percentage", "tax_percentage: 无法解析为小数: a"),
                FieldError::at("default_flag", "default_flag: 无法解析为布尔值: x"),
            ],
        );
        collector.record(5, FieldError::at("name", "name: 重复"));

        assert!(!collector.is_clean());

        let errors = collector.into_row_errors();
        assert_eq!(errors.len(), 2);

        assert_eq!(errors[0].row_number, 3);
        assert_eq!(errors[0].column, None);
        assert_eq!(
            errors[0].message,
            "tax_percentage: 无法解析为小数: a; default_flag: 无法解析为布尔值: x"
        );

        assert_eq!(errors[1].row_number, 5);
        assert_eq!(errors[1].column.as_deref(), Some("name"));
    }

    #[test]
    fn test_row_level_error_has_no_column() {
        let mut collector = ErrorCollector::new();
        collector.record(2, FieldError::row_level("键重复"));
        let errors = collector.into_row_errors();
        assert_eq!(errors[0].column, None);
    }
}
