// ==========================================
// 多商户目录导入引擎 - 行校验器实现
// ==========================================
// 阶段 3: 行级业务校验
// 约束: 所有规则全部执行并累积错误（不在第一个错误处短路）
// 约束: 校验错误是数据，写入 NormalizedRow.errors，不返回 Err
// ==========================================

use crate::domain::staging::{FieldError, NormalizedRow, RowValidationErrors};
use crate::domain::target_schema::keys;
use crate::domain::types::FieldValue;
use crate::importer::catalog_importer_trait::RowValidator;
use chrono::{Datelike, Utc};

pub const MAX_TITLE_LENGTH: usize = 500;
pub const MAX_PRICE: f64 = 999_999.99;
pub const MIN_PUBLICATION_YEAR: i64 = 1000;

/// 批量校验结果（全部行按原顺序保留，有效/无效为划分视图）
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub rows: Vec<NormalizedRow>,
    pub errors: Vec<RowValidationErrors>,
}

impl ValidationOutcome {
    pub fn valid_rows(&self) -> impl Iterator<Item = &NormalizedRow> {
        self.rows.iter().filter(|r| r.is_valid())
    }

    pub fn invalid_rows(&self) -> impl Iterator<Item = &NormalizedRow> {
        self.rows.iter().filter(|r| !r.is_valid())
    }

    pub fn valid_count(&self) -> usize {
        self.valid_rows().count()
    }

    pub fn invalid_count(&self) -> usize {
        self.rows.len() - self.valid_count()
    }
}

// ==========================================
// RowValidatorImpl
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct RowValidatorImpl {
    current_year: i64,
}

impl Default for RowValidatorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl RowValidatorImpl {
    pub fn new() -> Self {
        Self {
            current_year: i64::from(Utc::now().year()),
        }
    }

    /// 固定“当前年份”（测试用）
    pub fn with_current_year(current_year: i64) -> Self {
        Self { current_year }
    }

    fn present<'a>(row: &'a NormalizedRow, key: &str) -> Option<&'a FieldValue> {
        row.get(key).filter(|v| !v.is_null())
    }

    fn check_title(row: &NormalizedRow, errors: &mut Vec<FieldError>) {
        match row.text(keys::TITLE) {
            None => errors.push(FieldError::new(keys::TITLE, "标题不能为空")),
            Some(title) if title.chars().count() > MAX_TITLE_LENGTH => errors.push(
                FieldError::new(keys::TITLE, format!("标题长度不能超过 {} 个字符", MAX_TITLE_LENGTH)),
            ),
            Some(_) => {}
        }
    }

    fn check_price(row: &NormalizedRow, errors: &mut Vec<FieldError>) {
        match Self::present(row, keys::PRICE).and_then(FieldValue::as_f64) {
            None => errors.push(FieldError::new(keys::PRICE, "价格必填且必须为数字")),
            Some(price) if price < 0.0 => {
                errors.push(FieldError::new(keys::PRICE, "价格不能为负数"))
            }
            Some(price) if price > MAX_PRICE => errors.push(FieldError::new(
                keys::PRICE,
                format!("价格不能超过 {}", MAX_PRICE),
            )),
            Some(_) => {}
        }
    }

    fn check_quantity(row: &NormalizedRow, errors: &mut Vec<FieldError>) {
        let Some(value) = Self::present(row, keys::QUANTITY) else {
            return;
        };
        match value.as_f64() {
            Some(q) if q >= 0.0 => {}
            _ => errors.push(FieldError::new(keys::QUANTITY, "数量必须为非负数")),
        }
    }

    fn check_publication_year(&self, row: &NormalizedRow, errors: &mut Vec<FieldError>) {
        let Some(value) = Self::present(row, keys::PUBLICATION_YEAR) else {
            return;
        };
        let max_year = self.current_year + 1;
        match value.as_i64() {
            Some(year) if (MIN_PUBLICATION_YEAR..=max_year).contains(&year) => {}
            _ => errors.push(FieldError::new(
                keys::PUBLICATION_YEAR,
                format!("出版年份必须在 {} 到 {} 之间", MIN_PUBLICATION_YEAR, max_year),
            )),
        }
    }
}

impl RowValidator for RowValidatorImpl {
    fn validate_row(&self, row: &mut NormalizedRow) {
        let mut errors = Vec::new();

        Self::check_title(row, &mut errors);
        Self::check_price(row, &mut errors);
        Self::check_quantity(row, &mut errors);
        self.check_publication_year(row, &mut errors);

        row.errors = errors;
    }

    fn validate_rows(&self, mut rows: Vec<NormalizedRow>) -> ValidationOutcome {
        let mut errors = Vec::new();

        for row in rows.iter_mut() {
            self.validate_row(row);
            if !row.is_valid() {
                errors.push(RowValidationErrors {
                    row_index: row.row_index,
                    errors: row.errors.clone(),
                });
            }
        }

        ValidationOutcome { rows, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[(&str, FieldValue)]) -> NormalizedRow {
        let mut row = NormalizedRow::new(1);
        for (k, v) in values {
            row.values.insert(k.to_string(), v.clone());
        }
        row
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn validator() -> RowValidatorImpl {
        RowValidatorImpl::with_current_year(2024)
    }

    #[test]
    fn test_valid_row() {
        let mut r = row(&[
            ("title", text("Moby Dick")),
            ("price", FieldValue::Number(19.99)),
            ("quantity", FieldValue::Number(1.0)),
            ("publicationYear", FieldValue::Integer(1851)),
        ]);
        validator().validate_row(&mut r);
        assert!(r.is_valid(), "{:?}", r.errors);
    }

    #[test]
    fn test_errors_accumulate_without_short_circuit() {
        let mut r = row(&[
            ("title", text("")),
            ("price", FieldValue::Number(-1.0)),
            ("publicationYear", FieldValue::Integer(50)),
        ]);
        validator().validate_row(&mut r);

        let fields: Vec<&str> = r.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "price", "publicationYear"]);
    }

    #[test]
    fn test_price_bounds() {
        let mut missing = row(&[("title", text("A")), ("price", FieldValue::Null)]);
        validator().validate_row(&mut missing);
        assert_eq!(missing.errors[0].field, "price");

        let mut too_big = row(&[("title", text("A")), ("price", FieldValue::Number(1_000_000.0))]);
        validator().validate_row(&mut too_big);
        assert_eq!(too_big.errors.len(), 1);

        let mut max = row(&[("title", text("A")), ("price", FieldValue::Number(MAX_PRICE))]);
        validator().validate_row(&mut max);
        assert!(max.is_valid());

        let mut zero = row(&[("title", text("A")), ("price", FieldValue::Number(0.0))]);
        validator().validate_row(&mut zero);
        assert!(zero.is_valid());
    }

    #[test]
    fn test_title_length_limit() {
        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        let mut r = row(&[("title", text(&long)), ("price", FieldValue::Number(1.0))]);
        validator().validate_row(&mut r);
        assert_eq!(r.errors.len(), 1);
        assert_eq!(r.errors[0].field, "title");
    }

    #[test]
    fn test_quantity_and_year_optional() {
        let mut r = row(&[
            ("title", text("A")),
            ("price", FieldValue::Number(1.0)),
            ("quantity", FieldValue::Null),
            ("publicationYear", FieldValue::Null),
        ]);
        validator().validate_row(&mut r);
        assert!(r.is_valid());

        let mut r = row(&[
            ("title", text("A")),
            ("price", FieldValue::Number(1.0)),
            ("quantity", FieldValue::Number(-2.0)),
            ("publicationYear", FieldValue::Integer(2026)),
        ]);
        validator().validate_row(&mut r);
        let fields: Vec<&str> = r.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["quantity", "publicationYear"]);
    }

    #[test]
    fn test_year_upper_bound_is_next_year() {
        let mut r = row(&[
            ("title", text("A")),
            ("price", FieldValue::Number(1.0)),
            ("publicationYear", FieldValue::Integer(2025)),
        ]);
        validator().validate_row(&mut r);
        assert!(r.is_valid());
    }

    #[test]
    fn test_revalidation_clears_stale_errors() {
        let mut r = row(&[("title", text("")), ("price", FieldValue::Number(1.0))]);
        validator().validate_row(&mut r);
        assert!(!r.is_valid());

        r.values.insert("title".to_string(), text("Fixed"));
        validator().validate_row(&mut r);
        assert!(r.is_valid());
    }

    #[test]
    fn test_validate_rows_partition() {
        let rows = vec![
            row(&[("title", text("A")), ("price", FieldValue::Number(1.0))]),
            row(&[("title", text("")), ("price", FieldValue::Number(1.0))]),
            row(&[("title", text("C")), ("price", FieldValue::Null)]),
        ];
        let outcome = validator().validate_rows(rows);

        assert_eq!(outcome.valid_count(), 1);
        assert_eq!(outcome.invalid_count(), 2);
        assert_eq!(outcome.valid_count() + outcome.invalid_count(), outcome.rows.len());
        assert_eq!(outcome.errors.len(), 2);
    }
}
