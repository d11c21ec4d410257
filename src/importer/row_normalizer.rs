// ==========================================
// 多商户目录导入引擎 - 行标准化器实现
// ==========================================
// 阶段 2: 原始字符串 → 类型化取值
// 分派: 按 FieldType 穷尽匹配，每种类型一个标准化函数
// 约束: 不产生校验错误（错误由 RowValidator 负责），_rowIndex 原样沿用
// ==========================================

use crate::domain::staging::{ColumnMapping, NormalizedRow, RawRow};
use crate::domain::target_schema::{keys, TargetFieldSpec, TargetSchema};
use crate::domain::types::{FieldType, FieldValue};
use crate::importer::catalog_importer_trait::RowNormalizer;
use regex::Regex;
use std::sync::LazyLock;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("valid regex"));

const TRUTHY_VALUES: &[&str] = &["y", "yes", "true", "1", "signed"];

#[derive(Debug, Clone, Copy, Default)]
pub struct RowNormalizerImpl {
    schema: TargetSchema,
}

impl RowNormalizerImpl {
    pub fn new() -> Self {
        Self::default()
    }

    fn fallback(spec: &TargetFieldSpec) -> FieldValue {
        spec.default_value().unwrap_or(FieldValue::Null)
    }

    fn normalize_number(spec: &TargetFieldSpec, value: &str) -> FieldValue {
        if spec.key == keys::PUBLICATION_YEAR {
            return YEAR_RE
                .find(value)
                .and_then(|m| m.as_str().parse::<i64>().ok())
                .map(FieldValue::Integer)
                .unwrap_or(FieldValue::Null);
        }

        let cleaned: String = value.chars().filter(|c| *c != '$' && *c != ',').collect();
        match cleaned.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Null,
        }
    }

    fn normalize_boolean(value: &str) -> FieldValue {
        let lowered = value.to_lowercase();
        FieldValue::Bool(TRUTHY_VALUES.contains(&lowered.as_str()))
    }

    fn normalize_enum(spec: &TargetFieldSpec, value: &str) -> FieldValue {
        let lowered = value.to_lowercase();

        if spec.key == keys::STATUS {
            let status = match lowered.as_str() {
                "for sale" | "active" => Some("published"),
                "draft" | "sold" | "archived" | "pending" | "published" => {
                    Some(lowered.as_str())
                }
                _ => None,
            };
            return status
                .map(|s| FieldValue::Text(s.to_string()))
                .unwrap_or_else(|| Self::fallback(spec));
        }

        // 小写连字符形式: "Very Good" / "very_good" → "very-good"
        let hyphenated = lowered
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        if spec.allows_option(&hyphenated) {
            FieldValue::Text(hyphenated)
        } else {
            Self::fallback(spec)
        }
    }

    fn normalize_images(value: &str) -> FieldValue {
        let urls = value
            .split(['|', ','])
            .map(str::trim)
            .filter(|url| url.starts_with("http") || url.starts_with('/'))
            .map(str::to_string)
            .collect();
        FieldValue::List(urls)
    }
}

impl RowNormalizer for RowNormalizerImpl {
    fn apply_mappings(&self, raw_rows: &[RawRow], mapping: &ColumnMapping) -> Vec<NormalizedRow> {
        raw_rows
            .iter()
            .map(|raw| {
                let mut row = NormalizedRow::new(raw.row_index);

                for (source_column, target) in mapping.mapped() {
                    let Some(spec) = self.schema.field(target) else {
                        continue;
                    };
                    let value = raw.get(source_column).unwrap_or_default();
                    row.values
                        .insert(spec.key.to_string(), self.normalize_value(spec, value));
                }

                // 未映射字段补默认值
                for spec in self.schema.list_fields() {
                    if row.values.contains_key(spec.key) {
                        continue;
                    }
                    if let Some(default) = spec.default_value() {
                        row.values.insert(spec.key.to_string(), default);
                    }
                }

                row
            })
            .collect()
    }

    fn normalize_value(&self, spec: &TargetFieldSpec, raw: &str) -> FieldValue {
        let value = raw.trim();
        if value.is_empty() {
            return Self::fallback(spec);
        }

        match spec.field_type {
            FieldType::Number => Self::normalize_number(spec, value),
            FieldType::Boolean => Self::normalize_boolean(value),
            FieldType::Enum => Self::normalize_enum(spec, value),
            FieldType::Images => Self::normalize_images(value),
            FieldType::String | FieldType::Text => FieldValue::Text(value.to_string()),
        }
    }
}
