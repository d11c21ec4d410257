// ==========================================
// 多商户目录导入引擎 - 目标字段注册表
// ==========================================
// 职责: 声明可导入的固定字段集合（类型/必填/默认值/枚举选项）
// 约束: 进程启动即确定，只读；顺序即映射优先级与展示顺序
// ==========================================

use crate::domain::types::{FieldType, FieldValue};
use serde::Serialize;

/// 字段默认值（编译期常量形式）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldDefault {
    Text(&'static str),
    Number(f64),
    Bool(bool),
}

impl FieldDefault {
    pub fn to_value(self) -> FieldValue {
        match self {
            FieldDefault::Text(s) => FieldValue::Text(s.to_string()),
            FieldDefault::Number(n) => FieldValue::Number(n),
            FieldDefault::Bool(b) => FieldValue::Bool(b),
        }
    }
}

/// 目标字段定义
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
}

fn no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

impl TargetFieldSpec {
    pub fn default_value(&self) -> Option<FieldValue> {
        self.default.map(FieldDefault::to_value)
    }

    pub fn allows_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| *o == value)
    }
}

// ===== 字段键常量 =====
pub mod keys {
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const PRICE: &str = "price";
    pub const QUANTITY: &str = "quantity";
    pub const SKU: &str = "sku";
    pub const ISBN: &str = "isbn";
    pub const PUBLISHER: &str = "publisher";
    pub const PUBLICATION_YEAR: &str = "publicationYear";
    pub const EDITION: &str = "edition";
    pub const CONDITION: &str = "condition";
    pub const BINDING: &str = "binding";
    pub const DESCRIPTION: &str = "description";
    pub const CATEGORY: &str = "category";
    pub const IS_SIGNED: &str = "isSigned";
    pub const IS_FIRST_EDITION: &str = "isFirstEdition";
    pub const STATUS: &str = "status";
    pub const IMAGES: &str = "images";
    pub const WP_POST_ID: &str = "wpPostId";
}

pub const STATUS_OPTIONS: &[&str] = &["draft", "published", "sold", "archived", "pending"];

pub const CONDITION_OPTIONS: &[&str] = &[
    "new",
    "like-new",
    "very-good",
    "good",
    "acceptable",
    "poor",
];

pub const BINDING_OPTIONS: &[&str] = &[
    "hardcover",
    "paperback",
    "mass-market",
    "leather",
    "spiral",
    "other",
];

const fn field(
    key: &'static str,
    label: &'static str,
    required: bool,
    field_type: FieldType,
) -> TargetFieldSpec {
    TargetFieldSpec {
        key,
        label,
        required,
        field_type,
        options: &[],
        default: None,
    }
}

static TARGET_FIELDS: &[TargetFieldSpec] = &[
    field(keys::TITLE, "Title", true, FieldType::String),
    field(keys::AUTHOR, "Author", false, FieldType::String),
    field(keys::PRICE, "Price", true, FieldType::Number),
    TargetFieldSpec {
        default: Some(FieldDefault::Number(1.0)),
        ..field(keys::QUANTITY, "Quantity", false, FieldType::Number)
    },
    field(keys::SKU, "SKU / Book ID", false, FieldType::String),
    field(keys::ISBN, "ISBN", false, FieldType::String),
    field(keys::PUBLISHER, "Publisher", false, FieldType::String),
    field(keys::PUBLICATION_YEAR, "Publication Year", false, FieldType::Number),
    field(keys::EDITION, "Edition", false, FieldType::String),
    TargetFieldSpec {
        options: CONDITION_OPTIONS,
        default: Some(FieldDefault::Text("good")),
        ..field(keys::CONDITION, "Condition", false, FieldType::Enum)
    },
    TargetFieldSpec {
        options: BINDING_OPTIONS,
        ..field(keys::BINDING, "Binding", false, FieldType::Enum)
    },
    field(keys::DESCRIPTION, "Description", false, FieldType::Text),
    field(keys::CATEGORY, "Category", false, FieldType::String),
    TargetFieldSpec {
        default: Some(FieldDefault::Bool(false)),
        ..field(keys::IS_SIGNED, "Signed", false, FieldType::Boolean)
    },
    TargetFieldSpec {
        default: Some(FieldDefault::Bool(false)),
        ..field(keys::IS_FIRST_EDITION, "First Edition", false, FieldType::Boolean)
    },
    TargetFieldSpec {
        options: STATUS_OPTIONS,
        default: Some(FieldDefault::Text("draft")),
        ..field(keys::STATUS, "Status", false, FieldType::Enum)
    },
    field(keys::IMAGES, "Images", false, FieldType::Images),
    field(keys::WP_POST_ID, "WordPress Post ID", false, FieldType::String),
];

// ==========================================
// TargetSchema - 字段注册表访问入口
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetSchema;

impl TargetSchema {
    /// 按注册顺序返回全部字段
    pub fn list_fields(&self) -> &'static [TargetFieldSpec] {
        TARGET_FIELDS
    }

    pub fn field(&self, key: &str) -> Option<&'static TargetFieldSpec> {
        TARGET_FIELDS.iter().find(|f| f.key == key)
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    /// 字段在注册表中的位置（映射时的优先级，越小越优先）
    pub fn priority_of(&self, key: &str) -> Option<usize> {
        TARGET_FIELDS.iter().position(|f| f.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_required_core_fields_present() {
        let schema = TargetSchema;

        let title = schema.field(keys::TITLE).unwrap();
        assert!(title.required);

        let price = schema.field(keys::PRICE).unwrap();
        assert!(price.required);
        assert_eq!(price.field_type, FieldType::Number);

        let quantity = schema.field(keys::QUANTITY).unwrap();
        assert_eq!(quantity.field_type, FieldType::Number);
        assert_eq!(quantity.default_value(), Some(FieldValue::Number(1.0)));
    }

    #[test]
    fn test_field_keys_unique() {
        let mut seen = HashSet::new();
        for f in TargetSchema.list_fields() {
            assert!(seen.insert(f.key), "重复字段键: {}", f.key);
        }
    }

    #[test]
    fn test_enum_defaults_are_declared_options() {
        for f in TargetSchema.list_fields() {
            if f.field_type != FieldType::Enum {
                continue;
            }
            if let Some(FieldDefault::Text(d)) = f.default {
                assert!(f.allows_option(d), "{} 的默认值不在选项内", f.key);
            }
        }
    }

    #[test]
    fn test_serialize_field_spec() {
        let json = serde_json::to_value(TargetSchema.field(keys::STATUS).unwrap()).unwrap();
        assert_eq!(json["key"], "status");
        assert_eq!(json["type"], "enum");
        assert_eq!(json["default"], "draft");
        assert_eq!(json["options"].as_array().unwrap().len(), STATUS_OPTIONS.len());
    }
}
