// ==========================================
// 多商户目录导入引擎 - 暂存会话领域模型
// ==========================================
// 职责: 列映射 / 原始行 / 标准化行 / 统计 / 暂存会话
// 约束: _rowIndex 解析时一次性分配（从 1 开始连续），之后永不重编号
// 约束: stats.validRows + stats.invalidRows == normalizedRows.len()
// ==========================================

use crate::domain::types::{FieldValue, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ==========================================
// ColumnMapping - 源列 → 目标字段
// ==========================================
// 键为原始表头（大小写敏感）；None 表示忽略该列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<String, Option<String>>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_column: impl Into<String>, target: Option<String>) {
        self.0.insert(source_column.into(), target);
    }

    pub fn contains_source(&self, source_column: &str) -> bool {
        self.0.contains_key(source_column)
    }

    /// 源列映射到的目标字段（未映射/忽略返回 None）
    pub fn target_of(&self, source_column: &str) -> Option<&str> {
        self.0.get(source_column).and_then(|t| t.as_deref())
    }

    /// 目标字段对应的源列
    pub fn source_of(&self, target_key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, t)| t.as_deref() == Some(target_key))
            .map(|(s, _)| s.as_str())
    }

    /// 已映射的 (源列, 目标字段) 对
    pub fn mapped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(s, t)| t.as_deref().map(|t| (s.as_str(), t)))
    }

    pub fn source_columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_mapped(&self, target_key: &str) -> bool {
        self.source_of(target_key).is_some()
    }

    /// 返回第一个被多个源列占用的目标字段
    pub fn first_duplicate_target(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.mapped().map(|(_, t)| t).find(|t| !seen.insert(*t))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Option<String>)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ==========================================
// RawRow - 原始行（源列 → 原始字符串）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(rename = "_rowIndex")]
    pub row_index: usize,
    #[serde(flatten)]
    pub cells: BTreeMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

// ==========================================
// FieldError - 字段级校验错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ==========================================
// NormalizedRow - 标准化行（目标字段 → 类型化取值）
// ==========================================
// _errors 为空即有效行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    #[serde(rename = "_rowIndex")]
    pub row_index: usize,
    #[serde(rename = "_errors", default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(flatten)]
    pub values: BTreeMap<String, FieldValue>,
}

impl NormalizedRow {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            errors: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// 非空白文本取值
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_f64)
    }
}

/// 单行校验错误汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowValidationErrors {
    pub row_index: usize,
    pub errors: Vec<FieldError>,
}

// ==========================================
// ImportStats - 暂存统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub total_rows: usize,   // 暂存行数（截断后）
    pub total_parsed: usize, // 文件实际数据行数
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub truncated: bool,
}

// ==========================================
// ImportMeta - 上传元信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMeta {
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub role: String,
}

impl ImportMeta {
    pub fn new(file_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            uploaded_at: Utc::now(),
            vendor_id: None,
            user_id: None,
            role: role.into(),
        }
    }

    pub fn with_vendor(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

// ==========================================
// StagingSession - 一次导入的暂存会话
// ==========================================
// 生命周期: 上传时创建；重映射/行编辑/提交时原地修改；过期即消失
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingSession {
    pub import_id: String,
    pub csv_headers: Vec<String>,
    pub suggested_mappings: ColumnMapping,
    pub current_mappings: ColumnMapping,
    pub raw_rows: Vec<RawRow>,
    pub normalized_rows: Vec<NormalizedRow>,
    pub validation_errors: Vec<RowValidationErrors>,
    pub stats: ImportStats,
    pub meta: ImportMeta,
    pub status: SessionStatus,
}

impl StagingSession {
    pub fn is_committed(&self) -> bool {
        self.status == SessionStatus::Committed
    }

    /// 按当前 normalized_rows 重新计算有效/无效统计与错误列表
    pub fn refresh_validation_summary(&mut self) {
        let mut valid = 0;
        let mut invalid = 0;
        let mut errors = Vec::new();

        for row in &self.normalized_rows {
            if row.is_valid() {
                valid += 1;
            } else {
                invalid += 1;
                errors.push(RowValidationErrors {
                    row_index: row.row_index,
                    errors: row.errors.clone(),
                });
            }
        }

        self.stats.valid_rows = valid;
        self.stats.invalid_rows = invalid;
        self.validation_errors = errors;
    }

    pub fn raw_row(&self, row_index: usize) -> Option<&RawRow> {
        self.raw_rows.iter().find(|r| r.row_index == row_index)
    }

    pub fn raw_row_mut(&mut self, row_index: usize) -> Option<&mut RawRow> {
        self.raw_rows.iter_mut().find(|r| r.row_index == row_index)
    }

    pub fn normalized_row_mut(&mut self, row_index: usize) -> Option<&mut NormalizedRow> {
        self.normalized_rows
            .iter_mut()
            .find(|r| r.row_index == row_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_mapping_duplicate_target() {
        let mut mapping = ColumnMapping::new();
        mapping.insert("Title", Some("title".to_string()));
        mapping.insert("Name", Some("title".to_string()));
        mapping.insert("Notes", None);

        assert_eq!(mapping.first_duplicate_target(), Some("title"));
        assert_eq!(mapping.target_of("Notes"), None);
        assert_eq!(mapping.mapped().count(), 2);
    }

    #[test]
    fn test_normalized_row_json_shape() {
        let mut row = NormalizedRow::new(3);
        row.values
            .insert("title".to_string(), FieldValue::Text("Moby Dick".to_string()));
        row.values.insert("price".to_string(), FieldValue::Number(19.99));

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["_rowIndex"], 3);
        assert_eq!(json["title"], "Moby Dick");
        assert!(json.get("_errors").is_none());

        row.errors.push(FieldError::new("price", "价格必填"));
        let json = serde_json::to_string(&row).unwrap();
        let back: NormalizedRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.row_index, 3);
        assert_eq!(back.errors.len(), 1);
        assert!(!back.is_valid());
        assert_eq!(back.text("title"), Some("Moby Dick"));
    }
}
