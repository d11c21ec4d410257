// ==========================================
// 多商户目录导入引擎 - 提交（对账）领域模型
// ==========================================
// 职责: 提交选项 / 行处理结果 / 失败记录 / 提交结果
// 红线: 提交结果独立于暂存会话持久化（会话过期后仍可查询）
// ==========================================

use crate::domain::types::{CommitMode, FailureScope, MatchStrategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// CommitOptions - 提交选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOptions {
    #[serde(default)]
    pub mode: CommitMode,
    #[serde(default)]
    pub match_strategy: MatchStrategy,
    #[serde(default = "default_status")]
    pub default_status: String,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_status() -> String {
    "draft".to_string()
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            mode: CommitMode::default(),
            match_strategy: MatchStrategy::default(),
            default_status: default_status(),
            vendor_id: None,
            user_id: None,
        }
    }
}

impl CommitOptions {
    pub fn new(mode: CommitMode, match_strategy: MatchStrategy) -> Self {
        Self {
            mode,
            match_strategy,
            ..Self::default()
        }
    }
}

// ==========================================
// RowAction - 单行对账决策/结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    Created(String), // 新条目 ID
    Updated(String), // 被更新条目 ID
    Skipped,
}

// ==========================================
// CommitFailure - 提交失败记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFailure {
    pub row_index: usize,
    pub title: String,
    pub error: String,
    pub scope: FailureScope,
}

impl CommitFailure {
    pub fn row(row_index: usize, title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            row_index,
            title: title.into(),
            error: error.into(),
            scope: FailureScope::Row,
        }
    }

    pub fn batch(row_index: usize, title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            row_index,
            title: title.into(),
            error: error.into(),
            scope: FailureScope::Batch,
        }
    }
}

/// 提交结果附带的元信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResultMeta {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub mode: CommitMode,
    pub match_strategy: MatchStrategy,
    pub elapsed_ms: u64,
}

// ==========================================
// CommitResult - 提交结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub import_id: String,
    pub status: String, // 固定为 "completed"
    pub created_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub total_processed: usize,
    pub failures: Vec<CommitFailure>,
    pub created_ids: Vec<String>,
    pub completed_at: DateTime<Utc>,
    pub meta: CommitResultMeta,
}

pub const COMMIT_STATUS_COMPLETED: &str = "completed";

/// 提交过程中累积的计数
#[derive(Debug, Clone, Default)]
pub struct CommitTally {
    pub created_ids: Vec<String>,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub failures: Vec<CommitFailure>,
}

impl CommitTally {
    pub fn record(&mut self, action: RowAction) {
        match action {
            RowAction::Created(id) => self.created_ids.push(id),
            RowAction::Updated(_) => self.updated_count += 1,
            RowAction::Skipped => self.skipped_count += 1,
        }
    }

    /// 合并一个已提交批次的结果
    pub fn absorb(&mut self, other: CommitTally) {
        self.created_ids.extend(other.created_ids);
        self.updated_count += other.updated_count;
        self.skipped_count += other.skipped_count;
        self.failures.extend(other.failures);
    }

    pub fn processed(&self) -> usize {
        self.created_ids.len() + self.updated_count + self.skipped_count + self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_options_defaults_from_json() {
        let opts: CommitOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.mode, CommitMode::Create);
        assert_eq!(opts.match_strategy, MatchStrategy::None);
        assert_eq!(opts.default_status, "draft");

        let opts: CommitOptions =
            serde_json::from_str(r#"{"mode":"upsert","matchStrategy":"title_author"}"#).unwrap();
        assert_eq!(opts.mode, CommitMode::Upsert);
        assert_eq!(opts.match_strategy, MatchStrategy::TitleAuthor);
    }

    #[test]
    fn test_tally_absorb() {
        let mut total = CommitTally::default();
        let mut batch = CommitTally::default();
        batch.record(RowAction::Created("a".to_string()));
        batch.record(RowAction::Updated("b".to_string()));
        batch.record(RowAction::Skipped);
        batch.failures.push(CommitFailure::row(4, "X", "boom"));

        total.absorb(batch);
        assert_eq!(total.created_ids, vec!["a".to_string()]);
        assert_eq!(total.updated_count, 1);
        assert_eq!(total.skipped_count, 1);
        assert_eq!(total.processed(), 4);
    }
}
