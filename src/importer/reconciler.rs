// ==========================================
// 多商户目录导入引擎 - 对账引擎
// ==========================================
// 职责: 单行匹配已有条目 → 按提交模式决定 新建/更新/跳过
// 约束: 行失败回滚到行保存点并记录，不影响同批其他行
// 约束: 保存点操作本身失败视为批次失败（向上返回 Err）
// ==========================================
//
// | mode   | 命中已有条目 | 未命中   |
// |--------|--------------|----------|
// | create | skip         | create   |
// | update | update       | skip     |
// | upsert | update       | create   |
//
// create 模式不做查找，“命中→skip”分支仅在决策函数中保留。

use crate::domain::catalog::{CatalogEntryDraft, MatchFilter, MatchKey};
use crate::domain::commit::{CommitFailure, CommitTally, RowAction};
use crate::domain::staging::NormalizedRow;
use crate::domain::target_schema::keys;
use crate::domain::types::{CommitMode, MatchStrategy};
use crate::repository::catalog_repo::CatalogTransaction;
use crate::repository::error::RepositoryResult;
use std::collections::HashSet;
use tracing::{debug, warn};

/// 单行对账决策
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create,
    Update(String),
    Skip,
}

/// 是否需要查找已有条目
pub fn should_lookup(mode: CommitMode, strategy: MatchStrategy) -> bool {
    mode != CommitMode::Create && strategy != MatchStrategy::None
}

/// 按匹配策略构造查找条件；标识字段为空时返回 None（视为未命中）
pub fn build_match_filter(
    strategy: MatchStrategy,
    vendor_id: Option<&str>,
    draft: &CatalogEntryDraft,
) -> Option<MatchFilter> {
    fn non_empty(value: Option<&String>) -> Option<String> {
        value
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    let key = match strategy {
        MatchStrategy::None => return None,
        MatchStrategy::Isbn => MatchKey::Isbn(non_empty(draft.isbn.as_ref())?),
        MatchStrategy::Sku => MatchKey::Sku(non_empty(draft.sku.as_ref())?),
        MatchStrategy::TitleAuthor => MatchKey::TitleAuthor {
            title: non_empty(Some(&draft.title))?,
            author: non_empty(draft.author.as_ref())?,
        },
        MatchStrategy::WpPostId => MatchKey::WpPostId(non_empty(draft.wp_post_id.as_ref())?),
    };

    Some(MatchFilter {
        vendor_id: vendor_id.map(str::to_string),
        key,
    })
}

/// 模式 × 匹配结果 → 决策
pub fn decide(mode: CommitMode, existing: Option<String>) -> Decision {
    match (mode, existing) {
        (CommitMode::Create, Some(_)) => Decision::Skip,
        (CommitMode::Create, None) => Decision::Create,
        (CommitMode::Update, Some(id)) => Decision::Update(id),
        (CommitMode::Update, None) => Decision::Skip,
        (CommitMode::Upsert, Some(id)) => Decision::Update(id),
        (CommitMode::Upsert, None) => Decision::Create,
    }
}

// ==========================================
// Reconciler - 一次提交的对账上下文
// ==========================================
#[derive(Debug, Clone)]
pub struct Reconciler {
    pub import_id: String,
    pub mode: CommitMode,
    pub strategy: MatchStrategy,
    pub vendor_id: Option<String>,
    pub user_id: Option<String>,
    /// 状态列未映射时使用的默认状态（已标准化）
    pub status_override: Option<String>,
    /// 来自文件映射的目标字段（更新时仅这些字段覆盖）
    pub mapped_fields: HashSet<String>,
}

impl Reconciler {
    fn draft_for(&self, row: &NormalizedRow) -> CatalogEntryDraft {
        let mut draft = CatalogEntryDraft::from_row(
            row,
            self.vendor_id.as_deref(),
            self.status_override.as_deref(),
        );
        draft.import_id = Some(self.import_id.clone());
        draft.created_by = self.user_id.clone();
        draft
    }

    /// 处理单行（不含保存点）
    pub fn reconcile_row(
        &self,
        tx: &dyn CatalogTransaction,
        row: &NormalizedRow,
    ) -> RepositoryResult<RowAction> {
        let draft = self.draft_for(row);

        let existing = if should_lookup(self.mode, self.strategy) {
            match build_match_filter(self.strategy, self.vendor_id.as_deref(), &draft) {
                Some(filter) => tx.find_entry(&filter)?,
                None => None,
            }
        } else {
            None
        };

        match decide(self.mode, existing) {
            Decision::Create => {
                let entry_id = tx.insert_entry(&draft)?;
                if !draft.images.is_empty() {
                    tx.replace_media(&entry_id, &draft.images)?;
                }
                Ok(RowAction::Created(entry_id))
            }
            Decision::Update(entry_id) => {
                let mut update = draft;
                update.retain_fields(|key| self.mapped_fields.contains(key));
                tx.update_entry(&entry_id, &update)?;
                if !update.images.is_empty() {
                    tx.replace_media(&entry_id, &update.images)?;
                }
                Ok(RowAction::Updated(entry_id))
            }
            Decision::Skip => Ok(RowAction::Skipped),
        }
    }

    /// 在批次事务内逐行处理，行失败隔离记录
    pub fn apply_batch(
        &self,
        tx: &dyn CatalogTransaction,
        rows: &[NormalizedRow],
    ) -> RepositoryResult<CommitTally> {
        let mut tally = CommitTally::default();

        for row in rows {
            tx.savepoint()?;
            match self.reconcile_row(tx, row) {
                Ok(action) => {
                    tx.release_savepoint()?;
                    debug!(import_id = %self.import_id, row_index = row.row_index, action = ?action, "行处理完成");
                    tally.record(action);
                }
                Err(e) => {
                    tx.rollback_to_savepoint()?;
                    warn!(
                        import_id = %self.import_id,
                        row_index = row.row_index,
                        error = %e,
                        "行写入失败，已回滚到行保存点"
                    );
                    tally.failures.push(CommitFailure::row(
                        row.row_index,
                        row_title(row),
                        e.to_string(),
                    ));
                }
            }
        }

        Ok(tally)
    }
}

/// 失败记录使用的行标题
pub fn row_title(row: &NormalizedRow) -> String {
    row.text(keys::TITLE).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> CatalogEntryDraft {
        CatalogEntryDraft {
            title: "Moby Dick".to_string(),
            author: Some("Melville".to_string()),
            isbn: Some(" ".to_string()),
            sku: Some("SKU-1".to_string()),
            ..CatalogEntryDraft::default()
        }
    }

    #[test]
    fn test_decision_table() {
        let id = || Some("e1".to_string());
        assert_eq!(decide(CommitMode::Create, None), Decision::Create);
        assert_eq!(decide(CommitMode::Create, id()), Decision::Skip);
        assert_eq!(decide(CommitMode::Update, id()), Decision::Update("e1".to_string()));
        assert_eq!(decide(CommitMode::Update, None), Decision::Skip);
        assert_eq!(decide(CommitMode::Upsert, id()), Decision::Update("e1".to_string()));
        assert_eq!(decide(CommitMode::Upsert, None), Decision::Create);
    }

    #[test]
    fn test_should_lookup() {
        assert!(!should_lookup(CommitMode::Create, MatchStrategy::Sku));
        assert!(!should_lookup(CommitMode::Upsert, MatchStrategy::None));
        assert!(should_lookup(CommitMode::Update, MatchStrategy::Isbn));
    }

    #[test]
    fn test_build_match_filter() {
        let d = draft();

        let sku = build_match_filter(MatchStrategy::Sku, Some("v1"), &d).unwrap();
        assert_eq!(sku.vendor_id.as_deref(), Some("v1"));
        assert_eq!(sku.key, MatchKey::Sku("SKU-1".to_string()));

        // 空白 ISBN 不查找
        assert!(build_match_filter(MatchStrategy::Isbn, Some("v1"), &d).is_none());
        assert!(build_match_filter(MatchStrategy::WpPostId, Some("v1"), &d).is_none());
        assert!(build_match_filter(MatchStrategy::None, Some("v1"), &d).is_none());

        let ta = build_match_filter(MatchStrategy::TitleAuthor, None, &d).unwrap();
        assert_eq!(
            ta.key,
            MatchKey::TitleAuthor {
                title: "Moby Dick".to_string(),
                author: "Melville".to_string()
            }
        );

        let no_author = CatalogEntryDraft {
            author: None,
            ..draft()
        };
        assert!(build_match_filter(MatchStrategy::TitleAuthor, None, &no_author).is_none());
    }
}
