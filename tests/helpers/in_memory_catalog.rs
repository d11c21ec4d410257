// ==========================================
// 内存目录仓储替身 - 用于集成测试
// ==========================================
// 批次事务: 在状态快照上执行，成功后整体写回
// 故障注入: 指定批次号（从 1 开始）在提交时失败，整批丢弃
// 约束: (vendor_id, sku) 唯一，与 SQLite 表结构一致
// ==========================================

use async_trait::async_trait;
use catalog_import::domain::catalog::{CatalogEntry, CatalogEntryDraft, MatchFilter, MatchKey};
use catalog_import::repository::{
    CatalogRepository, CatalogTransaction, RepositoryError, RepositoryResult,
};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    pub entries: Vec<(String, CatalogEntryDraft)>,
    next_id: usize,
}

impl CatalogState {
    fn position(&self, entry_id: &str) -> Option<usize> {
        self.entries.iter().position(|(id, _)| id == entry_id)
    }
}

fn merge<T: Clone>(slot: &mut Option<T>, update: &Option<T>) {
    if update.is_some() {
        slot.clone_from(update);
    }
}

/// 批次内事务
struct InMemoryTransaction {
    working: RefCell<CatalogState>,
    savepoint: RefCell<Option<CatalogState>>,
}

impl CatalogTransaction for InMemoryTransaction {
    fn find_entry(&self, filter: &MatchFilter) -> RepositoryResult<Option<String>> {
        let state = self.working.borrow();
        let found = state.entries.iter().find(|(_, e)| {
            e.vendor_id == filter.vendor_id
                && match &filter.key {
                    MatchKey::Isbn(isbn) => e.isbn.as_deref() == Some(isbn.as_str()),
                    MatchKey::Sku(sku) => e.sku.as_deref() == Some(sku.as_str()),
                    MatchKey::WpPostId(id) => e.wp_post_id.as_deref() == Some(id.as_str()),
                    MatchKey::TitleAuthor { title, author } => {
                        e.title.to_lowercase() == title.to_lowercase()
                            && e.author.as_deref().map(str::to_lowercase)
                                == Some(author.to_lowercase())
                    }
                }
        });
        Ok(found.map(|(id, _)| id.clone()))
    }

    fn insert_entry(&self, draft: &CatalogEntryDraft) -> RepositoryResult<String> {
        let mut state = self.working.borrow_mut();
        if let Some(sku) = &draft.sku {
            let taken = state
                .entries
                .iter()
                .any(|(_, e)| e.vendor_id == draft.vendor_id && e.sku.as_ref() == Some(sku));
            if taken {
                return Err(RepositoryError::UniqueConstraintViolation(format!(
                    "catalog_entry.vendor_id, catalog_entry.sku: {}",
                    sku
                )));
            }
        }
        state.next_id += 1;
        let entry_id = format!("entry-{}", state.next_id);
        state.entries.push((entry_id.clone(), draft.clone()));
        Ok(entry_id)
    }

    fn update_entry(&self, entry_id: &str, draft: &CatalogEntryDraft) -> RepositoryResult<()> {
        let mut state = self.working.borrow_mut();
        let idx = state.position(entry_id).ok_or_else(|| RepositoryError::NotFound {
            entity: "CatalogEntry".to_string(),
            id: entry_id.to_string(),
        })?;
        let existing = &mut state.entries[idx].1;
        existing.title = draft.title.clone();
        existing.price = draft.price;
        merge(&mut existing.author, &draft.author);
        merge(&mut existing.quantity, &draft.quantity);
        merge(&mut existing.sku, &draft.sku);
        merge(&mut existing.isbn, &draft.isbn);
        merge(&mut existing.publisher, &draft.publisher);
        merge(&mut existing.publication_year, &draft.publication_year);
        merge(&mut existing.edition, &draft.edition);
        merge(&mut existing.condition, &draft.condition);
        merge(&mut existing.binding, &draft.binding);
        merge(&mut existing.description, &draft.description);
        merge(&mut existing.category, &draft.category);
        merge(&mut existing.is_signed, &draft.is_signed);
        merge(&mut existing.is_first_edition, &draft.is_first_edition);
        merge(&mut existing.status, &draft.status);
        merge(&mut existing.wp_post_id, &draft.wp_post_id);
        Ok(())
    }

    fn replace_media(&self, entry_id: &str, images: &[String]) -> RepositoryResult<()> {
        let mut state = self.working.borrow_mut();
        if let Some(idx) = state.position(entry_id) {
            state.entries[idx].1.images = images.to_vec();
        }
        Ok(())
    }

    fn savepoint(&self) -> RepositoryResult<()> {
        *self.savepoint.borrow_mut() = Some(self.working.borrow().clone());
        Ok(())
    }

    fn release_savepoint(&self) -> RepositoryResult<()> {
        *self.savepoint.borrow_mut() = None;
        Ok(())
    }

    fn rollback_to_savepoint(&self) -> RepositoryResult<()> {
        let snapshot = self.savepoint.borrow_mut().take().ok_or_else(|| {
            RepositoryError::DatabaseTransactionError("no active savepoint".to_string())
        })?;
        *self.working.borrow_mut() = snapshot;
        Ok(())
    }
}

/// 内存目录仓储
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
    failing_batches: HashSet<usize>,
    batches_started: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定在提交时失败的批次号（从 1 开始）
    pub fn with_failing_batches(batches: &[usize]) -> Self {
        Self {
            failing_batches: batches.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// 预置已有条目，返回条目 ID
    pub fn seed(&self, draft: CatalogEntryDraft) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let entry_id = format!("entry-{}", state.next_id);
        state.entries.push((entry_id.clone(), draft));
        entry_id
    }

    pub fn entries(&self) -> Vec<(String, CatalogEntryDraft)> {
        self.state.lock().unwrap().entries.clone()
    }

    pub fn batches_started(&self) -> usize {
        self.batches_started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn run_in_transaction<F, T>(&self, work: F) -> RepositoryResult<T>
    where
        F: FnOnce(&dyn CatalogTransaction) -> RepositoryResult<T> + Send,
        T: Send,
    {
        let batch_no = self.batches_started.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.state.lock().unwrap().clone();

        let tx = InMemoryTransaction {
            working: RefCell::new(snapshot),
            savepoint: RefCell::new(None),
        };
        let result = work(&tx)?;

        if self.failing_batches.contains(&batch_no) {
            return Err(RepositoryError::DatabaseTransactionError(format!(
                "injected commit failure for batch {}",
                batch_no
            )));
        }

        *self.state.lock().unwrap() = tx.working.into_inner();
        Ok(result)
    }

    async fn get_entry(&self, entry_id: &str) -> RepositoryResult<Option<CatalogEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state.position(entry_id).map(|idx| {
            let now = Utc::now();
            CatalogEntry {
                entry_id: entry_id.to_string(),
                data: state.entries[idx].1.clone(),
                created_at: now,
                updated_at: now,
            }
        }))
    }

    async fn count_entries(&self, vendor_id: Option<&str>) -> RepositoryResult<usize> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entries
            .iter()
            .filter(|(_, e)| vendor_id.is_none() || e.vendor_id.as_deref() == vendor_id)
            .count())
    }
}
