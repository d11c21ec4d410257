// ==========================================
// 多商户目录导入引擎 - 目录仓储实现
// ==========================================
// 职责: catalog_entry / catalog_media 表读写（rusqlite）
// 约束: 一个批次一个 Transaction；行级隔离使用 SAVEPOINT
// 红线: 不含对账规则（模式/匹配决策由 Reconciler 负责）
// ==========================================

use crate::domain::catalog::{CatalogEntry, CatalogEntryDraft, MatchFilter, MatchKey};
use crate::repository::catalog_repo::{CatalogRepository, CatalogTransaction};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const ROW_SAVEPOINT: &str = "import_row";

// ==========================================
// SqliteCatalogTransaction - 批次事务内操作
// ==========================================
pub struct SqliteCatalogTransaction<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatalogTransaction<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl CatalogTransaction for SqliteCatalogTransaction<'_> {
    fn find_entry(&self, filter: &MatchFilter) -> RepositoryResult<Option<String>> {
        let vendor = filter.vendor_id.as_deref();

        let found = match &filter.key {
            MatchKey::Isbn(isbn) => self.conn.query_row(
                "SELECT entry_id FROM catalog_entry
                 WHERE vendor_id IS ?1 AND isbn = ?2
                 ORDER BY created_at, rowid LIMIT 1",
                params![vendor, isbn],
                |row| row.get::<_, String>(0),
            ),
            MatchKey::Sku(sku) => self.conn.query_row(
                "SELECT entry_id FROM catalog_entry
                 WHERE vendor_id IS ?1 AND sku = ?2
                 ORDER BY created_at, rowid LIMIT 1",
                params![vendor, sku],
                |row| row.get::<_, String>(0),
            ),
            MatchKey::TitleAuthor { title, author } => self.conn.query_row(
                "SELECT entry_id FROM catalog_entry
                 WHERE vendor_id IS ?1
                   AND lower(title) = lower(?2)
                   AND lower(COALESCE(author, '')) = lower(?3)
                 ORDER BY created_at, rowid LIMIT 1",
                params![vendor, title, author],
                |row| row.get::<_, String>(0),
            ),
            MatchKey::WpPostId(wp_post_id) => self.conn.query_row(
                "SELECT entry_id FROM catalog_entry
                 WHERE vendor_id IS ?1 AND wp_post_id = ?2
                 ORDER BY created_at, rowid LIMIT 1",
                params![vendor, wp_post_id],
                |row| row.get::<_, String>(0),
            ),
        };

        Ok(found.optional()?)
    }

    fn insert_entry(&self, draft: &CatalogEntryDraft) -> RepositoryResult<String> {
        let entry_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.conn.execute(
            r#"
            INSERT INTO catalog_entry (
                entry_id, vendor_id, title, author, price, quantity, sku, isbn,
                publisher, publication_year, edition, condition, binding,
                description, category, is_signed, is_first_edition, status,
                wp_post_id, import_id, created_by, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, COALESCE(?6, 1), ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, COALESCE(?16, 0), COALESCE(?17, 0), COALESCE(?18, 'draft'),
                ?19, ?20, ?21, ?22, ?22
            )
            "#,
            params![
                entry_id,
                draft.vendor_id,
                draft.title,
                draft.author,
                draft.price,
                draft.quantity,
                draft.sku,
                draft.isbn,
                draft.publisher,
                draft.publication_year,
                draft.edition,
                draft.condition,
                draft.binding,
                draft.description,
                draft.category,
                draft.is_signed,
                draft.is_first_edition,
                draft.status,
                draft.wp_post_id,
                draft.import_id,
                draft.created_by,
                now,
            ],
        )?;

        Ok(entry_id)
    }

    fn update_entry(&self, entry_id: &str, draft: &CatalogEntryDraft) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE catalog_entry SET
                title = ?2,
                price = ?3,
                author = COALESCE(?4, author),
                quantity = COALESCE(?5, quantity),
                sku = COALESCE(?6, sku),
                isbn = COALESCE(?7, isbn),
                publisher = COALESCE(?8, publisher),
                publication_year = COALESCE(?9, publication_year),
                edition = COALESCE(?10, edition),
                condition = COALESCE(?11, condition),
                binding = COALESCE(?12, binding),
                description = COALESCE(?13, description),
                category = COALESCE(?14, category),
                is_signed = COALESCE(?15, is_signed),
                is_first_edition = COALESCE(?16, is_first_edition),
                status = COALESCE(?17, status),
                wp_post_id = COALESCE(?18, wp_post_id),
                updated_at = ?19
            WHERE entry_id = ?1
            "#,
            params![
                entry_id,
                draft.title,
                draft.price,
                draft.author,
                draft.quantity,
                draft.sku,
                draft.isbn,
                draft.publisher,
                draft.publication_year,
                draft.edition,
                draft.condition,
                draft.binding,
                draft.description,
                draft.category,
                draft.is_signed,
                draft.is_first_edition,
                draft.status,
                draft.wp_post_id,
                Utc::now(),
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "CatalogEntry".to_string(),
                id: entry_id.to_string(),
            });
        }
        Ok(())
    }

    fn replace_media(&self, entry_id: &str, images: &[String]) -> RepositoryResult<()> {
        self.conn.execute(
            "DELETE FROM catalog_media WHERE entry_id = ?1",
            params![entry_id],
        )?;

        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO catalog_media (entry_id, url, position, is_primary)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, url) in images.iter().enumerate() {
            stmt.execute(params![entry_id, url, position as i64, position == 0])?;
        }
        Ok(())
    }

    fn savepoint(&self) -> RepositoryResult<()> {
        self.conn
            .execute_batch(&format!("SAVEPOINT {}", ROW_SAVEPOINT))
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn release_savepoint(&self) -> RepositoryResult<()> {
        self.conn
            .execute_batch(&format!("RELEASE SAVEPOINT {}", ROW_SAVEPOINT))
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn rollback_to_savepoint(&self) -> RepositoryResult<()> {
        self.conn
            .execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {0}; RELEASE SAVEPOINT {0}",
                ROW_SAVEPOINT
            ))
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }
}

// ==========================================
// SqliteCatalogRepository
// ==========================================
pub struct SqliteCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogRepository {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
        Ok(CatalogEntry {
            entry_id: row.get("entry_id")?,
            data: CatalogEntryDraft {
                vendor_id: row.get("vendor_id")?,
                title: row.get("title")?,
                author: row.get("author")?,
                price: row.get("price")?,
                quantity: row.get("quantity")?,
                sku: row.get("sku")?,
                isbn: row.get("isbn")?,
                publisher: row.get("publisher")?,
                publication_year: row.get("publication_year")?,
                edition: row.get("edition")?,
                condition: row.get("condition")?,
                binding: row.get("binding")?,
                description: row.get("description")?,
                category: row.get("category")?,
                is_signed: row.get("is_signed")?,
                is_first_edition: row.get("is_first_edition")?,
                status: row.get("status")?,
                wp_post_id: row.get("wp_post_id")?,
                images: Vec::new(),
                import_id: row.get("import_id")?,
                created_by: row.get("created_by")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn run_in_transaction<F, T>(&self, work: F) -> RepositoryResult<T>
    where
        F: FnOnce(&dyn CatalogTransaction) -> RepositoryResult<T> + Send,
        T: Send,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let value = work(&SqliteCatalogTransaction::new(&tx))?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }

    async fn get_entry(&self, entry_id: &str) -> RepositoryResult<Option<CatalogEntry>> {
        let conn = self.get_conn()?;

        let entry = conn
            .query_row(
                "SELECT * FROM catalog_entry WHERE entry_id = ?1",
                params![entry_id],
                Self::map_entry_row,
            )
            .optional()?;

        let Some(mut entry) = entry else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT url FROM catalog_media WHERE entry_id = ?1 ORDER BY position",
        )?;
        entry.data.images = stmt
            .query_map(params![entry_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(entry))
    }

    async fn count_entries(&self, vendor_id: Option<&str>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let count: i64 = match vendor_id {
            Some(vendor) => conn.query_row(
                "SELECT COUNT(*) FROM catalog_entry WHERE vendor_id = ?1",
                params![vendor],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM catalog_entry", [], |row| row.get(0))?,
        };

        Ok(count as usize)
    }
}
