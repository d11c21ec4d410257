// ==========================================
// 多商户目录导入引擎 - 暂存会话存储实现
// ==========================================
// 职责: import_staging / import_result 表读写（rusqlite）
// 约束: 过期判断统一使用 expires_at_ms > now_ms
// 约束: status 列为准；committed 状态不可被 put 回退
// ==========================================

use crate::domain::commit::CommitResult;
use crate::domain::staging::StagingSession;
use crate::domain::types::SessionStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::staging_store::StagingStore;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// SqliteStagingStore
// ==========================================
pub struct SqliteStagingStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStagingStore {
    /// 创建新的 Store 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从共享连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn expires_at_ms(ttl: Duration) -> i64 {
        Self::now_ms().saturating_add(ttl.num_milliseconds())
    }
}

#[async_trait]
impl StagingStore for SqliteStagingStore {
    async fn create(&self, session: &StagingSession, ttl: Duration) -> RepositoryResult<()> {
        let payload = serde_json::to_string(session)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO import_staging (
                import_id, status, payload_json, created_at, updated_at, expires_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?4, ?5)
            "#,
            params![
                session.import_id,
                session.status.as_str(),
                payload,
                now,
                Self::expires_at_ms(ttl),
            ],
        )?;

        debug!(import_id = %session.import_id, bytes = payload.len(), "暂存会话已创建");
        Ok(())
    }

    async fn get(&self, import_id: &str) -> RepositoryResult<Option<StagingSession>> {
        let conn = self.get_conn()?;

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT status, payload_json FROM import_staging
                 WHERE import_id = ?1 AND expires_at_ms > ?2",
                params![import_id, Self::now_ms()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((status, payload)) = row else {
            return Ok(None);
        };

        let mut session: StagingSession = serde_json::from_str(&payload)?;
        session.status = SessionStatus::from_str(&status)
            .map_err(RepositoryError::SerializationError)?;
        Ok(Some(session))
    }

    async fn put(&self, session: &StagingSession, ttl: Duration) -> RepositoryResult<bool> {
        let payload = serde_json::to_string(session)?;
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"
            UPDATE import_staging
            SET payload_json = ?2,
                status = CASE WHEN status = 'committed' THEN 'committed' ELSE ?3 END,
                updated_at = ?4,
                expires_at_ms = ?5
            WHERE import_id = ?1 AND expires_at_ms > ?6
            "#,
            params![
                session.import_id,
                payload,
                session.status.as_str(),
                Utc::now().to_rfc3339(),
                Self::expires_at_ms(ttl),
                Self::now_ms(),
            ],
        )?;

        Ok(affected == 1)
    }

    async fn claim_for_commit(&self, import_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"
            UPDATE import_staging
            SET status = 'committed', updated_at = ?2
            WHERE import_id = ?1 AND status = 'staged' AND expires_at_ms > ?3
            "#,
            params![import_id, Utc::now().to_rfc3339(), Self::now_ms()],
        )?;

        Ok(affected == 1)
    }

    async fn delete(&self, import_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "DELETE FROM import_staging WHERE import_id = ?1 AND expires_at_ms > ?2",
            params![import_id, Self::now_ms()],
        )?;

        Ok(affected > 0)
    }

    async fn purge_expired(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let purged = conn.execute(
            "DELETE FROM import_staging WHERE expires_at_ms <= ?1",
            params![Self::now_ms()],
        )?;

        if purged > 0 {
            debug!(purged, "已清理过期暂存会话");
        }
        Ok(purged)
    }

    async fn put_result(&self, result: &CommitResult) -> RepositoryResult<()> {
        let json = serde_json::to_string(result)?;
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO import_result (import_id, result_json, completed_at_ms)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(import_id) DO UPDATE SET
                result_json = excluded.result_json,
                completed_at_ms = excluded.completed_at_ms
            "#,
            params![
                result.import_id,
                json,
                result.completed_at.timestamp_millis()
            ],
        )?;

        Ok(())
    }

    async fn get_result(&self, import_id: &str) -> RepositoryResult<Option<CommitResult>> {
        let conn = self.get_conn()?;

        let json: Option<String> = conn
            .query_row(
                "SELECT result_json FROM import_result WHERE import_id = ?1",
                params![import_id],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|j| serde_json::from_str(&j).map_err(RepositoryError::from))
            .transpose()
    }

    async fn purge_expired_results(&self, retention: Duration) -> RepositoryResult<usize> {
        let cutoff = Self::now_ms().saturating_sub(retention.num_milliseconds());
        let conn = self.get_conn()?;

        let purged = conn.execute(
            "DELETE FROM import_result WHERE completed_at_ms < ?1",
            params![cutoff],
        )?;

        Ok(purged)
    }
}
