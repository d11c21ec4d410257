// ==========================================
// 多商户目录导入引擎 - 暂存会话存储 Trait
// ==========================================
// 职责: 定义暂存会话与提交结果的键值存储接口（带过期）
// 红线: 存储不含业务规则；过期与不存在统一视为“缺失”
// ==========================================

use crate::domain::commit::CommitResult;
use crate::domain::staging::StagingSession;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::Duration;

// ==========================================
// StagingStore Trait
// ==========================================
// 用途: 暂存会话 / 提交结果持久化
// 实现者: SqliteStagingStore（import_staging / import_result 表）
#[async_trait]
pub trait StagingStore: Send + Sync {
    // ===== 暂存会话 =====

    /// 新建会话
    ///
    /// # 参数
    /// - session: 会话数据（import_id 为键）
    /// - ttl: 存活时长
    async fn create(&self, session: &StagingSession, ttl: Duration) -> RepositoryResult<()>;

    /// 读取会话（已过期返回 None）
    async fn get(&self, import_id: &str) -> RepositoryResult<Option<StagingSession>>;

    /// 覆盖写入会话并刷新过期时间
    ///
    /// # 返回
    /// - Ok(true): 写入成功
    /// - Ok(false): 会话不存在或已过期（未写入）
    async fn put(&self, session: &StagingSession, ttl: Duration) -> RepositoryResult<bool>;

    /// 条件更新: 仅当会话处于 staged 且未过期时置为 committed
    ///
    /// # 返回
    /// - Ok(true): 本次调用赢得提交权
    /// - Ok(false): 会话已提交 / 不存在 / 已过期
    async fn claim_for_commit(&self, import_id: &str) -> RepositoryResult<bool>;

    /// 删除会话，返回是否存在未过期会话
    async fn delete(&self, import_id: &str) -> RepositoryResult<bool>;

    /// 清理已过期会话，返回清理条数
    async fn purge_expired(&self) -> RepositoryResult<usize>;

    // ===== 提交结果（独立于会话过期）=====

    async fn put_result(&self, result: &CommitResult) -> RepositoryResult<()>;

    async fn get_result(&self, import_id: &str) -> RepositoryResult<Option<CommitResult>>;

    /// 清理超过保留期的提交结果
    async fn purge_expired_results(&self, retention: Duration) -> RepositoryResult<usize>;
}
