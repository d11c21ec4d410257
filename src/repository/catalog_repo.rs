// ==========================================
// 多商户目录导入引擎 - 目录仓储 Trait
// ==========================================
// 职责: 定义目录条目读写接口与批次事务边界（不包含对账规则）
// 约束: 一个批次一个事务；行级隔离依赖事务内保存点
// ==========================================

use crate::domain::catalog::{CatalogEntry, CatalogEntryDraft, MatchFilter};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// CatalogTransaction - 事务内操作
// ==========================================
// 用途: 对账引擎在批次事务内逐行调用
// 实现者: SqliteCatalogTransaction
pub trait CatalogTransaction {
    /// 查找已有条目（命中多条时取第一条）
    fn find_entry(&self, filter: &MatchFilter) -> RepositoryResult<Option<String>>;

    /// 新建条目，返回条目 ID
    fn insert_entry(&self, draft: &CatalogEntryDraft) -> RepositoryResult<String>;

    /// 合并更新: 仅 draft 中非空字段覆盖已有值
    fn update_entry(&self, entry_id: &str, draft: &CatalogEntryDraft) -> RepositoryResult<()>;

    /// 整体替换条目图片（先删后建，第一张为主图）
    fn replace_media(&self, entry_id: &str, images: &[String]) -> RepositoryResult<()>;

    // ===== 行级保存点 =====

    fn savepoint(&self) -> RepositoryResult<()>;

    fn release_savepoint(&self) -> RepositoryResult<()>;

    fn rollback_to_savepoint(&self) -> RepositoryResult<()>;
}

// ==========================================
// CatalogRepository Trait
// ==========================================
// 实现者: SqliteCatalogRepository
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// 在单个事务中执行一个批次
    ///
    /// # 参数
    /// - work: 批次处理闭包；返回 Err 时整个事务回滚
    ///
    /// # 返回
    /// - Ok(T): 事务已提交
    /// - Err: 闭包失败或事务无法开启/提交（整批回滚）
    async fn run_in_transaction<F, T>(&self, work: F) -> RepositoryResult<T>
    where
        F: FnOnce(&dyn CatalogTransaction) -> RepositoryResult<T> + Send,
        T: Send;

    /// 读取条目（含图片）
    async fn get_entry(&self, entry_id: &str) -> RepositoryResult<Option<CatalogEntry>>;

    /// 统计商户下条目数（None 统计全部）
    async fn count_entries(&self, vendor_id: Option<&str>) -> RepositoryResult<usize>;
}
