// ==========================================
// 多商户目录导入引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 暂存会话存储、目录条目读写，屏蔽数据库细节
// 约束: 所有查询使用参数化
// ==========================================

pub mod catalog_repo;
pub mod catalog_repo_impl;
pub mod error;
pub mod staging_store;
pub mod staging_store_impl;

// 重导出核心仓储
pub use catalog_repo::{CatalogRepository, CatalogTransaction};
pub use catalog_repo_impl::{SqliteCatalogRepository, SqliteCatalogTransaction};
pub use error::{RepositoryError, RepositoryResult};
pub use staging_store::StagingStore;
pub use staging_store_impl::SqliteStagingStore;
