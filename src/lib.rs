// ==========================================
// 多商户目录导入引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 流程: CSV 上传 → 列映射 → 标准化/校验 → 暂存会话 → 对账提交
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 暂存存储与目录
pub mod repository;

// 导入层 - 导入管道
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 对外接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CommitMode, FieldType, FieldValue, MatchStrategy, RowFilter, SessionStatus};

// 领域实体
pub use domain::{
    CatalogEntry, CommitOptions, CommitResult, ImportMeta, StagingSession, TargetFieldSpec,
    TargetSchema,
};

// 导入器
pub use importer::{CatalogImporter, CatalogImporterImpl, ImportError, ImportResult};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "多商户目录导入引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
