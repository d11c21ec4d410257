// ==========================================
// 多商户目录导入引擎 - 领域模型层
// ==========================================
// 职责: 定义目标字段注册表、暂存会话、目录条目、提交结果
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod catalog;
pub mod commit;
pub mod outcome;
pub mod staging;
pub mod target_schema;
pub mod types;

// 重导出核心类型
pub use catalog::{CatalogEntry, CatalogEntryDraft, MatchFilter, MatchKey};
pub use commit::{
    CommitFailure, CommitOptions, CommitResult, CommitResultMeta, CommitTally, RowAction,
};
pub use outcome::{
    ImportStatusReport, Pagination, ParsedFile, RemapOutcome, RowsPage, SessionSummary,
    StageOutcome,
};
pub use staging::{
    ColumnMapping, FieldError, ImportMeta, ImportStats, NormalizedRow, RawRow,
    RowValidationErrors, StagingSession,
};
pub use target_schema::{TargetFieldSpec, TargetSchema};
pub use types::{
    CommitMode, FailureScope, FieldType, FieldValue, MatchStrategy, RowFilter, SessionStatus,
};
