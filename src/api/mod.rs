// ==========================================
// 多商户目录导入引擎 - API 层
// ==========================================
// 职责: 对外提供导入接口，统一错误码
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{CommitRequest, ErrorReportResponse, ImportApi, StageRequest};
