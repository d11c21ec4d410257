// ==========================================
// 多商户目录导入引擎 - API 层错误类型
// ==========================================
// 职责: 将导入/仓储错误转换为面向调用方的错误类别
// 约束: 每个变体有稳定的 error_code，调用方据此分支
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("状态冲突: {0}")]
    Conflict(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {message}")]
    ImportError { code: &'static str, message: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 稳定错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "SESSION_NOT_FOUND",
            ApiError::Conflict(_) => "ALREADY_COMMITTED",
            ApiError::ImportError { code, .. } => *code,
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// 会话缺失/已提交/文件本身的问题重试无效
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NotFound(_) | ApiError::Conflict(_) | ApiError::InvalidInput(_) => false,
            ApiError::ImportError { code, .. } => !matches!(*code, "EMPTY_FILE" | "CSV_PARSE_ERROR"),
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => true,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::Other(err) => ApiError::InternalError(err.to_string()),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        let message = err.to_string();
        match err {
            ImportError::SessionNotFound(_) => ApiError::NotFound(message),
            ImportError::AlreadyCommitted(_) => ApiError::Conflict(message),
            ImportError::InvalidMapping(_) | ImportError::InvalidOption(_) => {
                ApiError::InvalidInput(message)
            }
            ImportError::RowNotFound { .. } => ApiError::ImportError {
                code: "ROW_NOT_FOUND",
                message,
            },
            ImportError::EmptyFile(_) => ApiError::ImportError {
                code: "EMPTY_FILE",
                message,
            },
            ImportError::CsvParseError(_) => ApiError::ImportError {
                code: "CSV_PARSE_ERROR",
                message,
            },
            ImportError::Repository(repo_err) => repo_err.into(),
            ImportError::SerializationError(_)
            | ImportError::ConfigError(_)
            | ImportError::InternalError(_)
            | ImportError::Other(_) => ApiError::InternalError(message),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
