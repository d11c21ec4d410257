// ==========================================
// 多商户目录导入引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 解析错误 / 会话错误 / 映射错误 / 仓储错误
// 说明: 行级校验错误与提交行失败是数据（FieldError / CommitFailure），不走 Err
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误（需修正文件后重新上传）=====
    #[error("文件为空: {0}")]
    EmptyFile(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 会话错误（不可重试）=====
    #[error("导入会话不存在或已过期: {0}")]
    SessionNotFound(String),

    #[error("导入会话已提交: {0}")]
    AlreadyCommitted(String),

    // ===== 请求参数错误 =====
    #[error("列映射无效: {0}")]
    InvalidMapping(String),

    #[error("暂存行不存在 (会话 {import_id}, 行 {row_index})")]
    RowNotFound { import_id: String, row_index: usize },

    #[error("提交选项无效: {0}")]
    InvalidOption(String),

    // ===== 数据访问错误 =====
    #[error("仓储操作失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error("序列化失败: {0}")]
    SerializationError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 会话已过期/已提交类错误不可重试，需要重新上传
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ImportError::SessionNotFound(_)
                | ImportError::AlreadyCommitted(_)
                | ImportError::EmptyFile(_)
                | ImportError::CsvParseError(_)
        )
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::SerializationError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
