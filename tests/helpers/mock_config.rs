// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use catalog_import::config::{defaults, ConfigError, ImportConfigReader};

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub max_rows: usize,
    pub commit_batch_size: usize,
    pub staging_ttl_secs: i64,
    pub preview_limit: usize,
    pub result_retention_days: i64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            max_rows: defaults::MAX_ROWS,
            commit_batch_size: defaults::COMMIT_BATCH_SIZE,
            staging_ttl_secs: defaults::STAGING_TTL_SECS,
            preview_limit: defaults::PREVIEW_LIMIT,
            result_retention_days: defaults::RESULT_RETENTION_DAYS,
        }
    }
}

impl MockConfig {
    /// 指定提交批次大小
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            commit_batch_size: batch_size,
            ..Self::default()
        }
    }

    /// 指定会话存活秒数（负数表示写入即过期）
    pub fn with_ttl_secs(ttl_secs: i64) -> Self {
        Self {
            staging_ttl_secs: ttl_secs,
            ..Self::default()
        }
    }

    pub fn with_max_rows(max_rows: usize) -> Self {
        Self {
            max_rows,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImportConfigReader for MockConfig {
    async fn get_max_rows(&self) -> Result<usize, ConfigError> {
        Ok(self.max_rows)
    }

    async fn get_commit_batch_size(&self) -> Result<usize, ConfigError> {
        Ok(self.commit_batch_size)
    }

    async fn get_staging_ttl_secs(&self) -> Result<i64, ConfigError> {
        Ok(self.staging_ttl_secs)
    }

    async fn get_preview_limit(&self) -> Result<usize, ConfigError> {
        Ok(self.preview_limit)
    }

    async fn get_result_retention_days(&self) -> Result<i64, ConfigError> {
        Ok(self.result_retention_days)
    }
}
