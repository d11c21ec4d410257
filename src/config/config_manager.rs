// ==========================================
// 多商户目录导入引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约束: 缺失或无法解析的配置回退默认值
// ==========================================

use crate::config::import_config_trait::{ConfigError, ImportConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 配置键
pub mod config_keys {
    pub const MAX_ROWS: &str = "import/max_rows";
    pub const COMMIT_BATCH_SIZE: &str = "import/commit_batch_size";
    pub const STAGING_TTL_SECS: &str = "import/staging_ttl_secs";
    pub const PREVIEW_LIMIT: &str = "import/preview_limit";
    pub const RESULT_RETENTION_DAYS: &str = "import/result_retention_days";
}

/// 默认值
pub mod defaults {
    pub const MAX_ROWS: usize = 5000;
    pub const COMMIT_BATCH_SIZE: usize = 100;
    pub const STAGING_TTL_SECS: i64 = 3600;
    pub const PREVIEW_LIMIT: usize = 100;
    pub const RESULT_RETENTION_DAYS: i64 = 30;
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置，缺失或非法时回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + Copy + PartialOrd + Default,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };

        match raw.trim().parse::<T>() {
            Ok(v) if v > T::default() => Ok(v),
            _ => {
                warn!(key, value = %raw, "配置值无效，使用默认值");
                Ok(default)
            }
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_rows(&self) -> Result<usize, ConfigError> {
        self.get_parsed_or_default(config_keys::MAX_ROWS, defaults::MAX_ROWS)
    }

    async fn get_commit_batch_size(&self) -> Result<usize, ConfigError> {
        self.get_parsed_or_default(config_keys::COMMIT_BATCH_SIZE, defaults::COMMIT_BATCH_SIZE)
    }

    async fn get_staging_ttl_secs(&self) -> Result<i64, ConfigError> {
        self.get_parsed_or_default(config_keys::STAGING_TTL_SECS, defaults::STAGING_TTL_SECS)
    }

    async fn get_preview_limit(&self) -> Result<usize, ConfigError> {
        self.get_parsed_or_default(config_keys::PREVIEW_LIMIT, defaults::PREVIEW_LIMIT)
    }

    async fn get_result_retention_days(&self) -> Result<i64, ConfigError> {
        self.get_parsed_or_default(
            config_keys::RESULT_RETENTION_DAYS,
            defaults::RESULT_RETENTION_DAYS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let config = manager();
        assert_eq!(config.get_max_rows().await.unwrap(), 5000);
        assert_eq!(config.get_commit_batch_size().await.unwrap(), 100);
        assert_eq!(config.get_staging_ttl_secs().await.unwrap(), 3600);
        assert_eq!(config.get_preview_limit().await.unwrap(), 100);
        assert_eq!(config.get_result_retention_days().await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_override_and_invalid_fallback() {
        let config = manager();
        config
            .set_global_config_value(config_keys::COMMIT_BATCH_SIZE, "25")
            .unwrap();
        assert_eq!(config.get_commit_batch_size().await.unwrap(), 25);

        config
            .set_global_config_value(config_keys::COMMIT_BATCH_SIZE, "abc")
            .unwrap();
        assert_eq!(config.get_commit_batch_size().await.unwrap(), 100);

        // 非正数视为无效
        config
            .set_global_config_value(config_keys::MAX_ROWS, "0")
            .unwrap();
        assert_eq!(config.get_max_rows().await.unwrap(), 5000);
    }
}
