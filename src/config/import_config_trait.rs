// ==========================================
// 多商户目录导入引擎 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

/// 配置读取错误
pub type ConfigError = Box<dyn Error + Send + Sync>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 单个文件暂存行数上限
    ///
    /// # 默认值
    /// - 5000
    async fn get_max_rows(&self) -> Result<usize, ConfigError>;

    /// 提交批次大小（每批一个事务）
    ///
    /// # 默认值
    /// - 100
    async fn get_commit_batch_size(&self) -> Result<usize, ConfigError>;

    /// 暂存会话存活秒数
    ///
    /// # 默认值
    /// - 3600
    async fn get_staging_ttl_secs(&self) -> Result<i64, ConfigError>;

    /// 预览行数上限（stage / remap 返回）
    ///
    /// # 默认值
    /// - 100
    async fn get_preview_limit(&self) -> Result<usize, ConfigError>;

    /// 提交结果保留天数
    ///
    /// # 默认值
    /// - 30
    async fn get_result_retention_days(&self) -> Result<i64, ConfigError>;
}
