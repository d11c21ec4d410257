// ==========================================
// 多商户目录导入引擎 - 配置层
// ==========================================
// 职责: 导入参数（行数上限/批次大小/会话 TTL/预览行数/结果保留期）
// 存储: config_kv 表，缺失时使用内置默认值
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

pub use config_manager::{config_keys, defaults, ConfigManager};
pub use import_config_trait::{ConfigError, ImportConfigReader};
