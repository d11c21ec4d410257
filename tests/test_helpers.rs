// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、导入器组装、测试 CSV 样本
// ==========================================

#![allow(dead_code)]

use catalog_import::config::ConfigManager;
use catalog_import::db::{init_schema, open_shared_connection, open_sqlite_connection};
use catalog_import::importer::CatalogImporterImpl;
use catalog_import::repository::{SqliteCatalogRepository, SqliteStagingStore};
use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;

pub type TestResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub type SqliteImporter =
    CatalogImporterImpl<SqliteStagingStore, SqliteCatalogRepository, ConfigManager>;

/// 场景 1 样本
pub const MOBY_DICK_CSV: &str = "title,author,price\nMoby Dick,Melville,19.99\n1984,Orwell,14.99";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> TestResult<(NamedTempFile, String)> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接（统一 PRAGMA）
pub fn open_test_connection(db_path: &str) -> rusqlite::Result<Connection> {
    open_sqlite_connection(db_path)
}

/// 组装基于 SQLite 的导入器（存储/目录/配置共享一个连接）
pub fn create_test_importer(db_path: &str) -> TestResult<SqliteImporter> {
    let conn = open_shared_connection(db_path)?;
    Ok(CatalogImporterImpl::with_default_components(
        SqliteStagingStore::from_connection(conn.clone()),
        SqliteCatalogRepository::from_connection(conn.clone()),
        ConfigManager::from_connection(conn),
    ))
}

/// 写入 global 配置
pub fn set_test_config(db_path: &str, key: &str, value: &str) -> TestResult<()> {
    let config = ConfigManager::new(db_path)?;
    config.set_global_config_value(key, value)?;
    Ok(())
}
