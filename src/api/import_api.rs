// ==========================================
// 多商户目录导入引擎 - 导入 API
// ==========================================
// 职责: 组装 SQLite 存储/目录/配置与导入器，对外暴露导入操作
// 约束: 字符串形式的选项在此解析，非法值返回 InvalidInput
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::open_shared_connection;
use crate::domain::commit::{CommitOptions, CommitResult};
use crate::domain::outcome::{ImportStatusReport, RemapOutcome, RowsPage, StageOutcome};
use crate::domain::staging::{ColumnMapping, ImportMeta};
use crate::domain::target_schema::TargetFieldSpec;
use crate::domain::types::{CommitMode, MatchStrategy, RowFilter};
use crate::importer::{CatalogImporter, CatalogImporterImpl, ImportError};
use crate::repository::{SqliteCatalogRepository, SqliteStagingStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// 默认分页大小
pub const DEFAULT_PAGE_LIMIT: usize = 50;

type SqliteImporter = CatalogImporterImpl<SqliteStagingStore, SqliteCatalogRepository, ConfigManager>;

/// 上传请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    pub file_name: String,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// 上传者角色（vendor / admin）
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "vendor".to_string()
}

/// 提交请求（选项为字符串，缺省使用默认值）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub match_strategy: Option<String>,
    #[serde(default)]
    pub default_status: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl CommitRequest {
    /// 解析为提交选项
    pub fn into_options(self) -> Result<CommitOptions, ImportError> {
        let mut options = CommitOptions::default();
        if let Some(mode) = self.mode.as_deref() {
            options.mode = CommitMode::from_str(mode).map_err(ImportError::InvalidOption)?;
        }
        if let Some(strategy) = self.match_strategy.as_deref() {
            options.match_strategy =
                MatchStrategy::from_str(strategy).map_err(ImportError::InvalidOption)?;
        }
        if let Some(status) = self.default_status {
            options.default_status = status;
        }
        options.vendor_id = self.vendor_id;
        options.user_id = self.user_id;
        Ok(options)
    }
}

/// 错误报告响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReportResponse {
    pub import_id: String,
    /// 建议下载文件名
    pub file_name: String,
    pub content: String,
}

/// 导入 API
pub struct ImportApi {
    importer: SqliteImporter,
}

impl ImportApi {
    /// 打开数据库（含建表）并创建 ImportApi
    ///
    /// # 参数
    /// - db_path: SQLite 数据库文件路径
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_shared_connection(db_path)
            .map_err(|e| ApiError::DatabaseError(format!("打开数据库失败: {}", e)))?;

        let importer = CatalogImporterImpl::with_default_components(
            SqliteStagingStore::from_connection(conn.clone()),
            SqliteCatalogRepository::from_connection(conn.clone()),
            ConfigManager::from_connection(conn),
        );
        Ok(Self { importer })
    }

    /// 直接使用已组装的导入器
    pub fn from_importer(importer: SqliteImporter) -> Self {
        Self { importer }
    }

    pub fn importer(&self) -> &SqliteImporter {
        &self.importer
    }

    /// 上传文件内容并暂存
    ///
    /// # 返回
    /// - Ok(StageOutcome): importId、建议映射、统计、预览
    /// - Err(ApiError): EMPTY_FILE / CSV_PARSE_ERROR 等
    pub async fn stage(&self, request: StageRequest, content: &[u8]) -> ApiResult<StageOutcome> {
        if request.file_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件名不能为空".to_string()));
        }

        let mut meta = ImportMeta::new(request.file_name, request.role);
        meta.vendor_id = request.vendor_id;
        meta.user_id = request.user_id;

        Ok(self.importer.stage(content, meta).await?)
    }

    /// 从磁盘读取 CSV 并暂存（仅支持 .csv）
    pub async fn stage_csv_file(
        &self,
        file_path: &str,
        vendor_id: Option<&str>,
        user_id: Option<&str>,
        role: &str,
    ) -> ApiResult<StageOutcome> {
        let path = Path::new(file_path);
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(ApiError::InvalidInput(
                "当前仅支持 .csv 格式文件导入".to_string(),
            ));
        }

        let content = std::fs::read(path)
            .map_err(|e| ApiError::InvalidInput(format!("读取文件失败: {}: {}", file_path, e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_path)
            .to_string();

        info!(file_path, bytes = content.len(), "读取上传文件");
        let request = StageRequest {
            file_name,
            vendor_id: vendor_id.map(str::to_string),
            user_id: user_id.map(str::to_string),
            role: role.to_string(),
        };
        self.stage(request, &content).await
    }

    /// 提交新的列映射（值为 null 表示忽略该列）
    pub async fn remap(
        &self,
        import_id: &str,
        mappings: BTreeMap<String, Option<String>>,
    ) -> ApiResult<RemapOutcome> {
        let mapping: ColumnMapping = mappings.into_iter().collect();
        Ok(self.importer.remap(import_id, mapping).await?)
    }

    /// 编辑单行
    pub async fn update_row(
        &self,
        import_id: &str,
        row_index: usize,
        changes: BTreeMap<String, String>,
    ) -> ApiResult<RemapOutcome> {
        if changes.is_empty() {
            return Err(ApiError::InvalidInput("没有需要修改的字段".to_string()));
        }
        Ok(self.importer.update_row(import_id, row_index, changes).await?)
    }

    /// 分页读取暂存行
    ///
    /// # 参数
    /// - page: 页码（缺省 1）
    /// - limit: 每页行数（缺省 50，上限 500）
    /// - filter: all / valid / invalid（缺省 all）
    pub async fn get_rows(
        &self,
        import_id: &str,
        page: Option<usize>,
        limit: Option<usize>,
        filter: Option<&str>,
    ) -> ApiResult<RowsPage> {
        let filter = match filter {
            Some(f) => RowFilter::from_str(f).map_err(ApiError::InvalidInput)?,
            None => RowFilter::All,
        };
        Ok(self
            .importer
            .get_rows(
                import_id,
                page.unwrap_or(1),
                limit.unwrap_or(DEFAULT_PAGE_LIMIT),
                filter,
            )
            .await?)
    }

    pub async fn get_status(&self, import_id: &str) -> ApiResult<ImportStatusReport> {
        Ok(self.importer.get_status(import_id).await?)
    }

    /// 对账提交
    pub async fn commit(&self, import_id: &str, request: CommitRequest) -> ApiResult<CommitResult> {
        let options = request.into_options()?;
        Ok(self.importer.commit(import_id, options).await?)
    }

    /// 下载错误报告
    pub async fn error_report(&self, import_id: &str) -> ApiResult<ErrorReportResponse> {
        let content = self.importer.error_report(import_id).await?;
        Ok(ErrorReportResponse {
            import_id: import_id.to_string(),
            file_name: format!("import-errors-{}.csv", import_id),
            content,
        })
    }

    pub async fn discard(&self, import_id: &str) -> ApiResult<()> {
        Ok(self.importer.discard(import_id).await?)
    }

    pub fn target_fields(&self) -> &'static [TargetFieldSpec] {
        self.importer.target_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_request_parsing() {
        let request: CommitRequest =
            serde_json::from_str(r#"{"mode":"upsert","matchStrategy":"sku","vendorId":"v1"}"#)
                .unwrap();
        let options = request.into_options().unwrap();
        assert_eq!(options.mode, CommitMode::Upsert);
        assert_eq!(options.match_strategy, MatchStrategy::Sku);
        assert_eq!(options.default_status, "draft");
        assert_eq!(options.vendor_id.as_deref(), Some("v1"));

        let bad = CommitRequest {
            mode: Some("merge".to_string()),
            ..CommitRequest::default()
        };
        let err: ApiError = bad.into_options().unwrap_err().into();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_api_stage_and_commit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("api.db");
        let api = ImportApi::new(db_path.to_str().unwrap()).unwrap();

        let request = StageRequest {
            file_name: "books.csv".to_string(),
            vendor_id: Some("v1".to_string()),
            ..StageRequest::default()
        };
        let staged = api
            .stage(request, b"Title,Price\nDune,9.99\n,1\n")
            .await
            .unwrap();
        assert_eq!(staged.stats.valid_rows, 1);

        let rows = api
            .get_rows(&staged.import_id, None, None, Some("invalid"))
            .await
            .unwrap();
        assert_eq!(rows.rows.len(), 1);

        let result = api
            .commit(&staged.import_id, CommitRequest::default())
            .await
            .unwrap();
        assert_eq!(result.created_count, 1);
        assert_eq!(result.meta.vendor_id.as_deref(), Some("v1"));

        let err = api
            .commit(&staged.import_id, CommitRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_COMMITTED");

        let err = api.get_rows("missing", None, None, None).await.unwrap_err();
        assert_eq!(err.error_code(), "SESSION_NOT_FOUND");
    }
}
