// ==========================================
// 多商户目录导入引擎 - 暂存导入器实现
// ==========================================
// 职责: 整合导入流程，从上传文件到目录落库
// 流程: 解析 → 映射 → 标准化 → 校验 → 暂存 →（重映射/行编辑）→ 对账提交
// 约束: 提交前通过存储层条件更新抢占会话，同一会话只提交一次
// 约束: 批次按 _rowIndex 升序顺序执行，每批一个事务
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::commit::{
    CommitFailure, CommitOptions, CommitResult, CommitResultMeta, CommitTally,
    COMMIT_STATUS_COMPLETED,
};
use crate::domain::outcome::{
    ImportStatusReport, Pagination, RemapOutcome, RowsPage, SessionSummary, StageOutcome,
};
use crate::domain::staging::{ColumnMapping, ImportMeta, ImportStats, NormalizedRow, StagingSession};
use crate::domain::target_schema::{keys, TargetFieldSpec, TargetSchema};
use crate::domain::types::{FieldValue, RowFilter, SessionStatus};
use crate::importer::catalog_importer_trait::{
    CatalogImporter, ColumnMapper, FileParser, RowNormalizer, RowValidator,
};
use crate::importer::column_mapper::AliasColumnMapper;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::error_report::build_error_report;
use crate::importer::file_parser::CsvParser;
use crate::importer::reconciler::{row_title, Reconciler};
use crate::importer::row_normalizer::RowNormalizerImpl;
use crate::importer::row_validator::RowValidatorImpl;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::staging_store::StagingStore;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 分页每页最大行数
pub const MAX_PAGE_LIMIT: usize = 500;

// ==========================================
// CatalogImporterImpl - 暂存导入器实现
// ==========================================
pub struct CatalogImporterImpl<S, R, C>
where
    S: StagingStore,
    R: CatalogRepository,
    C: ImportConfigReader,
{
    // 暂存会话存储
    store: S,

    // 目录仓储
    catalog: R,

    // 配置读取器
    config: C,

    // 导入组件
    schema: TargetSchema,
    file_parser: Box<dyn FileParser>,
    column_mapper: Box<dyn ColumnMapper>,
    row_normalizer: Box<dyn RowNormalizer>,
    row_validator: Box<dyn RowValidator>,
}

impl<S, R, C> CatalogImporterImpl<S, R, C>
where
    S: StagingStore,
    R: CatalogRepository,
    C: ImportConfigReader,
{
    /// 创建新的导入器实例
    ///
    /// # 参数
    /// - store: 暂存会话存储
    /// - catalog: 目录仓储
    /// - config: 配置读取器
    /// - file_parser / column_mapper / row_normalizer / row_validator: 管道组件
    pub fn new(
        store: S,
        catalog: R,
        config: C,
        file_parser: Box<dyn FileParser>,
        column_mapper: Box<dyn ColumnMapper>,
        row_normalizer: Box<dyn RowNormalizer>,
        row_validator: Box<dyn RowValidator>,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
            schema: TargetSchema,
            file_parser,
            column_mapper,
            row_normalizer,
            row_validator,
        }
    }

    /// 使用默认管道组件创建
    pub fn with_default_components(store: S, catalog: R, config: C) -> Self {
        Self::new(
            store,
            catalog,
            config,
            Box::new(CsvParser),
            Box::new(AliasColumnMapper::new()),
            Box::new(RowNormalizerImpl::new()),
            Box::new(RowValidatorImpl::new()),
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &R {
        &self.catalog
    }

    // ===== 配置读取（错误统一转为 ConfigError）=====

    async fn staging_ttl(&self) -> ImportResult<Duration> {
        let secs = self
            .config
            .get_staging_ttl_secs()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))?;
        Ok(Duration::seconds(secs))
    }

    async fn preview_limit(&self) -> ImportResult<usize> {
        self.config
            .get_preview_limit()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))
    }

    /// 清理过期会话与超过保留期的提交结果（失败只记日志）
    async fn housekeeping(&self) {
        match self.store.purge_expired().await {
            Ok(purged) if purged > 0 => debug!(purged, "已清理过期暂存会话"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "清理过期暂存会话失败"),
        }

        let retention_days = match self.config.get_result_retention_days().await {
            Ok(days) => days,
            Err(e) => {
                warn!(error = %e, "读取结果保留期失败，跳过结果清理");
                return;
            }
        };
        match self
            .store
            .purge_expired_results(Duration::days(retention_days))
            .await
        {
            Ok(purged) if purged > 0 => debug!(purged, "已清理过期提交结果"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "清理提交结果失败"),
        }
    }

    /// 读取未过期会话，缺失统一报 SessionNotFound
    async fn load_session(&self, import_id: &str) -> ImportResult<StagingSession> {
        self.store
            .get(import_id)
            .await?
            .ok_or_else(|| ImportError::SessionNotFound(import_id.to_string()))
    }

    /// 读取可编辑会话（已提交的会话拒绝修改）
    async fn load_editable_session(&self, import_id: &str) -> ImportResult<StagingSession> {
        let session = self.load_session(import_id).await?;
        if session.is_committed() {
            return Err(ImportError::AlreadyCommitted(import_id.to_string()));
        }
        Ok(session)
    }

    /// 写回会话并刷新 TTL；期间过期则报 SessionNotFound
    async fn save_session(&self, session: &StagingSession) -> ImportResult<()> {
        let ttl = self.staging_ttl().await?;
        if !self.store.put(session, ttl).await? {
            return Err(ImportError::SessionNotFound(session.import_id.clone()));
        }
        Ok(())
    }

    async fn remap_outcome(&self, session: &StagingSession) -> ImportResult<RemapOutcome> {
        let preview_limit = self.preview_limit().await?;
        Ok(RemapOutcome {
            import_id: session.import_id.clone(),
            stats: session.stats.clone(),
            validation_errors: session.validation_errors.clone(),
            preview_rows: preview(&session.normalized_rows, preview_limit),
        })
    }

    /// 校验用户提交的映射
    ///
    /// # 规则
    /// - 源列必须是文件表头之一
    /// - 目标字段必须在注册表中
    /// - 同一目标字段只能被一个源列占用
    fn check_mapping(&self, session: &StagingSession, mapping: &ColumnMapping) -> ImportResult<()> {
        for column in mapping.source_columns() {
            if !session.csv_headers.iter().any(|h| h == column) {
                return Err(ImportError::InvalidMapping(format!("未知源列: {}", column)));
            }
        }
        for (column, target) in mapping.mapped() {
            if !self.schema.is_known(target) {
                return Err(ImportError::InvalidMapping(format!(
                    "源列 {} 映射到未知字段: {}",
                    column, target
                )));
            }
        }
        if let Some(target) = mapping.first_duplicate_target() {
            return Err(ImportError::InvalidMapping(format!(
                "目标字段被多个源列映射: {}",
                target
            )));
        }
        Ok(())
    }

    /// 抢占失败: 会话已过期返回 SessionNotFound，否则视为已被提交
    async fn claim_failure(&self, import_id: &str) -> ImportError {
        match self.store.get(import_id).await {
            Ok(None) => ImportError::SessionNotFound(import_id.to_string()),
            Ok(Some(_)) => {
                warn!(import_id, "会话已被其他提交抢占");
                ImportError::AlreadyCommitted(import_id.to_string())
            }
            Err(e) => e.into(),
        }
    }

    /// 未映射状态列时的默认状态（经状态标准化）
    fn status_override(&self, session: &StagingSession, options: &CommitOptions) -> Option<String> {
        if session.current_mappings.is_mapped(keys::STATUS) {
            return None;
        }
        let spec = self.schema.field(keys::STATUS)?;
        match self.row_normalizer.normalize_value(spec, &options.default_status) {
            FieldValue::Text(status) => Some(status),
            _ => None,
        }
    }
}

/// 前 N 行预览
fn preview(rows: &[NormalizedRow], limit: usize) -> Vec<NormalizedRow> {
    rows.iter().take(limit).cloned().collect()
}

#[async_trait]
impl<S, R, C> CatalogImporter for CatalogImporterImpl<S, R, C>
where
    S: StagingStore,
    R: CatalogRepository,
    C: ImportConfigReader,
{
    #[instrument(skip(self, content, meta), fields(file_name = %meta.file_name))]
    async fn stage(&self, content: &[u8], meta: ImportMeta) -> ImportResult<StageOutcome> {
        let import_id = Uuid::new_v4().to_string();
        info!(import_id = %import_id, bytes = content.len(), "开始暂存导入文件");

        self.housekeeping().await;

        let max_rows = self
            .config
            .get_max_rows()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))?;
        let ttl = self.staging_ttl().await?;
        let preview_limit = self.preview_limit().await?;

        // === 阶段 0: 解析 ===
        let parsed = match self.file_parser.parse(content, max_rows) {
            Ok(p) => p,
            Err(e) => {
                error!(import_id = %import_id, error = %e, "文件解析失败");
                return Err(e);
            }
        };
        info!(
            headers = parsed.headers.len(),
            rows = parsed.rows.len(),
            total_parsed = parsed.total_parsed,
            "文件解析完成"
        );

        // === 阶段 1: 列映射 ===
        let suggested = self.column_mapper.propose_mappings(&parsed.headers);
        info!(mapped = suggested.mapped().count(), columns = parsed.headers.len(), "列映射建议完成");

        // === 阶段 2-3: 标准化 + 校验 ===
        let normalized = self.row_normalizer.apply_mappings(&parsed.rows, &suggested);
        let outcome = self.row_validator.validate_rows(normalized);

        let mut session = StagingSession {
            import_id: import_id.clone(),
            csv_headers: parsed.headers,
            suggested_mappings: suggested.clone(),
            current_mappings: suggested,
            stats: ImportStats {
                total_rows: parsed.rows.len(),
                total_parsed: parsed.total_parsed,
                truncated: parsed.total_parsed > max_rows,
                ..ImportStats::default()
            },
            raw_rows: parsed.rows,
            normalized_rows: outcome.rows,
            validation_errors: Vec::new(),
            meta,
            status: SessionStatus::Staged,
        };
        session.refresh_validation_summary();

        if session.stats.truncated {
            warn!(
                import_id = %import_id,
                total_parsed = session.stats.total_parsed,
                max_rows,
                "文件行数超过上限，已截断"
            );
        }

        // === 阶段 4: 暂存 ===
        self.store.create(&session, ttl).await?;

        info!(
            import_id = %import_id,
            valid_rows = session.stats.valid_rows,
            invalid_rows = session.stats.invalid_rows,
            "暂存会话已创建"
        );

        Ok(StageOutcome {
            import_id,
            csv_headers: session.csv_headers.clone(),
            suggested_mappings: session.suggested_mappings.clone(),
            stats: session.stats.clone(),
            validation_errors: session.validation_errors.clone(),
            preview_rows: preview(&session.normalized_rows, preview_limit),
            target_fields: self.schema.list_fields(),
        })
    }

    #[instrument(skip(self, mapping))]
    async fn remap(&self, import_id: &str, mapping: ColumnMapping) -> ImportResult<RemapOutcome> {
        let mut session = self.load_editable_session(import_id).await?;
        self.check_mapping(&session, &mapping)?;

        // 未出现在新映射中的表头视为忽略
        let mut mapping = mapping;
        for header in &session.csv_headers {
            if !mapping.source_columns().any(|c| c == header) {
                mapping.insert(header.clone(), None);
            }
        }

        let normalized = self.row_normalizer.apply_mappings(&session.raw_rows, &mapping);
        let outcome = self.row_validator.validate_rows(normalized);

        session.normalized_rows = outcome.rows;
        session.current_mappings = mapping;
        session.refresh_validation_summary();
        self.save_session(&session).await?;

        info!(
            import_id,
            valid_rows = session.stats.valid_rows,
            invalid_rows = session.stats.invalid_rows,
            "重映射完成"
        );
        self.remap_outcome(&session).await
    }

    #[instrument(skip(self, changes))]
    async fn update_row(
        &self,
        import_id: &str,
        row_index: usize,
        changes: BTreeMap<String, String>,
    ) -> ImportResult<RemapOutcome> {
        let mut session = self.load_editable_session(import_id).await?;

        // 只允许编辑已映射字段: 编辑值写回源列，提交与重映射才能保留
        let mut edits: Vec<(&'static TargetFieldSpec, String, String)> =
            Vec::with_capacity(changes.len());
        for (key, value) in changes {
            let spec = self
                .schema
                .field(&key)
                .ok_or_else(|| ImportError::InvalidMapping(format!("未知字段: {}", key)))?;
            let column = session
                .current_mappings
                .source_of(spec.key)
                .ok_or_else(|| ImportError::InvalidMapping(format!("字段未映射到任何源列: {}", key)))?
                .to_string();
            edits.push((spec, column, value));
        }

        let row_not_found = || ImportError::RowNotFound {
            import_id: import_id.to_string(),
            row_index,
        };
        if session.raw_row(row_index).is_none() {
            return Err(row_not_found());
        }

        // 原始值写回映射源列
        if let Some(raw) = session.raw_row_mut(row_index) {
            for (_, column, value) in &edits {
                raw.cells.insert(column.clone(), value.clone());
            }
        }

        let row = session.normalized_row_mut(row_index).ok_or_else(row_not_found)?;
        for (spec, _, value) in &edits {
            let normalized = self.row_normalizer.normalize_value(spec, value);
            row.values.insert(spec.key.to_string(), normalized);
        }
        self.row_validator.validate_row(row);
        let valid = row.is_valid();

        session.refresh_validation_summary();
        self.save_session(&session).await?;

        info!(import_id, row_index, fields = edits.len(), valid, "暂存行已编辑");
        self.remap_outcome(&session).await
    }

    async fn get_rows(
        &self,
        import_id: &str,
        page: usize,
        limit: usize,
        filter: RowFilter,
    ) -> ImportResult<RowsPage> {
        let session = self.load_session(import_id).await?;

        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let filtered: Vec<&NormalizedRow> = session
            .normalized_rows
            .iter()
            .filter(|r| match filter {
                RowFilter::All => true,
                RowFilter::Valid => r.is_valid(),
                RowFilter::Invalid => !r.is_valid(),
            })
            .collect();

        let total = filtered.len();
        let rows = filtered
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .cloned()
            .collect();

        Ok(RowsPage {
            rows,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn get_status(&self, import_id: &str) -> ImportResult<ImportStatusReport> {
        if let Some(result) = self.store.get_result(import_id).await? {
            return Ok(ImportStatusReport::Completed(result));
        }

        let session = self.load_session(import_id).await?;
        Ok(ImportStatusReport::Staged(SessionSummary {
            import_id: session.import_id,
            status: session.status,
            stats: session.stats,
            meta: session.meta,
        }))
    }

    #[instrument(skip(self, options), fields(mode = %options.mode, strategy = %options.match_strategy))]
    async fn commit(&self, import_id: &str, options: CommitOptions) -> ImportResult<CommitResult> {
        let started = Instant::now();

        let mut session = self.load_session(import_id).await?;
        if session.is_committed() {
            return Err(ImportError::AlreadyCommitted(import_id.to_string()));
        }

        let batch_size = self
            .config
            .get_commit_batch_size()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))?
            .max(1);
        let ttl = self.staging_ttl().await?;

        // 条件更新抢占提交权（并发提交只有一个成功）
        if !self.store.claim_for_commit(import_id).await? {
            return Err(self.claim_failure(import_id).await);
        }

        let mut rows: Vec<NormalizedRow> = session
            .normalized_rows
            .iter()
            .filter(|r| r.is_valid())
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.row_index);

        let vendor_id = options.vendor_id.clone().or_else(|| session.meta.vendor_id.clone());
        let user_id = options.user_id.clone().or_else(|| session.meta.user_id.clone());

        let reconciler = Reconciler {
            import_id: import_id.to_string(),
            mode: options.mode,
            strategy: options.match_strategy,
            vendor_id: vendor_id.clone(),
            user_id: user_id.clone(),
            status_override: self.status_override(&session, &options),
            mapped_fields: session
                .current_mappings
                .mapped()
                .map(|(_, target)| target.to_string())
                .collect::<HashSet<_>>(),
        };

        info!(
            import_id,
            eligible_rows = rows.len(),
            skipped_invalid = session.stats.invalid_rows,
            batch_size,
            "开始对账提交"
        );

        let mut total = CommitTally::default();
        for (batch_no, chunk) in rows.chunks(batch_size).enumerate() {
            let reconciler = &reconciler;
            match self
                .catalog
                .run_in_transaction(move |tx| reconciler.apply_batch(tx, chunk))
                .await
            {
                Ok(tally) => {
                    debug!(
                        batch = batch_no + 1,
                        rows = chunk.len(),
                        failed = tally.failures.len(),
                        "批次提交完成"
                    );
                    total.absorb(tally);
                }
                Err(e) => {
                    error!(
                        import_id,
                        batch = batch_no + 1,
                        rows = chunk.len(),
                        error = %e,
                        "批次事务失败，整批回滚"
                    );
                    let message = format!("批次 {} 事务失败: {}", batch_no + 1, e);
                    total.failures.extend(
                        chunk
                            .iter()
                            .map(|row| CommitFailure::batch(row.row_index, row_title(row), message.clone())),
                    );
                }
            }
        }

        let total_processed = total.processed();
        let result = CommitResult {
            import_id: import_id.to_string(),
            status: COMMIT_STATUS_COMPLETED.to_string(),
            created_count: total.created_ids.len(),
            updated_count: total.updated_count,
            skipped_count: total.skipped_count,
            failed_count: total.failures.len(),
            total_processed,
            failures: total.failures,
            created_ids: total.created_ids,
            completed_at: Utc::now(),
            meta: CommitResultMeta {
                file_name: session.meta.file_name.clone(),
                vendor_id,
                user_id,
                mode: options.mode,
                match_strategy: options.match_strategy,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        };

        // 会话已被抢占为 committed，结果写入失败只能记录后返回错误
        if let Err(e) = self.store.put_result(&result).await {
            error!(
                import_id,
                created = result.created_count,
                updated = result.updated_count,
                failed = result.failed_count,
                error = %e,
                "提交结果保存失败"
            );
            return Err(e.into());
        }

        session.status = SessionStatus::Committed;
        if !self.store.put(&session, ttl).await? {
            warn!(import_id, "提交期间暂存会话已过期，结果已单独保存");
        }

        info!(
            import_id,
            created = result.created_count,
            updated = result.updated_count,
            skipped = result.skipped_count,
            failed = result.failed_count,
            elapsed_ms = result.meta.elapsed_ms,
            "对账提交完成"
        );
        Ok(result)
    }

    async fn error_report(&self, import_id: &str) -> ImportResult<String> {
        let session = self.load_session(import_id).await?;
        let report = build_error_report(&session)?;
        debug!(import_id, invalid_rows = session.stats.invalid_rows, "错误报告已生成");
        Ok(report)
    }

    async fn discard(&self, import_id: &str) -> ImportResult<()> {
        if !self.store.delete(import_id).await? {
            return Err(ImportError::SessionNotFound(import_id.to_string()));
        }
        info!(import_id, "暂存会话已丢弃");
        Ok(())
    }

    fn target_fields(&self) -> &'static [TargetFieldSpec] {
        self.schema.list_fields()
    }
}
