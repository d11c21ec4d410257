// ==========================================
// 多商户目录导入引擎 - 导入操作返回结构
// ==========================================
// 职责: 解析结果 / 暂存概要 / 重映射概要 / 分页行 / 状态查询
// ==========================================

use crate::domain::commit::CommitResult;
use crate::domain::staging::{
    ColumnMapping, ImportMeta, ImportStats, NormalizedRow, RawRow, RowValidationErrors,
};
use crate::domain::target_schema::TargetFieldSpec;
use crate::domain::types::SessionStatus;
use serde::Serialize;

/// 文件解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// 文件中非空数据行总数（不受截断影响）
    pub total_parsed: usize,
}

// ==========================================
// StageOutcome - 上传暂存结果
// ==========================================
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutcome {
    pub import_id: String,
    pub csv_headers: Vec<String>,
    pub suggested_mappings: ColumnMapping,
    pub stats: ImportStats,
    pub validation_errors: Vec<RowValidationErrors>,
    pub preview_rows: Vec<NormalizedRow>,
    pub target_fields: &'static [TargetFieldSpec],
}

/// 重映射/行编辑结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemapOutcome {
    pub import_id: String,
    pub stats: ImportStats,
    pub validation_errors: Vec<RowValidationErrors>,
    pub preview_rows: Vec<NormalizedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

/// 暂存行分页
#[derive(Debug, Clone, Serialize)]
pub struct RowsPage {
    pub rows: Vec<NormalizedRow>,
    pub pagination: Pagination,
}

// ==========================================
// ImportStatusReport - 状态查询结果
// ==========================================
// 结果优先：提交结果比暂存会话存活更久
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ImportStatusReport {
    Completed(CommitResult),
    Staged(SessionSummary),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub import_id: String,
    pub status: SessionStatus,
    pub stats: ImportStats,
    pub meta: ImportMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_total_pages() {
        assert_eq!(Pagination::new(1, 50, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 50, 50).total_pages, 1);
        assert_eq!(Pagination::new(2, 50, 51).total_pages, 2);
    }
}
