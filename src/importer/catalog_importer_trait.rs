// ==========================================
// 多商户目录导入引擎 - 导入 Trait
// ==========================================
// 职责: 定义暂存导入主接口与各管道阶段接口（不包含实现）
// 管道: 文件解析 → 列映射 → 标准化 → 校验 → 暂存 → 对账提交
// ==========================================

use crate::domain::commit::{CommitOptions, CommitResult};
use crate::domain::outcome::{
    ImportStatusReport, ParsedFile, RemapOutcome, RowsPage, StageOutcome,
};
use crate::domain::staging::{ColumnMapping, ImportMeta, NormalizedRow, RawRow};
use crate::domain::target_schema::TargetFieldSpec;
use crate::domain::types::{FieldValue, RowFilter};
use crate::importer::error::ImportResult;
use crate::importer::row_validator::ValidationOutcome;
use async_trait::async_trait;
use std::collections::BTreeMap;

// ==========================================
// CatalogImporter Trait
// ==========================================
// 用途: 暂存式目录导入主接口
// 实现者: CatalogImporterImpl
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// 解析上传文件并创建暂存会话
    ///
    /// # 参数
    /// - content: 文件原始字节（可带 UTF-8 BOM）
    /// - meta: 上传元信息（文件名/商户/用户/角色）
    ///
    /// # 返回
    /// - Ok(StageOutcome): 会话 ID、建议映射、统计、预览行
    /// - Err(EmptyFile): 无表头或无数据行
    async fn stage(&self, content: &[u8], meta: ImportMeta) -> ImportResult<StageOutcome>;

    /// 以新的列映射重新标准化并校验（不重新解析文件）
    async fn remap(&self, import_id: &str, mapping: ColumnMapping)
        -> ImportResult<RemapOutcome>;

    /// 编辑单行：按目标字段键写入新的原始值，重新标准化并校验该行
    ///
    /// # 返回
    /// - Err(InvalidMapping): 未知字段，或字段未映射到源列
    /// - Err(RowNotFound): 行号不存在
    async fn update_row(
        &self,
        import_id: &str,
        row_index: usize,
        changes: BTreeMap<String, String>,
    ) -> ImportResult<RemapOutcome>;

    /// 分页读取暂存行（page 从 1 开始）
    async fn get_rows(
        &self,
        import_id: &str,
        page: usize,
        limit: usize,
        filter: RowFilter,
    ) -> ImportResult<RowsPage>;

    /// 查询导入状态：提交结果优先，其次暂存会话
    async fn get_status(&self, import_id: &str) -> ImportResult<ImportStatusReport>;

    /// 对账提交
    ///
    /// # 返回
    /// - Ok(CommitResult): 即使全部行失败也返回计数结果
    /// - Err(SessionNotFound / AlreadyCommitted): 会话不可用
    async fn commit(&self, import_id: &str, options: CommitOptions)
        -> ImportResult<CommitResult>;

    /// 生成仅含无效行的 CSV 错误报告
    async fn error_report(&self, import_id: &str) -> ImportResult<String>;

    /// 丢弃暂存会话
    async fn discard(&self, import_id: &str) -> ImportResult<()>;

    /// 目标字段注册表
    fn target_fields(&self) -> &'static [TargetFieldSpec];
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件内容为原始行
    ///
    /// # 参数
    /// - content: 文件字节
    /// - max_rows: 暂存行数上限（超出部分只计数不保留）
    fn parse(&self, content: &[u8], max_rows: usize) -> ImportResult<ParsedFile>;
}

// ==========================================
// ColumnMapper Trait
// ==========================================
// 用途: 源列 → 目标字段 自动映射（阶段 1）
// 实现者: AliasColumnMapper
pub trait ColumnMapper: Send + Sync {
    /// 为源列提出映射建议；空列表得到空映射，永不失败
    fn propose_mappings(&self, source_columns: &[String]) -> ColumnMapping;
}

// ==========================================
// RowNormalizer Trait
// ==========================================
// 用途: 按映射做类型转换（阶段 2）
// 实现者: RowNormalizerImpl
pub trait RowNormalizer: Send + Sync {
    /// 按映射标准化全部原始行（_rowIndex 沿用原始行）
    fn apply_mappings(&self, raw_rows: &[RawRow], mapping: &ColumnMapping) -> Vec<NormalizedRow>;

    /// 单字段标准化
    fn normalize_value(&self, spec: &TargetFieldSpec, raw: &str) -> FieldValue;
}

// ==========================================
// RowValidator Trait
// ==========================================
// 用途: 行级业务校验（阶段 3）
// 实现者: RowValidatorImpl
pub trait RowValidator: Send + Sync {
    /// 校验单行，错误累积写入 row.errors（先清空旧错误）
    fn validate_row(&self, row: &mut NormalizedRow);

    /// 校验全部行并划分有效/无效
    fn validate_rows(&self, rows: Vec<NormalizedRow>) -> ValidationOutcome;
}
