// ==========================================
// 多商户目录导入引擎 - 导入层
// ==========================================
// 职责: 上传文件 → 暂存会话 → 对账提交
// 支持: CSV（UTF-8，可带 BOM）
// ==========================================

// 模块声明
pub mod catalog_importer_impl;
pub mod catalog_importer_trait;
pub mod column_mapper;
pub mod error;
pub mod error_report;
pub mod file_parser;
pub mod reconciler;
pub mod row_normalizer;
pub mod row_validator;

// 重导出核心类型
pub use catalog_importer_impl::CatalogImporterImpl;
pub use column_mapper::AliasColumnMapper;
pub use error::{ImportError, ImportResult};
pub use error_report::build_error_report;
pub use file_parser::CsvParser;
pub use reconciler::Reconciler;
pub use row_normalizer::RowNormalizerImpl;
pub use row_validator::{RowValidatorImpl, ValidationOutcome};

// 重导出 Trait 接口
pub use catalog_importer_trait::{
    CatalogImporter, ColumnMapper, FileParser, RowNormalizer, RowValidator,
};
