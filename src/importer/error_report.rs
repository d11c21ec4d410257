// ==========================================
// 多商户目录导入引擎 - 错误报告生成
// ==========================================
// 职责: 仅导出无效行的原始值 + errors 列（"字段: 消息" 以分号连接）
// 转义: 含逗号/引号/换行的字段加引号，内部引号加倍（标准 CSV）
// ==========================================

use crate::domain::staging::{FieldError, StagingSession};
use crate::importer::error::{ImportError, ImportResult};
use csv::{Terminator, WriterBuilder};

pub const ERRORS_COLUMN: &str = "errors";

/// 错误摘要: "title: 标题不能为空; price: 价格不能为负数"
pub fn summarize_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 生成错误报告 CSV 文本
pub fn build_error_report(session: &StagingSession) -> ImportResult<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header: Vec<&str> = session.csv_headers.iter().map(String::as_str).collect();
    header.push(ERRORS_COLUMN);
    writer.write_record(&header)?;

    for row in session.normalized_rows.iter().filter(|r| !r.is_valid()) {
        let raw = session.raw_row(row.row_index);
        let mut record: Vec<&str> = session
            .csv_headers
            .iter()
            .map(|h| raw.and_then(|r| r.get(h)).unwrap_or_default())
            .collect();
        let summary = summarize_errors(&row.errors);
        record.push(&summary);
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::InternalError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ImportError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::staging::{
        ColumnMapping, ImportMeta, ImportStats, NormalizedRow, RawRow,
    };
    use crate::domain::types::SessionStatus;
    use std::collections::BTreeMap;

    fn session_with(rows: Vec<(RawRow, Vec<FieldError>)>) -> StagingSession {
        let normalized_rows = rows
            .iter()
            .map(|(raw, errors)| {
                let mut row = NormalizedRow::new(raw.row_index);
                row.errors = errors.clone();
                row
            })
            .collect();
        let mut session = StagingSession {
            import_id: "imp-1".to_string(),
            csv_headers: vec!["title".to_string(), "price".to_string()],
            suggested_mappings: ColumnMapping::new(),
            current_mappings: ColumnMapping::new(),
            raw_rows: rows.into_iter().map(|(raw, _)| raw).collect(),
            normalized_rows,
            validation_errors: Vec::new(),
            stats: ImportStats::default(),
            meta: ImportMeta::new("books.csv", "vendor"),
            status: SessionStatus::Staged,
        };
        session.refresh_validation_summary();
        session
    }

    fn raw(index: usize, title: &str, price: &str) -> RawRow {
        let mut cells = BTreeMap::new();
        cells.insert("title".to_string(), title.to_string());
        cells.insert("price".to_string(), price.to_string());
        RawRow {
            row_index: index,
            cells,
        }
    }

    #[test]
    fn test_report_contains_only_invalid_rows_with_quoting() {
        let session = session_with(vec![
            (raw(1, "Good Book", "10"), vec![]),
            (
                raw(2, "Hello, \"World\"", "-1"),
                vec![
                    FieldError::new("price", "价格不能为负数"),
                    FieldError::new("publicationYear", "出版年份超出范围"),
                ],
            ),
        ]);

        let report = build_error_report(&session).unwrap();
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "title,price,errors");
        assert_eq!(
            lines[1],
            "\"Hello, \"\"World\"\"\",-1,price: 价格不能为负数; publicationYear: 出版年份超出范围"
        );
    }

    #[test]
    fn test_report_header_only_when_all_valid() {
        let session = session_with(vec![(raw(1, "A", "1"), vec![])]);
        let report = build_error_report(&session).unwrap();
        assert_eq!(report, "title,price,errors\n");
    }
}
