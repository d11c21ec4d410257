// ==========================================
// 多商户目录导入引擎 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 约束: 宽松解析（列数不一致时补空/截断），跳过空白行，单元格 TRIM
// 约束: _rowIndex 按非空数据行从 1 连续编号
// ==========================================

use crate::domain::outcome::ParsedFile;
use crate::domain::staging::RawRow;
use crate::importer::catalog_importer_trait::FileParser;
use crate::importer::error::{ImportError, ImportResult};
use csv::{ByteRecord, ReaderBuilder};
use std::collections::BTreeMap;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    fn decode_cells(record: &ByteRecord) -> Vec<String> {
        record
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).trim().to_string())
            .collect()
    }
}

impl FileParser for CsvParser {
    fn parse(&self, content: &[u8], max_rows: usize) -> ImportResult<ParsedFile> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(content);

        let mut records = reader.byte_records();

        // 读取表头（第一条记录）
        let headers: Vec<String> = match records.next() {
            Some(first) => Self::decode_cells(&first?),
            None => Vec::new(),
        };
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyFile("文件缺少表头".to_string()));
        }

        let mut rows = Vec::new();
        let mut total_parsed = 0usize;

        for result in records {
            let cells = Self::decode_cells(&result?);

            // 跳过完全空白的行
            if cells.iter().all(|v| v.is_empty()) {
                continue;
            }

            total_parsed += 1;
            if rows.len() >= max_rows {
                continue;
            }

            let mut row_map = BTreeMap::new();
            for (col_idx, header) in headers.iter().enumerate() {
                let value = cells.get(col_idx).cloned().unwrap_or_default();
                // 重复表头保留第一列
                row_map.entry(header.clone()).or_insert(value);
            }

            rows.push(RawRow {
                row_index: total_parsed,
                cells: row_map,
            });
        }

        if rows.is_empty() {
            return Err(ImportError::EmptyFile("文件没有数据行".to_string()));
        }

        debug!(
            headers = headers.len(),
            rows = rows.len(),
            total_parsed,
            "CSV 解析完成"
        );

        Ok(ParsedFile {
            headers,
            rows,
            total_parsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_parser_valid_content() {
        let parsed = CsvParser
            .parse(b"title,author,price\nMoby Dick,Melville,19.99\n1984,Orwell,14.99", 5000)
            .unwrap();

        assert_eq!(parsed.headers, vec!["title", "author", "price"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.total_parsed, 2);
        assert_eq!(parsed.rows[0].row_index, 1);
        assert_eq!(parsed.rows[1].get("author"), Some("Orwell"));
    }

    #[test]
    fn test_csv_parser_strips_bom_and_trims() {
        let mut content = UTF8_BOM.to_vec();
        content.extend_from_slice(b" Title , Price \n  Dune  , 9.5 \n");

        let parsed = CsvParser.parse(&content, 5000).unwrap();
        assert_eq!(parsed.headers, vec!["Title", "Price"]);
        assert_eq!(parsed.rows[0].get("Title"), Some("Dune"));
        assert_eq!(parsed.rows[0].get("Price"), Some("9.5"));
    }

    #[test]
    fn test_csv_parser_ragged_rows() {
        let parsed = CsvParser
            .parse(b"a,b,c\n1\n1,2,3,4\n", 5000)
            .unwrap();

        assert_eq!(parsed.rows.len(), 2);
        // 缺失列补空
        assert_eq!(parsed.rows[0].get("b"), Some(""));
        assert_eq!(parsed.rows[0].get("c"), Some(""));
        // 多余列截断
        assert_eq!(parsed.rows[1].cells.len(), 3);
        assert_eq!(parsed.rows[1].get("c"), Some("3"));
    }

    #[test]
    fn test_csv_parser_skips_blank_rows_and_keeps_dense_index() {
        let parsed = CsvParser
            .parse(b"title,price\nA,1\n\n , \nB,2\n", 5000)
            .unwrap();

        assert_eq!(parsed.total_parsed, 2);
        let indexes: Vec<usize> = parsed.rows.iter().map(|r| r.row_index).collect();
        assert_eq!(indexes, vec![1, 2]);
    }

    #[test]
    fn test_csv_parser_truncates_at_max_rows() {
        let mut content = String::from("title,price\n");
        for i in 0..10 {
            content.push_str(&format!("Book {},{}\n", i, i));
        }

        let parsed = CsvParser.parse(content.as_bytes(), 4).unwrap();
        assert_eq!(parsed.rows.len(), 4);
        assert_eq!(parsed.total_parsed, 10);
    }

    #[test]
    fn test_csv_parser_quoted_fields() {
        let parsed = CsvParser
            .parse(b"title,price\n\"Hello, World\",5\n", 5000)
            .unwrap();
        assert_eq!(parsed.rows[0].get("title"), Some("Hello, World"));
    }

    #[test]
    fn test_csv_parser_empty_file() {
        let result = CsvParser.parse(b"", 5000);
        assert!(matches!(result, Err(ImportError::EmptyFile(_))));

        let result = CsvParser.parse(b"title,price\n", 5000);
        assert!(matches!(result, Err(ImportError::EmptyFile(_))));
    }
}
