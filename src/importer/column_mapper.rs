// ==========================================
// 多商户目录导入引擎 - 列映射引擎
// ==========================================
// 阶段 1: 源列名 → 目标字段键
// 算法: 别名表匹配 + 子串打分，按源列顺序贪心认领（先到先得）
// 约束: 同一目标字段最多被一个源列占用
// 约束: 打分公式与阈值为兼容常量，不可随意调整
// ==========================================

use crate::domain::staging::ColumnMapping;
use crate::domain::target_schema::{keys, TargetSchema};
use crate::importer::catalog_importer_trait::ColumnMapper;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// 完全匹配得分
pub const EXACT_MATCH_SCORE: f64 = 100.0;
/// 子串匹配基础分
const SUBSTRING_BASE_SCORE: f64 = 50.0;
/// 子串匹配长度比例权重
const SUBSTRING_RATIO_WEIGHT: f64 = 30.0;
/// 子串匹配得分上限（严格低于完全匹配）
const SUBSTRING_MAX_SCORE: f64 = 99.0;
/// 映射最低得分
pub const MIN_MAPPING_SCORE: f64 = 40.0;

// ===== 别名表（已是标准化形式）=====
static FIELD_ALIASES: &[(&str, &[&str])] = &[
    (
        keys::TITLE,
        &["title", "book_title", "name", "product_name", "item_title", "listing_title", "post_title"],
    ),
    (keys::AUTHOR, &["author", "authors", "author_name", "writer", "creator"]),
    (
        keys::PRICE,
        &["price", "sale_price", "list_price", "selling_price", "cost", "amount", "regular_price", "price_usd"],
    ),
    (
        keys::QUANTITY,
        &["quantity", "qty", "stock", "inventory", "stock_quantity", "count", "copies"],
    ),
    (
        keys::SKU,
        &["sku", "book_id", "item_id", "product_id", "stock_number", "inventory_id", "internal_id", "item_number"],
    ),
    (keys::ISBN, &["isbn", "isbn13", "isbn_13", "isbn10", "isbn_10", "ean"]),
    (keys::PUBLISHER, &["publisher", "publishing_house", "imprint", "published_by"]),
    (
        keys::PUBLICATION_YEAR,
        &[
            "publication_year",
            "publicationyear",
            "year",
            "pub_year",
            "date_pub",
            "year_published",
            "published",
            "publication_date",
            "pub_date",
            "date_published",
        ],
    ),
    (keys::EDITION, &["edition", "printing", "edition_statement"]),
    (keys::CONDITION, &["condition", "book_condition", "grade", "item_condition"]),
    (keys::BINDING, &["binding", "format", "cover", "cover_type", "binding_type"]),
    (
        keys::DESCRIPTION,
        &["description", "desc", "notes", "comments", "details", "synopsis", "summary", "long_description"],
    ),
    (keys::CATEGORY, &["category", "categories", "genre", "subject", "section"]),
    (keys::IS_SIGNED, &["is_signed", "issigned", "signed", "autographed", "signature"]),
    (
        keys::IS_FIRST_EDITION,
        &["is_first_edition", "first_edition", "firstedition", "1st_edition"],
    ),
    (keys::STATUS, &["status", "listing_status", "state", "availability"]),
    (
        keys::IMAGES,
        &["images", "image", "image_url", "image_urls", "photos", "photo", "pictures", "image_links"],
    ),
    (keys::WP_POST_ID, &["wp_post_id", "post_id", "wordpress_id", "wp_id"]),
];

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-.]+").expect("valid regex"));

/// 列名标准化：TRIM + 小写 + 空白/连字符/句点连续段折叠为单个下划线
pub fn normalize_column_name(name: &str) -> String {
    SEPARATOR_RE
        .replace_all(name.trim().to_lowercase().as_str(), "_")
        .into_owned()
}

/// 单个别名的匹配得分（不匹配返回 None）
pub fn score_alias(column: &str, alias: &str) -> Option<f64> {
    if column.is_empty() || alias.is_empty() {
        return None;
    }
    if column == alias {
        return Some(EXACT_MATCH_SCORE);
    }
    if column.contains(alias) || alias.contains(column) {
        let ratio = alias.chars().count() as f64 / column.chars().count() as f64;
        return Some((SUBSTRING_BASE_SCORE + ratio * SUBSTRING_RATIO_WEIGHT).min(SUBSTRING_MAX_SCORE));
    }
    None
}

/// 单个源列的候选目标
#[derive(Debug, Clone, PartialEq)]
pub struct MappingCandidate {
    pub target: &'static str,
    /// 注册表顺序，同分时越小越优先
    pub priority: usize,
    pub score: f64,
}

// ==========================================
// AliasColumnMapper - 别名表映射器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct AliasColumnMapper {
    schema: TargetSchema,
}

impl AliasColumnMapper {
    pub fn new() -> Self {
        Self::default()
    }

    fn aliases_of(target: &str) -> &'static [&'static str] {
        FIELD_ALIASES
            .iter()
            .find(|(key, _)| *key == target)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }

    /// 计算标准化列名在未被认领字段上的候选列表
    ///
    /// # 返回
    /// - 按 (得分降序, 优先级升序) 排序；命中完全匹配时只返回该候选
    pub fn candidates(
        &self,
        normalized_column: &str,
        claimed: &HashSet<&'static str>,
    ) -> Vec<MappingCandidate> {
        let mut candidates = Vec::new();

        for (priority, spec) in self.schema.list_fields().iter().enumerate() {
            if claimed.contains(spec.key) {
                continue;
            }

            let best = Self::aliases_of(spec.key)
                .iter()
                .filter_map(|alias| score_alias(normalized_column, &normalize_column_name(alias)))
                .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));

            let Some(score) = best else { continue };

            let candidate = MappingCandidate {
                target: spec.key,
                priority,
                score,
            };
            if score >= EXACT_MATCH_SCORE {
                return vec![candidate];
            }
            candidates.push(candidate);
        }

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.priority.cmp(&b.priority))
        });
        candidates
    }
}

impl ColumnMapper for AliasColumnMapper {
    fn propose_mappings(&self, source_columns: &[String]) -> ColumnMapping {
        let mut mapping = ColumnMapping::new();
        let mut claimed: HashSet<&'static str> = HashSet::new();

        for column in source_columns {
            // 重复表头只取第一列（与解析器一致）
            if mapping.contains_source(column) {
                continue;
            }

            let normalized = normalize_column_name(column);
            if normalized.is_empty() {
                mapping.insert(column.clone(), None);
                continue;
            }

            let best = self
                .candidates(&normalized, &claimed)
                .into_iter()
                .next()
                .filter(|c| c.score >= MIN_MAPPING_SCORE);

            match best {
                Some(candidate) => {
                    claimed.insert(candidate.target);
                    mapping.insert(column.clone(), Some(candidate.target.to_string()));
                }
                None => mapping.insert(column.clone(), None),
            }
        }

        debug!(
            columns = source_columns.len(),
            mapped = claimed.len(),
            "列映射建议生成完成"
        );
        mapping
    }
}
