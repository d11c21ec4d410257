// ==========================================
// 多商户目录导入引擎 - 目录条目领域模型
// ==========================================
// 职责: 暂存行 → 目录写入草稿；已有条目匹配条件
// 用途: 对账引擎构造，仓储层只做落库
// ==========================================

use crate::domain::staging::NormalizedRow;
use crate::domain::target_schema::keys;
use crate::domain::types::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// CatalogEntryDraft - 目录条目写入草稿
// ==========================================
// 更新时仅非 None 字段覆盖已有值；images 非空时整体替换媒体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntryDraft {
    pub vendor_id: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub price: f64,
    pub quantity: Option<i64>,
    pub sku: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i64>,
    pub edition: Option<String>,
    pub condition: Option<String>,
    pub binding: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_signed: Option<bool>,
    pub is_first_edition: Option<bool>,
    pub status: Option<String>,
    pub wp_post_id: Option<String>,
    pub images: Vec<String>,

    // ===== 审计 =====
    pub import_id: Option<String>,
    pub created_by: Option<String>,
}

impl CatalogEntryDraft {
    /// 从有效标准化行构造草稿
    ///
    /// # 参数
    /// - row: 已通过校验的标准化行
    /// - vendor_id: 归属商户
    /// - status_override: 未映射状态列时使用的默认状态
    pub fn from_row(
        row: &NormalizedRow,
        vendor_id: Option<&str>,
        status_override: Option<&str>,
    ) -> Self {
        let text = |key: &str| row.text(key).map(str::to_string);
        let boolean = |key: &str| row.get(key).and_then(FieldValue::as_bool);

        Self {
            vendor_id: vendor_id.map(str::to_string),
            title: row.text(keys::TITLE).unwrap_or_default().to_string(),
            author: text(keys::AUTHOR),
            price: row.number(keys::PRICE).unwrap_or_default(),
            quantity: row.number(keys::QUANTITY).map(|q| q.round() as i64),
            sku: text(keys::SKU),
            isbn: text(keys::ISBN),
            publisher: text(keys::PUBLISHER),
            publication_year: row.get(keys::PUBLICATION_YEAR).and_then(FieldValue::as_i64),
            edition: text(keys::EDITION),
            condition: text(keys::CONDITION),
            binding: text(keys::BINDING),
            description: text(keys::DESCRIPTION),
            category: text(keys::CATEGORY),
            is_signed: boolean(keys::IS_SIGNED),
            is_first_edition: boolean(keys::IS_FIRST_EDITION),
            status: status_override
                .map(str::to_string)
                .or_else(|| text(keys::STATUS)),
            wp_post_id: text(keys::WP_POST_ID),
            images: row
                .get(keys::IMAGES)
                .and_then(FieldValue::as_list)
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            import_id: None,
            created_by: None,
        }
    }

    /// 更新场景: 仅保留来自文件映射列的字段，其余置空（不覆盖已有值）
    ///
    /// title / price 为必填校验字段，始终保留
    pub fn retain_fields(&mut self, is_kept: impl Fn(&str) -> bool) {
        fn keep<T>(slot: &mut Option<T>, kept: bool) {
            if !kept {
                *slot = None;
            }
        }

        keep(&mut self.author, is_kept(keys::AUTHOR));
        keep(&mut self.quantity, is_kept(keys::QUANTITY));
        keep(&mut self.sku, is_kept(keys::SKU));
        keep(&mut self.isbn, is_kept(keys::ISBN));
        keep(&mut self.publisher, is_kept(keys::PUBLISHER));
        keep(&mut self.publication_year, is_kept(keys::PUBLICATION_YEAR));
        keep(&mut self.edition, is_kept(keys::EDITION));
        keep(&mut self.condition, is_kept(keys::CONDITION));
        keep(&mut self.binding, is_kept(keys::BINDING));
        keep(&mut self.description, is_kept(keys::DESCRIPTION));
        keep(&mut self.category, is_kept(keys::CATEGORY));
        keep(&mut self.is_signed, is_kept(keys::IS_SIGNED));
        keep(&mut self.is_first_edition, is_kept(keys::IS_FIRST_EDITION));
        keep(&mut self.status, is_kept(keys::STATUS));
        keep(&mut self.wp_post_id, is_kept(keys::WP_POST_ID));
        if !is_kept(keys::IMAGES) {
            self.images.clear();
        }
    }
}

// ==========================================
// CatalogEntry - 已落库目录条目（读模型）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub entry_id: String,
    pub data: CatalogEntryDraft, // images 按 position 排序，第一张为主图
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// MatchFilter - 已有条目查找条件
// ==========================================
// 始终限定在归属商户范围内
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFilter {
    pub vendor_id: Option<String>,
    pub key: MatchKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKey {
    Isbn(String),
    Sku(String),
    TitleAuthor { title: String, author: String },
    WpPostId(String),
}
