// ==========================================
// 多商户目录导入引擎 - 领域枚举类型
// ==========================================
// 职责: 字段类型 / 字段取值 / 会话状态 / 提交模式 / 匹配策略
// 约束: 所有枚举为封闭集合，使用 match 穷尽分派
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// FieldType - 目标字段类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Text,
    Number,
    Boolean,
    Enum,
    Images,
}

// ==========================================
// FieldValue - 标准化后的字段取值
// ==========================================
// 序列化为无标签 JSON（null / bool / 整数 / 浮点 / 字符串 / 数组）
// 反序列化顺序: Integer 先于 Number，整数年份不会退化为浮点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// 文本取值（仅 Text）
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 数值取值（Integer / Number 统一为 f64）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

// ==========================================
// SessionStatus - 暂存会话状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Staged,
    Committed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Staged => "staged",
            SessionStatus::Committed => "committed",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "staged" => Ok(SessionStatus::Staged),
            "committed" => Ok(SessionStatus::Committed),
            other => Err(format!("未知会话状态: {}", other)),
        }
    }
}

// ==========================================
// RowFilter - 暂存行分页过滤
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowFilter {
    #[default]
    All,
    Valid,
    Invalid,
}

impl FromStr for RowFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(RowFilter::All),
            "valid" => Ok(RowFilter::Valid),
            "invalid" => Ok(RowFilter::Invalid),
            other => Err(format!("无效的行过滤条件: {}，应为 all/valid/invalid", other)),
        }
    }
}

// ==========================================
// CommitMode - 提交模式
// ==========================================
// create: 仅新建（命中已存在条目则跳过）
// update: 仅更新（未命中则跳过）
// upsert: 命中更新，未命中新建
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    #[default]
    Create,
    Update,
    Upsert,
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommitMode::Create => "create",
            CommitMode::Update => "update",
            CommitMode::Upsert => "upsert",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CommitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(CommitMode::Create),
            "update" => Ok(CommitMode::Update),
            "upsert" => Ok(CommitMode::Upsert),
            other => Err(format!("无效的提交模式: {}，应为 create/update/upsert", other)),
        }
    }
}

// ==========================================
// MatchStrategy - 已有条目匹配策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    #[default]
    None,
    Isbn,
    Sku,
    TitleAuthor,
    WpPostId,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStrategy::None => "none",
            MatchStrategy::Isbn => "isbn",
            MatchStrategy::Sku => "sku",
            MatchStrategy::TitleAuthor => "title_author",
            MatchStrategy::WpPostId => "wp_post_id",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "none" | "" => Ok(MatchStrategy::None),
            "isbn" => Ok(MatchStrategy::Isbn),
            "sku" => Ok(MatchStrategy::Sku),
            "title_author" => Ok(MatchStrategy::TitleAuthor),
            "wp_post_id" => Ok(MatchStrategy::WpPostId),
            other => Err(format!(
                "无效的匹配策略: {}，应为 none/isbn/sku/title_author/wp_post_id",
                other
            )),
        }
    }
}

// ==========================================
// FailureScope - 提交失败粒度
// ==========================================
// row:   单行写入失败，同批次其他行不受影响
// batch: 批次事务失败，整批回滚，批内每行都记为失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureScope {
    Row,
    Batch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_json_shape() {
        assert_eq!(serde_json::to_string(&FieldValue::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&FieldValue::Integer(1913)).unwrap(), "1913");
        assert_eq!(
            serde_json::to_string(&FieldValue::List(vec!["http://a".to_string()])).unwrap(),
            r#"["http://a"]"#
        );
    }

    #[test]
    fn test_field_value_deserialize_prefers_integer() {
        let v: FieldValue = serde_json::from_str("1913").unwrap();
        assert_eq!(v, FieldValue::Integer(1913));

        let v: FieldValue = serde_json::from_str("19.99").unwrap();
        assert_eq!(v, FieldValue::Number(19.99));
    }

    #[test]
    fn test_parse_commit_options_enums() {
        assert_eq!("UPSERT".parse::<CommitMode>().unwrap(), CommitMode::Upsert);
        assert_eq!(
            "title-author".parse::<MatchStrategy>().unwrap(),
            MatchStrategy::TitleAuthor
        );
        assert!("merge".parse::<CommitMode>().is_err());
        assert_eq!("".parse::<RowFilter>().unwrap(), RowFilter::All);
    }
}
