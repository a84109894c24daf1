use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 参与者（按 owner + email 去重）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub email: String,
    /// 自定义字段
    pub custom_data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(owner_id: impl Into<String>, recipient: Recipient) -> Self {
        Self {
            id: format!("part_{}", uuid::Uuid::new_v4().simple()),
            owner_id: owner_id.into(),
            name: recipient.name,
            email: recipient.email,
            custom_data: recipient.custom_data,
            created_at: Utc::now(),
        }
    }
}

/// 已校验的接收者记录（来自表格导入）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    pub name: String,
    pub email: String,
    #[serde(default, rename = "customData", alias = "custom_data")]
    pub custom_data: Map<String, Value>,
}

impl Recipient {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            custom_data: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_data.insert(key.into(), value.into());
        self
    }
}

impl From<&Participant> for Recipient {
    fn from(participant: &Participant) -> Self {
        Self {
            name: participant.name.clone(),
            email: participant.email.clone(),
            custom_data: participant.custom_data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_accepts_camel_case_custom_data() {
        let json = r#"{"name":"Ada","email":"ada@example.com","customData":{"college":"KIT"}}"#;
        let recipient: Recipient = serde_json::from_str(json).unwrap();

        assert_eq!(recipient.custom_data["college"], "KIT");
    }

    #[test]
    fn test_recipient_without_custom_data() {
        let json = r#"{"name":"Ada","email":"ada@example.com"}"#;
        let recipient: Recipient = serde_json::from_str(json).unwrap();

        assert!(recipient.custom_data.is_empty());
    }
}
