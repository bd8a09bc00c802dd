use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Server-assigned email identifier. The listing API hands these out as JSON
/// numbers, but string ids are accepted too; numeric ids sort first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(u64),
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{}", n),
            MessageId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for MessageId {
    fn from(n: u64) -> Self {
        MessageId::Number(n)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId::Text(s.to_string())
    }
}

// Email record as returned by GET /emails/list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub message_id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Email {
    #[cfg(test)]
    pub fn new(message_id: impl Into<MessageId>) -> Self {
        Email {
            message_id: message_id.into(),
            subject: None,
            from: None,
            to: None,
            date: None,
            extra: Map::new(),
        }
    }
}

/// Decode the count endpoint, which some servers wrap in an object.
pub fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(obj) => obj
            .get("count")
            .or_else(|| obj.get("total"))
            .and_then(parse_count),
        _ => None,
    }
}

/// A fetched message body, prior to policy admission.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub content_type: String,
    pub text: String,
}

// Producer types (POST /v1/produce/{topic})
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Payload {
    pub fn new(client: &str) -> Self {
        Payload {
            client: Some(client.to_string()),
            ..Default::default()
        }
    }

    pub fn with_uuid(mut self, uuid: uuid::Uuid) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    pub fn with_correlation_id(mut self, id: &str) -> Self {
        self.correlation_id = Some(id.to_string());
        self
    }

    pub fn with_schema_id(mut self, id: &str) -> Self {
        self.schema_id = Some(id.to_string());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProduceResponse {
    #[serde(default)]
    pub partition: Option<i32>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseList {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub responses: Vec<ProduceResponse>,
}

fn default_status() -> u16 {
    200
}

impl ResponseList {
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.responses.iter().all(|r| r.errors.is_empty())
    }

    pub fn errors(&self) -> Vec<&str> {
        self.responses
            .iter()
            .flat_map(|r| r.errors.iter().map(String::as_str))
            .collect()
    }
}
