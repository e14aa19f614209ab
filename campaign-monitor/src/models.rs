use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt::Display};

/// Opaque JSON request body, sent to the API byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn raw<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Self(bytes.into())
    }

    /// Serializes any value (e.g. [`SubscriberRequest`]) into a payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_vec(value).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self(value.to_string().into_bytes())
    }
}

/// A successful API reply.
///
/// Keeps the parsed document around; `to_string()` yields the compact JSON
/// string form. String replies keep their quotes there (adding a subscriber
/// answers `"jane@example.com"`), use [`ApiResponse::as_str`] for the bare
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse(Value);

impl ApiResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The bare string when the reply is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Deserializes the reply into a typed model.
    pub fn parse<T: serde::de::DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.0)
    }
}

impl Display for ApiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomField {
    pub key: String,
    pub value: String,
}

/// Body for adding or updating a subscriber.
#[derive(Serialize, Clone, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriberRequest {
    pub email_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
    pub resubscribe: bool,
    pub consent_to_track: ConsentToTrack,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConsentToTrack {
    Yes,
    No,
    #[default]
    Unchanged,
}

/// Body for sending a smart (transactional) email.
#[derive(Serialize, Clone, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SmartEmailRequest {
    pub to: Vec<String>,
    #[serde(rename = "CC", skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(rename = "BCC", skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    pub add_recipients_to_list: bool,
    pub consent_to_track: ConsentToTrack,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Subscriber {
    pub email_address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub consent_to_track: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriberPage {
    pub results: Vec<Subscriber>,
    pub page_number: usize,
    pub page_size: usize,
    pub records_on_this_page: usize,
    pub total_number_of_records: usize,
    pub number_of_pages: usize,
}

/// Error document returned by Campaign Monitor on 4xx/5xx replies.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CampaignMonitorError {
    pub code: i64,
    pub message: String,
}

impl Display for CampaignMonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}
