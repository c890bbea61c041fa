//! Check record types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// HTTP verbs a check may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl CheckMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckMethod::Get => "GET",
            CheckMethod::Post => "POST",
            CheckMethod::Put => "PUT",
            CheckMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for CheckMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckMethod {
    type Err = String;

    /// Case-insensitive, so `get` and `GET` are the same method.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(CheckMethod::Get),
            "POST" => Ok(CheckMethod::Post),
            "PUT" => Ok(CheckMethod::Put),
            "DELETE" => Ok(CheckMethod::Delete),
            _ => Err(format!("The method '{}' is not allowed", s)),
        }
    }
}

/// Optional request body of a check.
///
/// A JSON string is raw text; any other JSON value is structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
}

impl Payload {
    /// Content type sent alongside the serialized body.
    pub fn content_type(&self) -> &'static str {
        match self {
            Payload::Json(serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                "application/json"
            }
            _ => "text/plain",
        }
    }

    /// Wire representation of the payload.
    pub fn to_body(&self) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            Payload::Json(value) => value.to_string(),
        }
    }

    /// Falsy payloads (empty text, `null`, `false`, `0`) are not sent.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Text(text) => text.is_empty(),
            Payload::Json(serde_json::Value::Null | serde_json::Value::Bool(false)) => true,
            Payload::Json(serde_json::Value::Number(n)) => n.as_f64() == Some(0.0),
            Payload::Json(_) => false,
        }
    }
}

/// A single monitored target and the outcome of its most recent probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Check {
    /// Request target
    pub url: String,

    /// Request verb
    pub method: CheckMethod,

    /// Optional request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,

    /// Dispatch time of the last probe (ms since epoch)
    #[serde(default)]
    pub req_time: Option<i64>,

    /// Arrival time of the last outcome (ms since epoch)
    #[serde(default)]
    pub res_time: Option<i64>,

    /// Response code of the last probe that completed normally
    #[serde(default)]
    pub status_code: Option<u16>,

    /// Symbolic failure reason of the last probe
    #[serde(default)]
    pub err_code: Option<String>,
}

impl Check {
    /// Create a check that has never been probed.
    pub fn new(url: impl Into<String>, method: CheckMethod, payload: Option<Payload>) -> Self {
        Self {
            url: url.into(),
            method,
            payload,
            req_time: None,
            res_time: None,
            status_code: None,
            err_code: None,
        }
    }

    /// Whether the last probe failed.
    pub fn has_error(&self) -> bool {
        self.err_code.is_some()
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!("get".parse::<CheckMethod>().unwrap(), CheckMethod::Get);
        assert_eq!("Delete".parse::<CheckMethod>().unwrap(), CheckMethod::Delete);
        assert!("PATCH".parse::<CheckMethod>().is_err());
    }

    #[test]
    fn test_new_check_serializes_null_results() {
        let check = Check::new("http://example.com", CheckMethod::Get, None);
        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "http://example.com",
                "method": "GET",
                "req_time": null,
                "res_time": null,
                "status_code": null,
                "err_code": null,
            })
        );
    }

    #[test]
    fn test_payload_kinds() {
        let check: Check = serde_json::from_value(json!({
            "url": "http://example.com",
            "method": "POST",
            "payload": {"name": "probe"},
        }))
        .unwrap();
        let payload = check.payload.unwrap();
        assert_eq!(payload.content_type(), "application/json");
        assert_eq!(payload.to_body(), r#"{"name":"probe"}"#);

        let text: Payload = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(text, Payload::Text("hello".into()));
        assert_eq!(text.content_type(), "text/plain");
        assert_eq!(text.to_body(), "hello");

        let number: Payload = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(number.content_type(), "text/plain");
        assert_eq!(number.to_body(), "42");
    }

    #[test]
    fn test_falsy_payloads_are_empty() {
        for value in [json!(""), json!(null), json!(false), json!(0), json!(0.0)] {
            let payload: Payload = serde_json::from_value(value.clone()).unwrap();
            assert!(payload.is_empty(), "{} should be empty", value);
        }
        for value in [json!("0"), json!(true), json!(1), json!({}), json!([])] {
            let payload: Payload = serde_json::from_value(value.clone()).unwrap();
            assert!(!payload.is_empty(), "{} should be sent", value);
        }
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<Check, _> = serde_json::from_value(json!({
            "url": "http://example.com",
            "method": "GET",
            "owner": "someone",
        }));
        assert!(result.is_err());
    }
}
