//! Request and response shapes of the `/init` and `/run` contract

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::core_types::EnvironmentSet;

pub const DEFAULT_ENTRY_POINT: &str = "main";

static BASE64_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9+/]{4})*([A-Za-z0-9+/]{4}|[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{2}==)$")
        .expect("base64 pattern must compile")
});

/// Structural check for base64-encoded action code. The content is never
/// decoded; only the trimmed text's length and alphabet are inspected.
pub fn is_binary_code(code: &str) -> bool {
    let trimmed = code.trim();
    !trimmed.is_empty() && trimmed.len() % 4 == 0 && BASE64_PATTERN.is_match(trimmed)
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitRequest {
    pub code: String,
    pub main: String,
    pub env: Option<EnvironmentSet>,
}

impl InitRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            main: DEFAULT_ENTRY_POINT.to_string(),
            env: None,
        }
    }

    pub fn with_main(mut self, main: impl Into<String>) -> Self {
        self.main = main.into();
        self
    }

    pub fn with_env(mut self, env: EnvironmentSet) -> Self {
        self.env = Some(env);
        self
    }

    pub fn is_binary(&self) -> bool {
        is_binary_code(&self.code)
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "value": {
                "code": self.code,
                "main": self.main,
                "binary": self.is_binary(),
                "env": self.env,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub arguments: Value,
    pub additional_properties: Map<String, Value>,
}

impl RunRequest {
    pub fn new(arguments: Value) -> Self {
        Self {
            arguments,
            additional_properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional_properties.insert(key.into(), value);
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.additional_properties.extend(properties);
        self
    }

    /// `{"value": arguments, ...additional_properties}`; a top-level key given
    /// in the additional properties replaces the generated one.
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("value".to_string(), self.arguments.clone());
        payload.extend(
            self.additional_properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Value::Object(payload)
    }
}

/// Status and decoded body of one `/init` or `/run` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub status: u16,
    pub body: Option<Value>,
}

impl RunResult {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The `error` field of a failure body, if the container sent one.
    pub fn error_message(&self) -> Option<&str> {
        self.body.as_ref()?.get("error")?.as_str()
    }

    /// Decodes a raw response body. Empty bodies carry no value; anything that
    /// is not JSON is kept verbatim as a string.
    pub(crate) fn from_raw(status: u16, raw: &str) -> Self {
        let body = if raw.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
        };
        Self { status, body }
    }
}
