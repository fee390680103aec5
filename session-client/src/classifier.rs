//! Failure response classification.
//!
//! Extracts the structured error payload (`error_code`, `message`,
//! `suggestions`) regardless of HTTP status and builds the display message.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::events::{NoOrganizationNotice, ACTION_CREATE_ORGANIZATION};

pub const NO_ORGANIZATION: &str = "NO_ORGANIZATION";
pub const ORGANIZATION_DELETED: &str = "ORGANIZATION_DELETED";

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Classified failure attached to every non-success response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedError {
    pub status: Option<u16>,
    pub error_code: Option<String>,
    pub message: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ClassifiedError {
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status.and_then(|s| StatusCode::from_u16(s).ok())
    }

    pub fn is_no_organization(&self) -> bool {
        is_no_organization_code(self.error_code.as_deref())
    }

    /// Notification payload when this is a no-organization condition.
    pub fn no_organization_notice(&self) -> Option<NoOrganizationNotice> {
        if !self.is_no_organization() {
            return None;
        }
        Some(NoOrganizationNotice {
            error_code: self.error_code.clone().unwrap_or_default(),
            message: self.message.clone(),
            action_required: ACTION_CREATE_ORGANIZATION.to_string(),
            suggestions: self.suggestions.clone(),
        })
    }
}

pub fn is_no_organization_code(code: Option<&str>) -> bool {
    matches!(code, Some(NO_ORGANIZATION) | Some(ORGANIZATION_DELETED))
}

/// Classify a failed HTTP response from its status and raw body.
pub fn classify(status: StatusCode, body: &str) -> ClassifiedError {
    let payload = parse_payload(body);
    let transport_message = format!("Request failed with status code {}", status.as_u16());

    ClassifiedError {
        status: Some(status.as_u16()),
        error_code: payload.as_ref().and_then(error_code),
        message: extract_message(payload.as_ref(), Some(body), Some(&transport_message)),
        suggestions: payload.as_ref().map(suggestions).unwrap_or_default(),
        payload,
    }
}

fn parse_payload(body: &str) -> Option<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Non-JSON bodies are kept as a raw string payload
    Some(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())))
}

fn error_code(payload: &Value) -> Option<String> {
    ["error_code", "errorCode", "code"]
        .iter()
        .find_map(|field| non_empty_str(payload.get(field)))
}

fn suggestions(payload: &Value) -> Vec<String> {
    payload
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Display message by priority:
///
/// 1. `message` field
/// 2. per-field validation messages (`errors[].msg`) joined with ", "
/// 3. `error` field
/// 4. raw payload, when the body is a bare string
/// 5. transport-level message
/// 6. a fixed generic message
pub fn extract_message(
    payload: Option<&Value>,
    raw_body: Option<&str>,
    transport_message: Option<&str>,
) -> String {
    if let Some(payload) = payload {
        if let Some(message) = non_empty_str(payload.get("message")) {
            return message;
        }
        if let Some(joined) = validation_messages(payload) {
            return joined;
        }
        if let Some(error) = non_empty_str(payload.get("error")) {
            return error;
        }
        if let Some(raw) = payload.as_str().filter(|s| !s.trim().is_empty()) {
            return raw.to_string();
        }
    } else if let Some(raw) = raw_body.map(str::trim).filter(|s| !s.is_empty()) {
        if serde_json::from_str::<Value>(raw).is_err() {
            return raw.to_string();
        }
    }

    transport_message
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
}

fn validation_messages(payload: &Value) -> Option<String> {
    let items = payload.get("errors")?.as_array()?;
    let messages: Vec<&str> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            other => other
                .get("msg")
                .or_else(|| other.get("message"))
                .and_then(Value::as_str),
        })
        .filter(|m| !m.trim().is_empty())
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join(", "))
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
