//! User-facing messages for failed responses
//!
//! A backend-provided `detail` or `message` string wins over the status
//! default, so validation and login errors reach the user verbatim. Statuses
//! without a dedicated message fall back to a generic one.

use session_auth::UNEXPECTED_ERROR_MESSAGE;

/// Message for a status code, ignoring the body.
pub fn default_message(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("Bad request. Please check your input."),
        403 => Some("You don't have permission to perform this action."),
        404 => Some("The requested resource was not found."),
        409 => Some("A conflict occurred. Please try again."),
        422 => Some("Validation failed. Please check your input."),
        429 => Some("Too many requests. Please slow down."),
        500 => Some("Server error. Please try again later."),
        503 => Some("Service unavailable. Please try again later."),
        _ => None,
    }
}

/// `detail` or `message` string from a JSON error body.
///
/// Non-string values (e.g. a list of validation errors under `detail`) are
/// skipped so the status default applies instead.
pub fn body_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_owned)
}

/// Message to show for a failed response.
pub fn user_message(status: u16, body: &str) -> String {
    body_message(body)
        .or_else(|| default_message(status).map(str::to_owned))
        .unwrap_or_else(|| UNEXPECTED_ERROR_MESSAGE.to_owned())
}
