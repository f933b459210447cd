//! Auth endpoint paths and user-facing session messages
//!
//! Paths are relative to the API base URL plus prefix. Callers can override
//! them through configuration; these are the defaults the backend exposes.

/// Password login. A 401 here is a wrong password, never an expired session.
pub const LOGIN_PATH: &str = "/auth/login";

/// Account registration.
pub const REGISTER_PATH: &str = "/auth/register";

/// Refresh exchange: trades a refresh credential for a new pair.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Server-side logout.
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Current user profile.
pub const ME_PATH: &str = "/auth/me";

/// Password reset request and confirmation.
pub const PASSWORD_RESET_PATH: &str = "/auth/password-reset";
pub const PASSWORD_RESET_CONFIRM_PATH: &str = "/auth/password-reset/confirm";

/// Shown once per failed refresh cycle.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Shown when no HTTP response was received at all.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Fallback for statuses without a specific message.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";
