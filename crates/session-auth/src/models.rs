//! Account request and response bodies

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "teacher" => Ok(UserRole::Teacher),
            "student" => Ok(UserRole::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserLogin {
    pub email: String,
    pub password: String,
}

/// User as returned alongside login/registration tokens.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub provider_id: String,
    pub created_at: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// User as returned by the profile endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub provider_id: String,
    pub created_at: String,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetConfirm {
    pub oob_code: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

/// Generic `{"message": ...}` acknowledgement (logout, password reset, dashboards).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
