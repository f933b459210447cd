//! Wire types for the token endpoints
//!
//! Login and registration return a `LoginResponse` whose `tokens` carry the
//! first credential pair. The refresh exchange posts a `RefreshRequest` and
//! receives a `RefreshResponse`; only `access_token` is required there; a
//! response without `refresh_token` keeps the previous refresh credential.

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialPair;
use crate::models::UserResponse;

/// Body of the refresh exchange.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response of the refresh exchange.
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (informational only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl RefreshResponse {
    /// Build the next pair, falling back to `previous_refresh` when the
    /// response did not rotate the refresh credential.
    pub fn into_pair(self, previous_refresh: &str) -> CredentialPair {
        let refresh = match self.refresh_token {
            Some(r) if !r.is_empty() => r,
            _ => previous_refresh.to_owned(),
        };
        CredentialPair::new(self.access_token, refresh)
    }
}

/// Token block of a login or registration response.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl LoginTokens {
    pub fn to_pair(&self) -> CredentialPair {
        CredentialPair::new(self.access_token.clone(), self.refresh_token.clone())
    }
}

/// Response of login and registration.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub tokens: LoginTokens,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_response_requires_only_access() {
        let json = r#"{"access_token":"at_new"}"#;
        let resp: RefreshResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token, "at_new");
        assert!(resp.refresh_token.is_none());
        assert!(resp.expires_in.is_none());
    }

    #[test]
    fn refresh_response_without_access_is_rejected() {
        let json = r#"{"refresh_token":"rt_new"}"#;
        assert!(serde_json::from_str::<RefreshResponse>(json).is_err());
    }

    #[test]
    fn into_pair_rotates_refresh_when_present() {
        let resp: RefreshResponse =
            serde_json::from_str(r#"{"access_token":"A2","refresh_token":"R2","expires_in":3600}"#)
                .unwrap();
        let pair = resp.into_pair("R1");
        assert_eq!(pair.access.as_str(), "A2");
        assert_eq!(pair.refresh.as_str(), "R2");
    }

    #[test]
    fn into_pair_keeps_previous_refresh_when_absent_or_empty() {
        let absent: RefreshResponse = serde_json::from_str(r#"{"access_token":"A2"}"#).unwrap();
        assert_eq!(absent.into_pair("R1").refresh.as_str(), "R1");

        let empty: RefreshResponse =
            serde_json::from_str(r#"{"access_token":"A2","refresh_token":""}"#).unwrap();
        assert_eq!(empty.into_pair("R1").refresh.as_str(), "R1");
    }

    #[test]
    fn refresh_request_serializes_field_name() {
        let body = serde_json::to_string(&RefreshRequest { refresh_token: "rt_1" }).unwrap();
        assert_eq!(body, r#"{"refresh_token":"rt_1"}"#);
    }

    #[test]
    fn login_response_deserializes() {
        let json = r#"{
            "user": {
                "uid": "u1",
                "email": "a@example.com",
                "email_verified": true,
                "provider_id": "password",
                "created_at": "2024-01-01T00:00:00Z",
                "role": "teacher"
            },
            "tokens": {"access_token": "at_1", "refresh_token": "rt_1", "expires_in": 3600}
        }"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.user.uid, "u1");
        let pair = resp.tokens.to_pair();
        assert_eq!(pair.access.as_str(), "at_1");
        assert_eq!(pair.refresh.as_str(), "rt_1");
    }
}
