//! Account endpoints

use serde::{Deserialize, Serialize};
use session_auth::{
    LOGOUT_PATH, LoginResponse, ME_PATH, MessageResponse, PASSWORD_RESET_CONFIRM_PATH,
    PASSWORD_RESET_PATH, PasswordResetConfirm, PasswordResetRequest, SetRoleRequest, User,
    UserCreate, UserLogin, UserRole,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::SessionClient;
use crate::transport::ApiRequest;

/// Greeting returned by the role dashboards.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardResponse {
    pub message: String,
}

#[derive(Serialize)]
struct RoleUpdate<'a> {
    role_data: &'a SetRoleRequest,
}

impl SessionClient {
    /// Create an account and start a session with the returned tokens.
    pub async fn register(&self, payload: &UserCreate) -> Result<LoginResponse> {
        let request = ApiRequest::post(self.paths().register.as_str()).json(payload)?;
        let response: LoginResponse = self.execute_json(request).await?;
        self.store().set(response.tokens.to_pair())?;
        info!(uid = %response.user.uid, "registered, session started");
        Ok(response)
    }

    /// Start a session. Wrong credentials come back as
    /// `ClientError::Unauthorized` and never trigger a refresh.
    pub async fn login(&self, payload: &UserLogin) -> Result<LoginResponse> {
        let request = ApiRequest::post(self.paths().login.as_str()).json(payload)?;
        let response: LoginResponse = self.execute_json(request).await?;
        self.store().set(response.tokens.to_pair())?;
        info!(uid = %response.user.uid, "logged in");
        Ok(response)
    }

    /// End the session. Local credentials are cleared whether or not the
    /// server acknowledged.
    pub async fn logout(&self) -> Result<MessageResponse> {
        let result = self
            .execute_json::<MessageResponse>(ApiRequest::post(LOGOUT_PATH))
            .await;
        if let Err(e) = &result {
            warn!(error = %e, "server logout failed, clearing local session anyway");
        }
        self.store().clear()?;
        result
    }

    /// Run the refresh exchange now instead of waiting for a 401.
    pub async fn refresh(&self) -> Result<()> {
        self.coordinator().refresh_now().await?;
        Ok(())
    }

    pub async fn current_user(&self) -> Result<User> {
        self.execute_json(ApiRequest::get(ME_PATH)).await
    }

    pub async fn request_password_reset(
        &self,
        payload: &PasswordResetRequest,
    ) -> Result<MessageResponse> {
        let request = ApiRequest::post(PASSWORD_RESET_PATH).json(payload)?;
        self.execute_json(request).await
    }

    pub async fn confirm_password_reset(
        &self,
        payload: &PasswordResetConfirm,
    ) -> Result<MessageResponse> {
        let request = ApiRequest::post(PASSWORD_RESET_CONFIRM_PATH).json(payload)?;
        self.execute_json(request).await
    }

    /// Admin only.
    pub async fn update_user_role(
        &self,
        uid: &str,
        payload: &SetRoleRequest,
    ) -> Result<MessageResponse> {
        let request = ApiRequest::put(format!("/auth/users/{uid}/role"))
            .json(&RoleUpdate { role_data: payload })?;
        self.execute_json(request).await
    }

    pub async fn dashboard(&self, role: UserRole) -> Result<DashboardResponse> {
        let path = format!("/auth/{}/dashboard", role.as_str());
        self.execute_json(ApiRequest::get(path)).await
    }
}
