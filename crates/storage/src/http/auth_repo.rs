use reqwest::StatusCode;

use super::wire::{ErrorBody, LoginRequest, LoginResponse};
use super::{HttpBackend, connection, status_error};
use crate::repository::{AuthRepository, LoginGrant, StorageError};

#[async_trait::async_trait]
impl AuthRepository for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, StorageError> {
        let response = self
            .post("auth/login/")
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(connection)?;

        let status = response.status();
        if status.is_success() {
            let body: LoginResponse = response.json().await.map_err(connection)?;
            return Ok(LoginGrant {
                token: body.token,
                user: body.user,
            });
        }

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                let detail = ErrorBody::parse(&body)
                    .detail
                    .unwrap_or_else(|| "login failed".into());
                Err(StorageError::Rejected(detail))
            }
            other => Err(status_error(other)),
        }
    }
}
