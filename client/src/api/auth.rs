use super::{endpoints, ApiClient};
use crate::error::{ClientError, ClientResult};
use common::{AuthResponse, LoginRequest, RegisterRequest, User};

impl ApiClient {
    /// Exchange credentials for a token and profile
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        tracing::info!("Logging in as {}", email);

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self
            .send(self.http.post(self.url(endpoints::LOGIN)).json(&request))
            .await?;

        tracing::info!("Logged in as user {}", response.user.user_id);
        Ok(response)
    }

    /// Create an account; the service logs the new user in directly
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        if request.password != request.password_confirm {
            return Err(ClientError::InvalidInput(
                "passwords do not match".to_string(),
            ));
        }

        tracing::info!("Registering {}", request.email);
        let response: AuthResponse = self
            .send(self.http.post(self.url(endpoints::REGISTER)).json(request))
            .await?;

        tracing::info!("Registered user {}", response.user.user_id);
        Ok(response)
    }

    pub async fn profile(&self, token: &str) -> ClientResult<User> {
        self.send(self.get(endpoints::PROFILE, token)).await
    }
}
