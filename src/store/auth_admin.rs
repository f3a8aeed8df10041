//! Supabase Auth admin API (service role only)

use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{check, SupabaseClient, SupabaseError};

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
    user_metadata: UserMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct UserMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

/// Auth user as returned by the admin API
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Creates sign-in accounts for staff
#[derive(Clone)]
pub struct AuthAdmin {
    client: SupabaseClient,
}

impl AuthAdmin {
    /// `client` must be the service-role client
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Create a confirmed email/password user
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<AuthUser, SupabaseError> {
        let url = format!("{}/auth/v1/admin/users", self.client.base_url());

        let response = self
            .client
            .request(Method::POST, &url)
            .header("Content-Type", "application/json")
            .json(&CreateUserRequest {
                email,
                password,
                email_confirm: true,
                user_metadata: UserMetadata { full_name },
            })
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        check(response).await?.json().await.map_err(SupabaseError::Parse)
    }
}
