//! Supabase REST API client (PostgREST tables and RPCs)

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::Config;

/// Supabase client for database operations.
///
/// The service client uses the service_role key which bypasses RLS - handle with care!
/// Request handlers should go through [`SupabaseClient::as_user`] so row-level security
/// applies to the caller exactly as it would from the browser.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    api_key: String,
    bearer: String,
}

impl SupabaseClient {
    /// Service-role client
    pub fn new(config: &Config) -> Result<Self, SupabaseError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(SupabaseError::Request)?;

        Ok(Self {
            client,
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            api_key: config.supabase_service_role_key.clone(),
            bearer: config.supabase_service_role_key.clone(),
        })
    }

    /// Client acting as the user who owns `access_token` (anon key + user JWT)
    pub fn as_user(&self, access_token: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            anon_key: self.anon_key.clone(),
            api_key: self.anon_key.clone(),
            bearer: access_token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the REST API URL for a table
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Start a request carrying this client's credentials
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer))
    }

    /// Make an authenticated GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .request(Method::GET, &url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        check(response).await?.json().await.map_err(SupabaseError::Parse)
    }

    /// Make an authenticated GET request expecting a single row
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Option<T>, SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .request(Method::GET, &url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        if response.status() == reqwest::StatusCode::NOT_ACCEPTABLE {
            // No rows found
            return Ok(None);
        }

        check(response)
            .await?
            .json()
            .await
            .map(Some)
            .map_err(SupabaseError::Parse)
    }

    /// Make an authenticated POST request (insert) returning the created row
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        data: &T,
    ) -> Result<R, SupabaseError> {
        // PostgREST returns an array, get first element
        let results: Vec<R> = self.insert_many(table, data).await?;
        results
            .into_iter()
            .next()
            .ok_or(SupabaseError::NoRowReturned)
    }

    /// Insert one row or an array of rows, returning what was created
    pub async fn insert_many<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        data: &T,
    ) -> Result<Vec<R>, SupabaseError> {
        let url = self.rest_url(table);

        let response = self
            .request(Method::POST, &url)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(data)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        check(response).await?.json().await.map_err(SupabaseError::Parse)
    }

    /// Make an authenticated PATCH request (update)
    pub async fn update<T: Serialize>(
        &self,
        table: &str,
        query: &str,
        data: &T,
    ) -> Result<(), SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .request(Method::PATCH, &url)
            .header("Content-Type", "application/json")
            .json(data)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        check(response).await.map(|_| ())
    }

    /// PATCH returning the updated rows; an empty result means the filter matched nothing
    pub async fn update_returning<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
        data: &T,
    ) -> Result<Vec<R>, SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .request(Method::PATCH, &url)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(data)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        check(response).await?.json().await.map_err(SupabaseError::Parse)
    }

    /// Make an authenticated DELETE request
    pub async fn delete(&self, table: &str, query: &str) -> Result<(), SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        check(response).await.map(|_| ())
    }

    /// Invoke a stored procedure through `/rest/v1/rpc/<name>`
    pub async fn rpc<P: Serialize, R: DeserializeOwned>(
        &self,
        name: &str,
        params: &P,
    ) -> Result<R, SupabaseError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, name);

        let response = self
            .request(Method::POST, &url)
            .header("Content-Type", "application/json")
            .json(params)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        let response = check(response).await?;

        // Void functions answer 204 with no body
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return serde_json::from_value(serde_json::Value::Null).map_err(SupabaseError::Decode);
        }

        let bytes = response.bytes().await.map_err(SupabaseError::Request)?;
        if bytes.is_empty() {
            return serde_json::from_value(serde_json::Value::Null).map_err(SupabaseError::Decode);
        }
        serde_json::from_slice(&bytes).map_err(SupabaseError::Decode)
    }
}

/// Turn non-success responses into [`SupabaseError::Api`]
pub(crate) async fn check(response: Response) -> Result<Response, SupabaseError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(SupabaseError::Api { status: status.as_u16(), body })
}

/// Error body returned by PostgREST (and by RPCs raising exceptions)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    #[serde(default)]
    pub hint: Option<String>,
}

/// Supabase errors
#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(serde_json::Error),

    #[error("No row returned from insert")]
    NoRowReturned,
}

impl SupabaseError {
    /// Decoded PostgREST error body, when the backend sent one
    pub fn postgrest(&self) -> Option<PostgrestError> {
        match self {
            SupabaseError::Api { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SupabaseError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
