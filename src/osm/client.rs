//! Bearer-authenticated OpenStreetMap API 0.6 client
//!
//! One method per endpoint. Write calls return the raw [`ApiResponse`] so
//! the changeset pipeline decides how each status maps to an error; only
//! transport failures surface as `Err`.

use serde::Deserialize;

use crate::auth::Credential;
use crate::environment::EndpointTable;
use crate::error::{OsmSubmitError, Result};

/// Status and body of an API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl ApiResponse {
    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body with surrounding whitespace removed (ids come back as `"123\n"`)
    pub fn trimmed_body(&self) -> &str {
        self.body.trim()
    }
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDetails {
    /// Numeric OSM user id
    pub id: Option<u64>,
    /// Public display name
    pub display_name: String,
    /// Avatar image URL, when the user has one
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserDetailsEnvelope {
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    id: Option<u64>,
    display_name: String,
    #[serde(default)]
    img: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    href: String,
}

/// Thin client over the API endpoints the crate uses
#[derive(Clone)]
pub struct OsmApiClient {
    http: reqwest::Client,
    endpoints: EndpointTable,
}

impl OsmApiClient {
    /// Creates a client over `http` resolving URLs from `endpoints`
    pub fn new(http: reqwest::Client, endpoints: EndpointTable) -> Self {
        Self { http, endpoints }
    }

    fn api_url(&self, credential: &Credential, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoints.for_env(credential.environment).api_url,
            path.trim_start_matches('/')
        )
    }

    async fn put(
        &self,
        credential: &Credential,
        path: &str,
        body: Option<String>,
    ) -> Result<ApiResponse> {
        let url = self.api_url(credential, path);
        tracing::debug!(%url, "PUT");

        let mut request = self
            .http
            .put(&url)
            .bearer_auth(&credential.access_token)
            .header(reqwest::header::CONTENT_TYPE, "text/xml");
        if let Some(body) = body {
            request = request.body(body);
        }

        let resp = request.send().await.map_err(OsmSubmitError::Http)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(OsmSubmitError::Http)?;
        Ok(ApiResponse { status, body })
    }

    /// `PUT /changeset/create` with a changeset document
    pub async fn create_changeset(
        &self,
        credential: &Credential,
        document: String,
    ) -> Result<ApiResponse> {
        self.put(credential, "changeset/create", Some(document)).await
    }

    /// `PUT /node/create` with a node document
    pub async fn create_node(
        &self,
        credential: &Credential,
        document: String,
    ) -> Result<ApiResponse> {
        self.put(credential, "node/create", Some(document)).await
    }

    /// `PUT /changeset/{id}/close` with an empty body
    pub async fn close_changeset(
        &self,
        credential: &Credential,
        changeset_id: &str,
    ) -> Result<ApiResponse> {
        self.put(credential, &format!("changeset/{}/close", changeset_id), None)
            .await
    }

    /// `GET` the user-details document for the credential's owner
    ///
    /// # Errors
    ///
    /// `Unauthorized` on 401, `UserDetails` on any other non-success status
    /// or an unreadable body.
    pub async fn user_details(&self, credential: &Credential) -> Result<UserDetails> {
        let url = &self.endpoints.for_env(credential.environment).user_url;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .map_err(OsmSubmitError::Http)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(OsmSubmitError::Http)?;

        if status == 401 {
            return Err(OsmSubmitError::Unauthorized { body }.into());
        }
        if !(200..300).contains(&status) {
            return Err(OsmSubmitError::UserDetails { status, body }.into());
        }

        let envelope: UserDetailsEnvelope = serde_json::from_str(&body)
            .map_err(|e| OsmSubmitError::UserDetails {
                status,
                body: format!("unreadable user details: {e}"),
            })?;

        Ok(UserDetails {
            id: envelope.user.id,
            display_name: envelope.user.display_name,
            avatar_url: envelope.user.img.map(|img| img.href),
        })
    }
}
