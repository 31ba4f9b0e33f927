//! OAuth access tokens for the Firestore REST API.
//!
//! Four sources are supported: a service account key (signed JWT assertion
//! exchanged at the key's `token_uri`), gcloud user credentials (refresh
//! token exchange), the GCE metadata server for ambient credentials, and the
//! local emulator, which accepts a fixed owner token.

use crate::services::store::StoreError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const REFRESH_TOKEN_GRANT: &str = "refresh_token";
const METADATA_BASE: &str = "http://metadata.google.internal/computeMetadata/v1";
const EMULATOR_TOKEN: &str = "owner";

/// Assertion lifetime accepted by Google's token endpoint (max one hour).
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service account key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// User credentials written by `gcloud auth application-default login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// A Google credentials JSON file, told apart by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

impl CredentialsFile {
    pub async fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            StoreError::Credentials(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            StoreError::Credentials(format!("invalid credentials file {}: {}", path.display(), e))
        })
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            CredentialsFile::ServiceAccount(key) => key.project_id.as_deref(),
            CredentialsFile::AuthorizedUser(user) => user.quota_project_id.as_deref(),
        }
    }

    pub fn into_source(self) -> Result<TokenSource, StoreError> {
        match self {
            CredentialsFile::ServiceAccount(key) => TokenSource::service_account(key),
            CredentialsFile::AuthorizedUser(user) => Ok(TokenSource::AuthorizedUser(user)),
        }
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

pub enum TokenSource {
    ServiceAccount {
        key: ServiceAccountKey,
        encoding_key: EncodingKey,
    },
    AuthorizedUser(AuthorizedUser),
    Metadata,
    Emulator,
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey) -> Result<Self, StoreError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StoreError::Credentials(format!("failed to parse private key: {}", e)))?;
        Ok(TokenSource::ServiceAccount { key, encoding_key })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenSource::ServiceAccount { .. } => "service_account",
            TokenSource::AuthorizedUser(_) => "authorized_user",
            TokenSource::Metadata => "metadata",
            TokenSource::Emulator => "emulator",
        }
    }
}

/// Hands out bearer tokens, fetching a new one only when the current one is about to expire.
pub struct TokenProvider {
    source: TokenSource,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(source: TokenSource, client: Client) -> Self {
        Self {
            source,
            client,
            cached: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &TokenSource {
        &self.source
    }

    pub async fn token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let response = match &self.source {
            TokenSource::ServiceAccount { key, encoding_key } => {
                self.exchange_assertion(key, encoding_key, now).await?
            }
            TokenSource::AuthorizedUser(user) => self.refresh_user_token(user).await?,
            TokenSource::Metadata => self.fetch_metadata_token().await?,
            TokenSource::Emulator => TokenResponse {
                access_token: EMULATOR_TOKEN.to_string(),
                expires_in: ASSERTION_LIFETIME_SECS,
            },
        };

        tracing::debug!(
            source = self.source.name(),
            expires_in = response.expires_in,
            "Obtained Firestore access token"
        );

        let value = response.access_token.clone();
        *cached = Some(CachedToken {
            value: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in),
        });
        Ok(value)
    }

    async fn exchange_assertion(
        &self,
        key: &ServiceAccountKey,
        encoding_key: &EncodingKey,
        now: DateTime<Utc>,
    ) -> Result<TokenResponse, StoreError> {
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: DATASTORE_SCOPE,
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();
        let assertion = encode(&header, &claims, encoding_key)
            .map_err(|e| StoreError::Auth(format!("failed to sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        parse_token_response(response).await
    }

    async fn refresh_user_token(&self, user: &AuthorizedUser) -> Result<TokenResponse, StoreError> {
        let response = self
            .client
            .post(&user.token_uri)
            .form(&[
                ("grant_type", REFRESH_TOKEN_GRANT),
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", user.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        parse_token_response(response).await
    }

    async fn fetch_metadata_token(&self) -> Result<TokenResponse, StoreError> {
        let url = format!(
            "{}/instance/service-accounts/default/token?scopes={}",
            METADATA_BASE, DATASTORE_SCOPE
        );
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StoreError::Auth(format!("metadata server unreachable: {}", e)))?;

        parse_token_response(response).await
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse, StoreError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Auth(format!(
            "token endpoint returned {}: {}",
            status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| StoreError::Auth(format!("invalid token response: {}", e)))
}

/// Project id of the ambient credentials, read from the metadata server.
pub async fn metadata_project_id(client: &Client) -> Result<String, StoreError> {
    let response = client
        .get(format!("{}/project/project-id", METADATA_BASE))
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| StoreError::Credentials(format!("metadata server unreachable: {}", e)))?;

    if !response.status().is_success() {
        return Err(StoreError::Credentials(format!(
            "metadata server returned {} for project id",
            response.status()
        )));
    }

    let project_id = response
        .text()
        .await
        .map_err(|e| StoreError::Credentials(e.to_string()))?;
    Ok(project_id.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_token_expires_with_margin() {
        let now = Utc::now();
        let token = CachedToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(EXPIRY_MARGIN_SECS + 5),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(10)));
    }

    #[test]
    fn service_account_key_defaults_token_uri() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"client_email": "svc@p.iam.gserviceaccount.com", "private_key": "pem"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert!(key.project_id.is_none());
    }

    #[test]
    fn credentials_file_is_told_apart_by_type() {
        let user: CredentialsFile = serde_json::from_str(
            r#"{
                "type": "authorized_user",
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "secret",
                "refresh_token": "1//refresh",
                "quota_project_id": "schools-dev"
            }"#,
        )
        .unwrap();
        assert_eq!(user.project_id(), Some("schools-dev"));
        let source = user.into_source().unwrap();
        assert_eq!(source.name(), "authorized_user");
        match source {
            TokenSource::AuthorizedUser(user) => assert_eq!(user.token_uri, DEFAULT_TOKEN_URI),
            _ => panic!("expected authorized user source"),
        }

        let unknown = serde_json::from_str::<CredentialsFile>(r#"{"type": "external_account"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn rejects_unparseable_private_key() {
        let key = ServiceAccountKey {
            client_email: "svc@p.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            private_key_id: None,
            project_id: Some("p".to_string()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        };
        assert!(matches!(
            TokenSource::service_account(key),
            Err(StoreError::Credentials(_))
        ));
    }

    #[tokio::test]
    async fn emulator_uses_owner_token() {
        let provider = TokenProvider::new(TokenSource::Emulator, Client::new());
        assert_eq!(provider.token().await.unwrap(), "owner");
    }
}
