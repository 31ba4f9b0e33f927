//! Firestore document store over the REST API.

pub mod auth;
pub mod value;

use crate::config::FirestoreConfig;
use crate::services::store::{DocumentStore, Record, StoreError};
use async_trait::async_trait;
use auth::{CredentialsFile, TokenProvider, TokenSource};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

/// Firestore REST API base URL.
pub const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Project id used against the emulator when none is configured.
const EMULATOR_PROJECT: &str = "demo-project";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    database: String,
    tokens: TokenProvider,
}

impl FirestoreStore {
    /// Resolves credentials and builds the client. Nothing is read from the
    /// database here; a bad key or unreachable metadata server fails early,
    /// while network trouble on Firestore itself only shows up on the first read.
    pub async fn connect(config: &FirestoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Network(format!("failed to create HTTP client: {}", e)))?;

        if let Some(host) = &config.emulator_host {
            tracing::info!(emulator_host = %host, "Using Firestore emulator");
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| format!("http://{}/v1", host));
            let project_id = config
                .project_id
                .clone()
                .unwrap_or_else(|| EMULATOR_PROJECT.to_string());
            return Ok(Self::new(
                client,
                base_url,
                project_id,
                config.database.clone(),
                TokenSource::Emulator,
            ));
        }

        let credentials_file = config.credentials_file();
        tracing::info!(path = %credentials_file.display(), "Looking for Firebase credentials");

        let (source, project_id) = if credentials_file.exists() {
            tracing::info!("Found credentials file");
            from_credentials_file(&credentials_file, config).await?
        } else {
            tracing::warn!(
                path = %credentials_file.display(),
                "Credentials file not found, falling back to default credentials"
            );
            match config.well_known_credentials_file().filter(|path| path.exists()) {
                Some(path) => {
                    tracing::info!(path = %path.display(), "Using gcloud application default credentials");
                    from_credentials_file(&path, config).await?
                }
                None => {
                    let project_id = match &config.project_id {
                        Some(project_id) => project_id.clone(),
                        None => auth::metadata_project_id(&client).await?,
                    };
                    (TokenSource::Metadata, project_id)
                }
            }
        };

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| FIRESTORE_API_BASE.to_string());

        Ok(Self::new(
            client,
            base_url,
            project_id,
            config.database.clone(),
            source,
        ))
    }

    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        database: impl Into<String>,
        source: TokenSource,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            tokens: TokenProvider::new(source, client.clone()),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn credential_source(&self) -> &'static str {
        self.tokens.source().name()
    }

    /// Resource name of a document, as Firestore reports it in responses.
    pub fn document_name(&self, collection: &str, document_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.project_id, self.database, collection, document_id
        )
    }

    pub fn document_url(&self, collection: &str, document_id: &str) -> String {
        format!("{}/{}", self.base_url, self.document_name(collection, document_id))
    }
}

/// Loads a credentials file and settles the project id: config first, then the file.
async fn from_credentials_file(
    path: &Path,
    config: &FirestoreConfig,
) -> Result<(TokenSource, String), StoreError> {
    let credentials = CredentialsFile::from_file(path).await?;
    let project_id = config
        .project_id
        .clone()
        .or_else(|| credentials.project_id().map(str::to_string))
        .ok_or_else(|| {
            StoreError::Credentials(format!(
                "{} has no project id and GOOGLE_CLOUD_PROJECT is not set",
                path.display()
            ))
        })?;
    Ok((credentials.into_source()?, project_id))
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<Record>, StoreError> {
        let token = self.tokens.token().await?;
        let url = self.document_url(collection, document_id);

        tracing::debug!(collection, document_id, "Fetching Firestore document");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                // A missing database or project is also a 404; only a miss
                // on this exact document means "absent".
                let message = response.text().await.unwrap_or_default();
                let envelope: ErrorEnvelope = serde_json::from_str(&message).unwrap_or_default();
                if envelope
                    .error
                    .message
                    .contains(&self.document_name(collection, document_id))
                {
                    return Ok(None);
                }
                return Err(StoreError::Api {
                    status: StatusCode::NOT_FOUND.as_u16(),
                    message,
                });
            }
            status if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(StoreError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let document: FirestoreDocument = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        value::decode_fields(&document.fields).map(Some)
    }
}
