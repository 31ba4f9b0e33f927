#![allow(dead_code)]

use async_trait::async_trait;
use chapter_service::config::{ChapterConfig, FirestoreConfig};
use chapter_service::services::{DocumentStore, InMemoryStore, Record, StoreError};
use chapter_service::startup::{build_router, AppState, Application};
use chapter_service::services::ChapterService;
use serde_json::json;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(store: Option<Arc<dyn DocumentStore>>) -> Self {
        let app = Application::build_with_store(test_config(), store)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn test_config() -> ChapterConfig {
    ChapterConfig {
        common: CoreConfig {
            api_host: "127.0.0.1".to_string(),
            api_port: 0, // Random port for testing
            ..CoreConfig::default()
        },
        firestore: FirestoreConfig::default(),
        database_url: None,
        openai_api_key: None,
    }
}

/// Router over the given store, for `oneshot` requests without a socket.
pub fn test_router(store: Option<Arc<dyn DocumentStore>>) -> axum::Router {
    let state = AppState {
        chapters: ChapterService::new(store, "content"),
    };
    build_router(state, &["*".to_string()])
}

/// Store holding `content/class9chapter1` and a record missing its numbers.
pub fn seeded_store() -> Arc<dyn DocumentStore> {
    let store = InMemoryStore::new()
        .with_document(
            "content",
            "class9chapter1",
            Record::from_value(json!({
                "class": 9,
                "Chapter": 1,
                "video_url": "http://x/v.mp4",
                "audio_url": null
            }))
            .unwrap(),
        )
        .with_document(
            "content",
            "class7chapter2",
            Record::from_value(json!({
                "video_url": "http://x/7-2.mp4",
                "audio_url": "http://x/7-2.mp3"
            }))
            .unwrap(),
        );
    Arc::new(store)
}

/// Store whose every read fails the way a dropped connection would.
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get_document(&self, _: &str, _: &str) -> Result<Option<Record>, StoreError> {
        Err(StoreError::Api {
            status: 503,
            message: "backend unavailable".to_string(),
        })
    }
}
