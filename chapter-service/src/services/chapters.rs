use crate::models::{chapter_document_id, ChapterResponse};
use crate::services::metrics::record_lookup;
use crate::services::store::DocumentStore;
use service_core::error::AppError;
use std::sync::Arc;

/// Chapter lookups against the configured collection.
///
/// The store handle is optional: when Firestore could not be initialised at
/// startup the service keeps running and every lookup reports 503.
#[derive(Clone)]
pub struct ChapterService {
    store: Option<Arc<dyn DocumentStore>>,
    collection: String,
}

impl ChapterService {
    pub fn new(store: Option<Arc<dyn DocumentStore>>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_chapter(
        &self,
        class_number: i64,
        chapter_number: i64,
    ) -> Result<ChapterResponse, AppError> {
        let Some(store) = &self.store else {
            record_lookup("unavailable");
            return Err(AppError::ServiceUnavailable(
                "Firestore not initialized".to_string(),
            ));
        };

        let document_id = chapter_document_id(class_number, chapter_number);

        let record = match store.get_document(&self.collection, &document_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!(%document_id, "Chapter not found");
                record_lookup("not_found");
                return Err(AppError::NotFound(anyhow::anyhow!(
                    "Chapter {} not found for class {}",
                    chapter_number,
                    class_number
                )));
            }
            Err(e) => return Err(fetch_failed(&document_id, e)),
        };

        let response = ChapterResponse::from_record(&record, class_number, chapter_number)
            .map_err(|e| fetch_failed(&document_id, e))?;

        record_lookup("found");
        Ok(response)
    }
}

fn fetch_failed<E>(document_id: &str, err: E) -> AppError
where
    E: std::error::Error + Send + Sync + 'static,
{
    tracing::error!(document_id, error = %err, "Error fetching chapter");
    record_lookup("error");
    AppError::InternalError(anyhow::Error::new(err).context("Error fetching chapter"))
}
