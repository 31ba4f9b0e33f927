use crate::services::store::{Record, RecordError};
use serde::{Deserialize, Serialize};

/// Stored field names. The casing differs from the API model on purpose.
pub mod fields {
    pub const CLASS: &str = "class";
    pub const CHAPTER: &str = "Chapter";
    pub const VIDEO_URL: &str = "video_url";
    pub const AUDIO_URL: &str = "audio_url";
}

/// Query parameters of `GET /chapter`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChapterQuery {
    pub class_number: i64,
    pub chapter_number: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterResponse {
    pub class_number: i64,
    pub chapter_number: i64,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
}

/// Document id of a chapter, e.g. `class9chapter1`.
pub fn chapter_document_id(class_number: i64, chapter_number: i64) -> String {
    format!("class{}chapter{}", class_number, chapter_number)
}

impl ChapterResponse {
    /// Maps a stored chapter onto the API model, falling back to the
    /// requested numbers when the record omits them.
    pub fn from_record(
        record: &Record,
        class_number: i64,
        chapter_number: i64,
    ) -> Result<Self, RecordError> {
        Ok(Self {
            class_number: record.get_i64_or(fields::CLASS, class_number)?,
            chapter_number: record.get_i64_or(fields::CHAPTER, chapter_number)?,
            video_url: record.get_optional_str(fields::VIDEO_URL)?,
            audio_url: record.get_optional_str(fields::AUDIO_URL)?,
        })
    }
}
