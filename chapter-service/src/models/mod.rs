pub mod chapter;

pub use chapter::{chapter_document_id, ChapterQuery, ChapterResponse};
