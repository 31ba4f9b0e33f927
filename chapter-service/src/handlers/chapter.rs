use crate::models::{ChapterQuery, ChapterResponse};
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use service_core::error::AppError;

/// `GET /chapter?class_number=9&chapter_number=1`
pub async fn get_chapter(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<ChapterQuery>, AppError>,
) -> Result<Json<ChapterResponse>, AppError> {
    let chapter = state
        .chapters
        .get_chapter(params.class_number, params.chapter_number)
        .await?;

    Ok(Json(chapter))
}
