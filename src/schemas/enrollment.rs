use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::progress::ProgressSnapshot;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CompleteContentRequest {
    #[serde(alias = "contentId")]
    #[validate(length(min = 1, message = "content_id must not be empty"))]
    pub(crate) content_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressResponse {
    pub(crate) progress: i32,
    pub(crate) completed_content: Vec<String>,
    pub(crate) total_content: usize,
}

impl From<ProgressSnapshot> for ProgressResponse {
    fn from(snapshot: ProgressSnapshot) -> Self {
        Self {
            progress: snapshot.progress,
            completed_content: snapshot.completed_content,
            total_content: snapshot.total_content,
        }
    }
}
