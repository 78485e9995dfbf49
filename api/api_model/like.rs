use serde::Serialize;

use crate::db_model::movie_user_likes::LikeState;

/// `isLike` is `null` when the user ended up neutral.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LikeResponse {
    pub is_like: Option<bool>,
}

impl From<LikeState> for LikeResponse {
    fn from(value: LikeState) -> Self {
        Self {
            is_like: value.is_like(),
        }
    }
}
