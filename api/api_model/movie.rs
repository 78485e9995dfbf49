use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use validator::Validate;

use super::{Director, Genre};
use crate::movie_store::{MovieChanges, MovieWithRelations, NewMovie};

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Movie {
    pub id: i32,
    pub title: String,
    pub detail: Option<String>,
    pub director: Option<Director>,
    pub genres: Vec<Genre>,
    pub movie_file_path: String,
    pub like_count: i32,
    pub dislike_count: i32,
    pub creator_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // Only set for authenticated listings. `Some(None)` is rendered as
    // `null`, the caller hasn't reacted to this movie.
    pub like_status: Option<Option<bool>>,
}

impl From<MovieWithRelations> for Movie {
    fn from(value: MovieWithRelations) -> Self {
        let MovieWithRelations {
            movie,
            detail,
            director,
            genres,
        } = value;
        Self {
            id: movie.id,
            title: movie.title,
            detail: detail.map(|d| d.detail),
            director: director.map(Into::into),
            genres: genres.into_iter().map(Into::into).collect(),
            movie_file_path: movie.movie_file_path,
            like_count: movie.like_count,
            dislike_count: movie.dislike_count,
            creator_id: movie.creator_id,
            created_at: movie.created_at,
            updated_at: movie.updated_at,
            like_status: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Validate)]
pub(crate) struct MoviesFilter {
    #[validate(length(min = 3, message = "title filter needs at least 3 characters"))]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct CreateMovieRequest {
    #[validate(length(min = 1, message = "title can't be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "detail can't be empty"))]
    pub detail: String,
    pub director_id: i32,
    #[validate(length(min = 1, message = "at least one genre is required"))]
    pub genre_ids: Vec<i32>,
    /// Name of the already stored video file.
    #[validate(length(min = 1, message = "movieFileName can't be empty"))]
    pub movie_file_name: String,
}

impl From<CreateMovieRequest> for NewMovie {
    fn from(value: CreateMovieRequest) -> Self {
        Self {
            title: value.title,
            detail: value.detail,
            director_id: value.director_id,
            genre_ids: value.genre_ids,
            movie_file_name: value.movie_file_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct UpdateMovieRequest {
    #[validate(length(min = 1, message = "title can't be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "detail can't be empty"))]
    pub detail: Option<String>,
    pub director_id: Option<i32>,
    #[validate(length(min = 1, message = "at least one genre is required"))]
    pub genre_ids: Option<Vec<i32>>,
}

impl From<UpdateMovieRequest> for MovieChanges {
    fn from(value: UpdateMovieRequest) -> Self {
        Self {
            title: value.title,
            detail: value.detail,
            director_id: value.director_id,
            genre_ids: value.genre_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn create_request_validation() {
        let req: CreateMovieRequest = serde_json::from_value(json!({
            "title": "Alien",
            "detail": "In space no one can hear you scream",
            "directorId": 1,
            "genreIds": [],
            "movieFileName": "alien.mp4",
        }))
        .unwrap();
        let err = req.validate().unwrap_err();
        assert!(err.field_errors().contains_key("genre_ids"));

        let unknown = serde_json::from_value::<CreateMovieRequest>(json!({
            "title": "Alien",
            "poster": "x",
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn short_title_filter() {
        let filter = MoviesFilter {
            title: Some("ab".into()),
        };
        assert!(filter.validate().is_err());
        assert!(MoviesFilter::default().validate().is_ok());
    }
}
