use axum::response::IntoResponse;
use axum::Json;
use lib::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

// The query parameters for pagination and cursor management. `order` may be
// repeated: `?order=likeCount_DESC&order=id_DESC`.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct Pagination {
    pub cursor: Option<String>,
    #[serde(default)]
    pub order: Vec<String>,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub take: Option<u64>,
}

impl Pagination {
    /// Resolves against a decoded cursor. A missing `order` means the
    /// default order; `default_take` applies when `take` is absent.
    pub fn page_query(
        &self,
        default_take: u64,
    ) -> Result<PageQuery, PaginationError> {
        let order = (!self.order.is_empty()).then_some(self.order.as_slice());
        PageQuery::resolve(
            self.cursor.as_deref(),
            order,
            self.take.unwrap_or(default_take),
        )
    }
}

// An API model that handles formatting paginated responses into Json
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Paginated<T> {
    pub data: Vec<T>,
    pub next_cursor: Option<String>,
    pub count: u64,
}

impl<T> Paginated<T> {
    pub fn from<B>(page: PaginatedResponse<B>, count: u64) -> Self
    where
        B: Into<T>,
    {
        Self {
            data: page.data.into_iter().map(Into::into).collect(),
            next_cursor: page.next_cursor,
            count,
        }
    }
}

impl<T> IntoResponse for Paginated<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        (axum::http::StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination(order: &[&str], take: Option<u64>) -> Pagination {
        Pagination {
            cursor: None,
            order: order.iter().map(|s| s.to_string()).collect(),
            take,
        }
    }

    #[test]
    fn defaults_apply() {
        let page = pagination(&[], None).page_query(10).unwrap();
        assert_eq!(10, page.take);
        assert_eq!("id_DESC", page.order[0].to_string());
        assert!(page.after.is_none());
    }

    #[test]
    fn take_is_bounded() {
        assert!(pagination(&[], Some(0)).validate().is_err());
        assert!(pagination(&[], Some(101)).validate().is_err());
        assert!(pagination(&[], Some(100)).validate().is_ok());
    }

    #[test]
    fn bad_direction_is_rejected() {
        assert_eq!(
            Some(PaginationError::InvalidOrderDirection("id_asc".into())),
            pagination(&["id_asc"], None).page_query(10).err()
        );
    }
}
