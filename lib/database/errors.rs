use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    DB(#[from] sea_orm::DbErr),
}

/// Client-side pagination problems. These are always the caller's fault and
/// map to a bad request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("invalid order '{0}': direction must be ASC or DESC")]
    InvalidOrderDirection(String),

    #[error("cannot order by '{0}'")]
    InvalidOrderColumn(String),

    #[error("malformed cursor")]
    MalformedCursor,

    #[error("order must contain at least one column")]
    EmptyOrder,

    #[error("page size must be at least 1")]
    ZeroTake,
}
