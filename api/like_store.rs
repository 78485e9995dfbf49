use lib::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
    DatabaseTransaction,
    DbErr,
    EntityTrait,
    QueryFilter,
    Set,
    SqlErr,
    TransactionTrait,
};
use thiserror::Error;
use tracing::debug;

use crate::db_model::movie_user_likes::{self, LikeState, Reaction};
use crate::db_model::{movies, MovieUserLikes, Movies, Users};

#[derive(Error, Debug)]
pub enum LikeError {
    #[error("movie {0} doesn't exist")]
    MovieNotFound(i32),
    #[error("user {0} doesn't exist")]
    UserNotFound(i32),
    /// Another toggle for the same (movie, user) won the race to insert.
    #[error("concurrent reaction update")]
    Conflict,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<DbErr> for LikeError {
    fn from(value: DbErr) -> Self {
        match value.sql_err() {
            | Some(SqlErr::UniqueConstraintViolation(_)) => LikeError::Conflict,
            | _ => LikeError::Database(value.into()),
        }
    }
}

#[derive(Clone)]
pub struct LikeStore {
    db: Database,
}

impl LikeStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Applies `reaction` for the user on the movie and returns the new
    /// state. A lost race on the unique (movie, user) index is retried once
    /// with a fresh read.
    pub async fn toggle(
        &self,
        movie_id: i32,
        user_id: i32,
        reaction: Reaction,
    ) -> Result<LikeState, LikeError> {
        let first = self.try_toggle(movie_id, user_id, reaction).await;
        self.retry_on_conflict(first, movie_id, user_id, reaction)
            .await
    }

    async fn retry_on_conflict(
        &self,
        attempt: Result<LikeState, LikeError>,
        movie_id: i32,
        user_id: i32,
        reaction: Reaction,
    ) -> Result<LikeState, LikeError> {
        match attempt {
            | Err(LikeError::Conflict) => {
                debug!(movie_id, user_id, "Reaction conflict, retrying once");
                self.try_toggle(movie_id, user_id, reaction).await
            }
            | res => res,
        }
    }

    pub async fn state(
        &self,
        movie_id: i32,
        user_id: i32,
    ) -> Result<LikeState, LikeError> {
        let record = find_record(&self.db.orm, movie_id, user_id).await?;
        Ok(LikeState::from_record(record.as_ref()))
    }

    async fn try_toggle(
        &self,
        movie_id: i32,
        user_id: i32,
        reaction: Reaction,
    ) -> Result<LikeState, LikeError> {
        let txn = self.db.orm.begin().await?;

        if Movies::find_by_id(movie_id).one(&txn).await?.is_none() {
            return Err(LikeError::MovieNotFound(movie_id));
        }
        if Users::find_by_id(user_id).one(&txn).await?.is_none() {
            return Err(LikeError::UserNotFound(user_id));
        }

        let record = find_record(&txn, movie_id, user_id).await?;
        apply_reaction(txn, movie_id, user_id, reaction, record).await
    }
}

/// Moves `record` (the reaction as last read) to its next state and commits.
/// Fails with [`LikeError::Conflict`] when another writer inserted a record
/// for the same pair after the read.
async fn apply_reaction(
    txn: DatabaseTransaction,
    movie_id: i32,
    user_id: i32,
    reaction: Reaction,
    record: Option<movie_user_likes::Model>,
) -> Result<LikeState, LikeError> {
    let current = LikeState::from_record(record.as_ref());
    let next = current.toggle(reaction);

    match (record, next.is_like()) {
        | (None, Some(is_like)) => {
            movie_user_likes::ActiveModel {
                movie_id: Set(movie_id),
                user_id: Set(user_id),
                is_like: Set(is_like),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        | (Some(record), Some(is_like)) => {
            let mut record: movie_user_likes::ActiveModel = record.into();
            record.is_like = Set(is_like);
            record.update(&txn).await?;
        }
        | (Some(record), None) => {
            MovieUserLikes::delete_by_id(record.id).exec(&txn).await?;
        }
        | (None, None) => {}
    }

    adjust_counts(&txn, movie_id, current.count_delta(next)).await?;
    txn.commit().await?;
    Ok(next)
}

async fn find_record<C: sea_orm::ConnectionTrait>(
    conn: &C,
    movie_id: i32,
    user_id: i32,
) -> Result<Option<movie_user_likes::Model>, DbErr> {
    MovieUserLikes::find()
        .filter(movie_user_likes::Column::MovieId.eq(movie_id))
        .filter(movie_user_likes::Column::UserId.eq(user_id))
        .one(conn)
        .await
}

async fn adjust_counts(
    txn: &DatabaseTransaction,
    movie_id: i32,
    (likes, dislikes): (i32, i32),
) -> Result<(), DbErr> {
    if likes == 0 && dislikes == 0 {
        return Ok(());
    }
    Movies::update_many()
        .col_expr(
            movies::Column::LikeCount,
            Expr::col(movies::Column::LikeCount).add(likes),
        )
        .col_expr(
            movies::Column::DislikeCount,
            Expr::col(movies::Column::DislikeCount).add(dislikes),
        )
        .filter(movies::Column::Id.eq(movie_id))
        .exec(txn)
        .await?;
    Ok(())
}
