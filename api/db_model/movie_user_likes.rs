use sea_orm::entity::prelude::*;

/// A user's reaction to a movie. Unique on `(movie_id, user_id)`; a missing
/// row means the user is neutral.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "movie_user_likes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub movie_id: i32,
    pub user_id: i32,
    pub is_like: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::movies::Entity",
        from = "Column::MovieId",
        to = "super::movies::Column::Id"
    )]
    Movie,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::movies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movie.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            | Reaction::Like => "like",
            | Reaction::Dislike => "dislike",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeState {
    Neutral,
    Liked,
    Disliked,
}

impl LikeState {
    pub fn from_record(record: Option<&Model>) -> Self {
        match record {
            | None => LikeState::Neutral,
            | Some(r) if r.is_like => LikeState::Liked,
            | Some(_) => LikeState::Disliked,
        }
    }

    /// Repeating the reaction that produced the current state clears it,
    /// the opposite reaction flips it.
    pub fn toggle(self, reaction: Reaction) -> Self {
        match (self, reaction) {
            | (LikeState::Neutral, Reaction::Like) => LikeState::Liked,
            | (LikeState::Neutral, Reaction::Dislike) => LikeState::Disliked,
            | (LikeState::Liked, Reaction::Like) => LikeState::Neutral,
            | (LikeState::Liked, Reaction::Dislike) => LikeState::Disliked,
            | (LikeState::Disliked, Reaction::Like) => LikeState::Liked,
            | (LikeState::Disliked, Reaction::Dislike) => LikeState::Neutral,
        }
    }

    pub fn is_like(self) -> Option<bool> {
        match self {
            | LikeState::Neutral => None,
            | LikeState::Liked => Some(true),
            | LikeState::Disliked => Some(false),
        }
    }

    /// Change to `(like_count, dislike_count)` when moving from `self` to
    /// `next`.
    pub fn count_delta(self, next: LikeState) -> (i32, i32) {
        let weight = |s: LikeState| {
            match s {
                | LikeState::Neutral => (0, 0),
                | LikeState::Liked => (1, 0),
                | LikeState::Disliked => (0, 1),
            }
        };
        let (from_l, from_d) = weight(self);
        let (to_l, to_d) = weight(next);
        (to_l - from_l, to_d - from_d)
    }
}
