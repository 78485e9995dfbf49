use lib::database::PaginatedEntity;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub title: String,
    #[sea_orm(unique)]
    pub detail_id: i32,
    pub director_id: i32,
    pub creator_id: Option<i32>,
    pub movie_file_path: String,
    pub like_count: i32,
    pub dislike_count: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::movie_details::Entity",
        from = "Column::DetailId",
        to = "super::movie_details::Column::Id"
    )]
    Detail,
    #[sea_orm(
        belongs_to = "super::directors::Entity",
        from = "Column::DirectorId",
        to = "super::directors::Column::Id"
    )]
    Director,
    #[sea_orm(has_many = "super::movie_genres::Entity")]
    MovieGenres,
    #[sea_orm(has_many = "super::movie_user_likes::Entity")]
    Likes,
}

impl Related<super::movie_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Detail.def()
    }
}

impl Related<super::directors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Director.def()
    }
}

impl Related<super::genres::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_genres::Relation::Genre.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_genres::Relation::Movie.def().rev())
    }
}

impl Related<super::movie_user_likes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl PaginatedEntity for Entity {
    fn sort_column(key: &str) -> Option<Column> {
        match key {
            | "id" => Some(Column::Id),
            | "title" => Some(Column::Title),
            | "likeCount" => Some(Column::LikeCount),
            | "dislikeCount" => Some(Column::DislikeCount),
            | _ => None,
        }
    }
}
