use sea_orm_migration::prelude::*;

use crate::m20240301_000001_create_users::Users;
use crate::m20240301_000003_create_movies::Movies;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MovieUserLikes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MovieUserLikes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MovieUserLikes::MovieId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MovieUserLikes::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MovieUserLikes::IsLike)
                            .boolean()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("FK_movie_user_likes_movie")
                            .from(MovieUserLikes::Table, MovieUserLikes::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("FK_movie_user_likes_user")
                            .from(MovieUserLikes::Table, MovieUserLikes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one reaction per (movie, user). Concurrent toggles race on
        // this index.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("UQ_movie_user_likes_movie_user")
                    .table(MovieUserLikes::Table)
                    .col(MovieUserLikes::MovieId)
                    .col(MovieUserLikes::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MovieUserLikes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MovieUserLikes {
    Table,
    Id,
    MovieId,
    UserId,
    IsLike,
}
