pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_users;
mod m20240301_000002_create_directors_and_genres;
mod m20240301_000003_create_movies;
mod m20240301_000004_create_movie_user_likes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users::Migration),
            Box::new(m20240301_000002_create_directors_and_genres::Migration),
            Box::new(m20240301_000003_create_movies::Migration),
            Box::new(m20240301_000004_create_movie_user_likes::Migration),
        ]
    }
}
