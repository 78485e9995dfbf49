pub mod cursor;
mod errors;
pub mod pagination;

pub use cursor::{Cursor, Direction, SortKey};
pub use errors::{DatabaseError, PaginationError};
use migration::{Migrator, MigratorTrait};
pub use pagination::{
    PageQuery,
    PaginatedEntity,
    PaginatedResponse,
    PaginatedSelect,
};
use sea_orm::TransactionTrait;

#[derive(Clone)]
pub struct Database {
    pub orm: sea_orm::DatabaseConnection,
}

impl Database {
    pub async fn connect(conn_string: &str) -> Result<Self, sea_orm::DbErr> {
        Ok(Self {
            orm: sea_orm::Database::connect(conn_string).await?,
        })
    }

    pub async fn in_memory() -> Result<Self, sea_orm::DbErr> {
        let conn = Self::connect("sqlite::memory:").await?;
        conn.migrate().await?;
        Ok(conn)
    }

    pub async fn migrate(&self) -> Result<(), sea_orm::DbErr> {
        let conn = self.orm.begin().await?;
        Migrator::up(&conn, None).await?;
        conn.commit().await?;
        Ok(())
    }
}
