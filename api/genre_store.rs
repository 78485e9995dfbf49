use chrono::Utc;
use lib::prelude::*;
use sea_orm::{
    ActiveModelTrait,
    DbErr,
    EntityTrait,
    QueryOrder,
    Set,
    SqlErr,
};
use thiserror::Error;

use crate::db_model::{genres, Genre, Genres};

#[derive(Error, Debug)]
pub enum GenreStoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("genre '{0}' already exists")]
    DuplicateName(String),
}

impl From<DbErr> for GenreStoreError {
    fn from(value: DbErr) -> Self {
        Self::Database(value.into())
    }
}

#[derive(Clone)]
pub struct GenreStore {
    db: Database,
}

impl GenreStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: String) -> Result<Genre, GenreStoreError> {
        let now = Utc::now();
        let model = genres::ActiveModel {
            name: Set(name.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        model
            .insert(&self.db.orm)
            .await
            .map_err(|e| map_unique(e, name))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Genre>, GenreStoreError> {
        Ok(Genres::find_by_id(id).one(&self.db.orm).await?)
    }

    pub async fn list(&self) -> Result<Vec<Genre>, GenreStoreError> {
        let res = Genres::find()
            .order_by_asc(genres::Column::Id)
            .all(&self.db.orm)
            .await?;
        Ok(res)
    }

    pub async fn rename(
        &self,
        id: i32,
        name: String,
    ) -> Result<Option<Genre>, GenreStoreError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        let mut model: genres::ActiveModel = existing.into();
        model.name = Set(name.clone());
        model.updated_at = Set(Utc::now());
        let updated = model
            .update(&self.db.orm)
            .await
            .map_err(|e| map_unique(e, name))?;
        Ok(Some(updated))
    }

    /// Links to movies go away with the genre.
    pub async fn delete(&self, id: i32) -> Result<bool, GenreStoreError> {
        let res = Genres::delete_by_id(id).exec(&self.db.orm).await?;
        Ok(res.rows_affected > 0)
    }
}

fn map_unique(err: DbErr, name: String) -> GenreStoreError {
    match err.sql_err() {
        | Some(SqlErr::UniqueConstraintViolation(_)) => {
            GenreStoreError::DuplicateName(name)
        }
        | _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_genre_store() -> anyhow::Result<()> {
        let db = Database::in_memory().await?;
        let store = GenreStore::new(db);

        let drama = store.create("drama".into()).await?;
        let scifi = store.create("sci-fi".into()).await?;

        assert!(matches!(
            store.create("drama".into()).await,
            Err(GenreStoreError::DuplicateName(name)) if name == "drama"
        ));
        assert!(matches!(
            store.rename(scifi.id, "drama".into()).await,
            Err(GenreStoreError::DuplicateName(_))
        ));

        let renamed = store.rename(scifi.id, "science fiction".into()).await?;
        assert_eq!(Some("science fiction"), renamed.as_ref().map(|g| g.name.as_str()));
        assert_eq!(None, store.rename(42, "nope".into()).await?);

        assert_eq!(
            vec!["drama", "science fiction"],
            store
                .list()
                .await?
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
        );
        assert!(store.delete(drama.id).await?);
        assert_eq!(None, store.get(drama.id).await?);
        Ok(())
    }
}
