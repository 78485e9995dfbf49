use chrono::{NaiveDate, Utc};
use lib::prelude::*;
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
    Set,
};

use crate::db_model::{directors, movies, Director, Directors, Movies};

pub type DirectorStoreError = DatabaseError;

#[derive(Debug, Default, Clone)]
pub struct DirectorChanges {
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub nationality: Option<String>,
}

#[derive(Clone)]
pub struct DirectorStore {
    db: Database,
}

impl DirectorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        name: String,
        dob: NaiveDate,
        nationality: String,
    ) -> Result<Director, DirectorStoreError> {
        let now = Utc::now();
        let model = directors::ActiveModel {
            name: Set(name),
            dob: Set(dob),
            nationality: Set(nationality),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(model.insert(&self.db.orm).await?)
    }

    pub async fn get(
        &self,
        id: i32,
    ) -> Result<Option<Director>, DirectorStoreError> {
        Ok(Directors::find_by_id(id).one(&self.db.orm).await?)
    }

    pub async fn list(&self) -> Result<Vec<Director>, DirectorStoreError> {
        let res = Directors::find()
            .order_by_asc(directors::Column::Id)
            .all(&self.db.orm)
            .await?;
        Ok(res)
    }

    pub async fn update(
        &self,
        id: i32,
        changes: DirectorChanges,
    ) -> Result<Option<Director>, DirectorStoreError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        let mut model: directors::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            model.name = Set(name);
        }
        if let Some(dob) = changes.dob {
            model.dob = Set(dob);
        }
        if let Some(nationality) = changes.nationality {
            model.nationality = Set(nationality);
        }
        model.updated_at = Set(Utc::now());
        Ok(Some(model.update(&self.db.orm).await?))
    }

    /// Number of movies still pointing at this director. A director can't be
    /// deleted while this is non-zero.
    pub async fn movie_count(&self, id: i32) -> Result<u64, DirectorStoreError> {
        let count = Movies::find()
            .filter(movies::Column::DirectorId.eq(id))
            .count(&self.db.orm)
            .await?;
        Ok(count)
    }

    pub async fn delete(&self, id: i32) -> Result<bool, DirectorStoreError> {
        let res = Directors::delete_by_id(id).exec(&self.db.orm).await?;
        Ok(res.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_director_store() -> anyhow::Result<()> {
        let db = Database::in_memory().await?;
        let store = DirectorStore::new(db);

        let dob = NaiveDate::from_ymd_opt(1970, 7, 30).unwrap();
        let nolan = store
            .create("Christopher Nolan".into(), dob, "UK".into())
            .await?;
        assert_eq!(Some(&nolan), store.get(nolan.id).await?.as_ref());

        let updated = store
            .update(
                nolan.id,
                DirectorChanges {
                    nationality: Some("UK/US".into()),
                    ..Default::default()
                },
            )
            .await?
            .unwrap();
        assert_eq!("UK/US", updated.nationality);
        assert_eq!(dob, updated.dob);

        assert_eq!(0, store.movie_count(nolan.id).await?);
        assert_eq!(1, store.list().await?.len());
        assert!(store.delete(nolan.id).await?);
        assert!(store.list().await?.is_empty());
        assert_eq!(None, store.update(nolan.id, Default::default()).await?);
        Ok(())
    }
}
