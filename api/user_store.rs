use chrono::Utc;
use lib::prelude::*;
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
    DbErr,
    EntityTrait,
    QueryFilter,
    QueryOrder,
    Set,
    SqlErr,
};
use thiserror::Error;

use crate::db_model::users::{self, Role};
use crate::db_model::{User, Users};

#[derive(Error, Debug)]
pub enum UserStoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("a user with email '{0}' already exists")]
    DuplicateEmail(String),
}

impl From<DbErr> for UserStoreError {
    fn from(value: DbErr) -> Self {
        Self::Database(value.into())
    }
}

#[derive(Debug, Default, Clone)]
pub struct UserChanges {
    pub email: Option<String>,
    /// Already hashed.
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        email: String,
        password_hash: String,
        role: Role,
    ) -> Result<User, UserStoreError> {
        let now = Utc::now();
        let model = users::ActiveModel {
            email: Set(email.clone()),
            password: Set(password_hash),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        model
            .insert(&self.db.orm)
            .await
            .map_err(|e| map_unique(e, email))
    }

    pub async fn get(&self, id: i32) -> Result<Option<User>, UserStoreError> {
        Ok(Users::find_by_id(id).one(&self.db.orm).await?)
    }

    pub async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let res = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db.orm)
            .await?;
        Ok(res)
    }

    pub async fn list(&self) -> Result<Vec<User>, UserStoreError> {
        let res = Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.db.orm)
            .await?;
        Ok(res)
    }

    /// Returns `None` if the user doesn't exist.
    pub async fn update(
        &self,
        id: i32,
        changes: UserChanges,
    ) -> Result<Option<User>, UserStoreError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        let mut model: users::ActiveModel = existing.into();
        let mut new_email = None;
        if let Some(email) = changes.email {
            new_email = Some(email.clone());
            model.email = Set(email);
        }
        if let Some(password) = changes.password {
            model.password = Set(password);
        }
        if let Some(role) = changes.role {
            model.role = Set(role);
        }
        model.updated_at = Set(Utc::now());

        let updated = model
            .update(&self.db.orm)
            .await
            .map_err(|e| map_unique(e, new_email.unwrap_or_default()))?;
        Ok(Some(updated))
    }

    pub async fn delete(&self, id: i32) -> Result<bool, UserStoreError> {
        let res = Users::delete_by_id(id).exec(&self.db.orm).await?;
        Ok(res.rows_affected > 0)
    }
}

fn map_unique(err: DbErr, email: String) -> UserStoreError {
    match err.sql_err() {
        | Some(SqlErr::UniqueConstraintViolation(_)) => {
            UserStoreError::DuplicateEmail(email)
        }
        | _ => err.into(),
    }
}
