use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db_model::Director as DirectorModel;
use crate::director_store::DirectorChanges;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Director {
    pub id: i32,
    pub name: String,
    pub dob: NaiveDate,
    pub nationality: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DirectorModel> for Director {
    fn from(value: DirectorModel) -> Self {
        Self {
            id: value.id,
            name: value.name,
            dob: value.dob,
            nationality: value.nationality,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateDirectorRequest {
    #[validate(length(min = 1, message = "name can't be empty"))]
    pub name: String,
    /// `YYYY-MM-DD`
    pub dob: NaiveDate,
    #[validate(length(min = 1, message = "nationality can't be empty"))]
    pub nationality: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateDirectorRequest {
    #[validate(length(min = 1, message = "name can't be empty"))]
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    #[validate(length(min = 1, message = "nationality can't be empty"))]
    pub nationality: Option<String>,
}

impl From<UpdateDirectorRequest> for DirectorChanges {
    fn from(value: UpdateDirectorRequest) -> Self {
        Self {
            name: value.name,
            dob: value.dob,
            nationality: value.nationality,
        }
    }
}
