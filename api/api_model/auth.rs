use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::TokenPair;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub refresh_token: String,
    pub access_token: String,
}

impl From<TokenPair> for LoginResponse {
    fn from(value: TokenPair) -> Self {
        Self {
            refresh_token: value.refresh_token,
            access_token: value.access_token,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub(crate) struct BlockTokenRequest {
    #[validate(length(min = 1))]
    pub token: String,
}
