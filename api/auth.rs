use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{
    decode,
    encode,
    Algorithm,
    DecodingKey,
    EncodingKey,
    Header,
    Validation,
};
use lib::ApiConfig;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::db_model::users::Role;
use crate::db_model::User;
use crate::errors::ApiError;
use crate::token_blocklist::TokenBlocklist;
use crate::user_store::{UserStore, UserStoreError};

// Tolerated clock skew when checking `exp`.
const EXPIRY_LEEWAY_S: u64 = 60;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("user store error: {0}")]
    Store(#[from] UserStoreError),
    #[error("auth failed: {0}")]
    AuthFailed(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            | AuthError::Store(UserStoreError::DuplicateEmail(email)) => {
                ApiError::BadRequest(format!(
                    "'{email}' is already registered"
                ))
            }
            | AuthError::Store(e) => {
                error!("{}", e);
                ApiError::ServiceUnavailable
            }
            | AuthError::Internal(e) => {
                error!("{}", e);
                ApiError::ServiceUnavailable
            }
            | AuthError::AuthFailed(reason) => {
                debug!(reason, "Authentication failed");
                ApiError::Unauthorized
            }
            | AuthError::BadRequest(msg) => ApiError::BadRequest(msg),
        }
    }
}

pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(format!("hashing failed: {e}")))
}

pub fn verify_password(plain: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::Internal(format!("bad stored hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub role: Role,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies HS256 tokens. Access and refresh tokens use different
/// secrets so one can't pass as the other.
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: String,
    refresh_secret: String,
    access_ttl_s: i64,
    refresh_ttl_s: i64,
}

impl TokenIssuer {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl_s: config.access_token_ttl_s as i64,
            refresh_ttl_s: config.refresh_token_ttl_s as i64,
        }
    }

    fn secret(&self, token_type: TokenType) -> &[u8] {
        match token_type {
            | TokenType::Access => self.access_secret.as_bytes(),
            | TokenType::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    pub fn issue(
        &self,
        user_id: i32,
        role: Role,
        token_type: TokenType,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = match token_type {
            | TokenType::Access => self.access_ttl_s,
            | TokenType::Refresh => self.refresh_ttl_s,
        };
        let claims = Claims {
            sub: user_id,
            role,
            token_type,
            iat: now,
            exp: now + ttl,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret(token_type)),
        )
        .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    pub fn verify(
        &self,
        token: &str,
        expected: TokenType,
    ) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = EXPIRY_LEEWAY_S;
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(expected)),
            &validation,
        )
        .map_err(|e| AuthError::AuthFailed(e.to_string()))?
        .claims;
        if claims.token_type != expected {
            return Err(AuthError::AuthFailed(format!(
                "expected a {expected:?} token"
            )));
        }
        Ok(claims)
    }

    /// Verifies a token of either type.
    pub fn verify_any(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token, TokenType::Access)
            .or_else(|_| self.verify(token, TokenType::Refresh))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub email: String,
    pub password: String,
}

/// Splits `Authorization: <scheme> <content>`, insisting on `scheme`.
pub fn authorization_content<'a>(
    headers: &'a HeaderMap,
    scheme: &str,
) -> Result<Option<&'a str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| {
        AuthError::BadRequest("Authorization header is not valid UTF-8".into())
    })?;
    match value.split_once(' ') {
        | Some((name, content)) if name == scheme && !content.is_empty() => {
            Ok(Some(content))
        }
        | _ => {
            Err(AuthError::BadRequest(format!(
                "Authorization header is malformed, please use \
                 `Authorization: {scheme} ...`"
            )))
        }
    }
}

pub fn parse_basic(headers: &HeaderMap) -> Result<BasicCredentials, AuthError> {
    let content = authorization_content(headers, "Basic")?
        .ok_or_else(|| AuthError::AuthFailed("missing credentials".into()))?;
    let malformed =
        || AuthError::BadRequest("Basic credentials are malformed".into());
    let decoded = STANDARD.decode(content).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (email, password) = decoded.split_once(':').ok_or_else(malformed)?;
    if email.is_empty() || password.is_empty() {
        return Err(malformed());
    }
    Ok(BasicCredentials {
        email: email.to_owned(),
        password: password.to_owned(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct Authenticator {
    users: UserStore,
    tokens: TokenIssuer,
    blocked: TokenBlocklist,
}

impl Authenticator {
    pub fn new(users: UserStore, tokens: TokenIssuer) -> Self {
        Self {
            users,
            tokens,
            blocked: TokenBlocklist::new(),
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(
        &self,
        creds: BasicCredentials,
    ) -> Result<User, AuthError> {
        let hash = hash_password(&creds.password)?;
        Ok(self.users.create(creds.email, hash, Role::User).await?)
    }

    pub async fn login(
        &self,
        creds: &BasicCredentials,
    ) -> Result<TokenPair, AuthError> {
        let Some(user) = self.users.find_by_email(&creds.email).await? else {
            return Err(AuthError::AuthFailed("unknown email".into()));
        };
        if !verify_password(&creds.password, &user.password)? {
            return Err(AuthError::AuthFailed("wrong password".into()));
        }
        Ok(TokenPair {
            access_token: self.tokens.issue(
                user.id,
                user.role,
                TokenType::Access,
            )?,
            refresh_token: self.tokens.issue(
                user.id,
                user.role,
                TokenType::Refresh,
            )?,
        })
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn rotate_access(
        &self,
        refresh_token: &str,
    ) -> Result<String, AuthError> {
        let claims = self.verify_unblocked(refresh_token, TokenType::Refresh)?;
        // The role may have changed since the refresh token was minted.
        let Some(user) = self.users.get(claims.sub).await? else {
            return Err(AuthError::AuthFailed("user no longer exists".into()));
        };
        self.tokens.issue(user.id, user.role, TokenType::Access)
    }

    /// Checks a bearer access token, rejecting revoked ones.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_unblocked(token, TokenType::Access)
    }

    /// Revokes a token of either type until it expires.
    pub async fn block(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.tokens.verify_any(token)?;
        self.blocked
            .block(token, claims.exp + EXPIRY_LEEWAY_S as i64)
            .await;
        Ok(claims)
    }

    fn verify_unblocked(
        &self,
        token: &str,
        expected: TokenType,
    ) -> Result<Claims, AuthError> {
        if self.blocked.is_blocked(token) {
            return Err(AuthError::AuthFailed("token is blocked".into()));
        }
        self.tokens.verify(token, expected)
    }
}
