// Users, API tokens, linked Meta accounts and uploaded 3D models.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User already exists")]
    UserExists,
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Invalid authentication credentials")]
    InvalidToken,
    #[error("Account store error: {0}")]
    Store(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn password_digest(&self, username: &str) -> Result<Option<String>, AccountError>;
    /// Returns false when the username is taken.
    async fn insert_user(&self, username: &str, digest: &str) -> Result<bool, AccountError>;
}

#[async_trait]
impl<U: UserStore + ?Sized> UserStore for std::sync::Arc<U> {
    async fn password_digest(&self, username: &str) -> Result<Option<String>, AccountError> {
        (**self).password_digest(username).await
    }

    async fn insert_user(&self, username: &str, digest: &str) -> Result<bool, AccountError> {
        (**self).insert_user(username, digest).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaLink {
    pub access_token: String,
    pub meta_user_id: String,
}

#[async_trait]
pub trait MetaTokenStore: Send + Sync {
    async fn save_link(&self, user_id: &str, link: &MetaLink) -> Result<(), AccountError>;
    async fn link(&self, user_id: &str) -> Result<Option<MetaLink>, AccountError>;
}

/// Argon2id digest in PHC string form.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Store(format!("password hashing failed: {e}")))
}

/// False for a wrong password and for a stored value that is not a PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, username: &str) -> Result<String, AccountError> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES)).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AccountError::Store(e.to_string()))
    }

    /// Returns the subject of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<String, AccountError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AccountError::InvalidToken)?;
        Ok(data.claims.sub)
    }
}

pub struct AccountService<U: UserStore> {
    users: U,
    tokens: TokenIssuer,
}

impl<U: UserStore> AccountService<U> {
    pub fn new(users: U, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), AccountError> {
        if username.trim().is_empty() {
            return Err(AccountError::InvalidCredentials);
        }
        let digest = hash_password(password)?;
        if !self.users.insert_user(username, &digest).await? {
            return Err(AccountError::UserExists);
        }
        tracing::info!(username, "Registered user");
        Ok(())
    }

    /// Creates the demo user when it does not exist yet.
    pub async fn ensure_user(&self, username: &str, password: &str) -> Result<(), AccountError> {
        match self.register(username, password).await {
            Ok(()) | Err(AccountError::UserExists) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String, AccountError> {
        let digest = self
            .users
            .password_digest(username)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;
        if !verify_password(password, &digest) {
            return Err(AccountError::InvalidCredentials);
        }
        self.tokens.issue(username)
    }

    /// Resolves a bearer token to a username that still exists.
    pub async fn authenticate(&self, token: &str) -> Result<String, AccountError> {
        let username = self.tokens.verify(token)?;
        match self.users.password_digest(&username).await? {
            Some(_) => Ok(username),
            None => Err(AccountError::InvalidToken),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserModel {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// Uploaded 3D models per user. Process memory only.
#[derive(Default)]
pub struct ModelRegistry {
    models: DashMap<String, Vec<UserModel>>,
}

impl ModelRegistry {
    pub fn add(&self, username: &str, name: &str, url: &str) -> UserModel {
        let model = UserModel {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            url: url.to_string(),
        };
        self.models
            .entry(username.to_string())
            .or_default()
            .push(model.clone());
        model
    }

    pub fn list(&self, username: &str) -> Vec<UserModel> {
        self.models
            .get(username)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryUsers {
        pub users: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl UserStore for MemoryUsers {
        async fn password_digest(&self, username: &str) -> Result<Option<String>, AccountError> {
            Ok(self.users.lock().unwrap().get(username).cloned())
        }

        async fn insert_user(&self, username: &str, digest: &str) -> Result<bool, AccountError> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(username) {
                return Ok(false);
            }
            users.insert(username.to_string(), digest.to_string());
            Ok(true)
        }
    }

    #[derive(Default)]
    pub struct MemoryLinks {
        pub links: Mutex<HashMap<String, MetaLink>>,
    }

    #[async_trait]
    impl MetaTokenStore for MemoryLinks {
        async fn save_link(&self, user_id: &str, link: &MetaLink) -> Result<(), AccountError> {
            self.links
                .lock()
                .unwrap()
                .insert(user_id.to_string(), link.clone());
            Ok(())
        }

        async fn link(&self, user_id: &str) -> Result<Option<MetaLink>, AccountError> {
            Ok(self.links.lock().unwrap().get(user_id).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryUsers;
    use super::*;

    fn service() -> AccountService<MemoryUsers> {
        AccountService::new(MemoryUsers::default(), TokenIssuer::new("test-secret"))
    }

    #[test]
    fn password_hashes_are_salted() {
        let a = hash_password("hunter2").unwrap();
        let b = hash_password("hunter2").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &a));
        assert!(!verify_password("hunter3", &a));
        assert!(!verify_password("hunter2", "no-separator"));
        assert!(!verify_password("hunter2", "salt$0123abcd"));
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let accounts = service();
        accounts.register("ana", "pw").await.unwrap();
        assert!(matches!(
            accounts.register("ana", "other").await,
            Err(AccountError::UserExists)
        ));

        let token = accounts.login("ana", "pw").await.unwrap();
        assert_eq!(accounts.authenticate(&token).await.unwrap(), "ana");
        assert!(matches!(
            accounts.login("ana", "nope").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn tokens_from_another_secret_are_rejected() {
        let accounts = service();
        accounts.ensure_user("demo", "password").await.unwrap();
        accounts.ensure_user("demo", "password").await.unwrap();

        let forged = TokenIssuer::new("other").issue("demo").unwrap();
        assert!(matches!(
            accounts.authenticate(&forged).await,
            Err(AccountError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_rejected() {
        let accounts = service();
        let token = TokenIssuer::new("test-secret").issue("ghost").unwrap();
        assert!(matches!(
            accounts.authenticate(&token).await,
            Err(AccountError::InvalidToken)
        ));
    }

    #[test]
    fn models_are_listed_per_user() {
        let registry = ModelRegistry::default();
        registry.add("ana", "chair.glb", "https://s3/chair");
        registry.add("ana", "lamp.glb", "https://s3/lamp");
        registry.add("bo", "desk.glb", "https://s3/desk");

        let models = registry.list("ana");
        assert_eq!(models.len(), 2);
        assert_eq!(models[1].name, "lamp.glb");
        assert!(registry.list("nobody").is_empty());
    }
}
