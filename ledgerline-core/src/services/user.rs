//! User service - registration and credential checks
//!
//! Registration inserts the user and runs an after-create hook inside one
//! unit of work. A failing hook rolls the user back.

use std::future::Future;
use std::sync::{Arc, LazyLock};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use futures::future::BoxFuture;
use futures::FutureExt;
use rand::Rng;
use regex::Regex;

use crate::domain::{Error, NewUser, Result, User};
use crate::ports::{LedgerDirectory, TaskDistributor, TransactionalStore, UserStore, VerifyEmailPayload};
use crate::services::unit_of_work::run_in_transaction;

/// Minimum length of a clear-text password
pub const MIN_PASSWORD_LEN: usize = 6;

/// Registration request
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl CreateUserParams {
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() || !self.username.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::invalid_input("username must be non-empty and alphanumeric"));
        }
        if self.full_name.trim().is_empty() {
            return Err(Error::invalid_input("full name is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_input(format!(
                "password must have at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if !is_valid_email(&self.email) {
            return Err(Error::invalid_input(format!("invalid email: {}", self.email)));
        }
        Ok(())
    }
}

// Dot-separated atoms on both sides of '@', at least two domain labels.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Hash a password into an Argon2id PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::thread_rng().gen();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::internal(format!("failed to encode salt: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::internal(format!("failed to hash password: {}", e)))
}

/// Check a password against a PHC string produced by [`hash_password`]
pub fn verify_password(password: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// After-create hook that enqueues the verification email
pub fn verify_email_hook(
    distributor: Arc<dyn TaskDistributor>,
) -> impl FnOnce(User) -> BoxFuture<'static, Result<()>> + Send + 'static {
    move |user| {
        async move {
            distributor
                .distribute_send_verify_email(VerifyEmailPayload {
                    username: user.username,
                    email: user.email,
                })
                .await
        }
        .boxed()
    }
}

/// Service for user registration
pub struct UserService<S> {
    store: Arc<S>,
}

impl<S> UserService<S>
where
    S: TransactionalStore + LedgerDirectory,
    S::UnitOfWork: UserStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register a user without any follow-up work
    pub async fn create_user(&self, params: CreateUserParams) -> Result<User> {
        self.create_user_with(params, |_| async { Ok(()) }).await
    }

    /// Register a user and run `after_create` in the same unit of work
    pub async fn create_user_with<H, Fut>(&self, params: CreateUserParams, after_create: H) -> Result<User>
    where
        H: FnOnce(User) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        params.validate()?;
        let new_user = NewUser {
            username: params.username,
            hashed_password: hash_password(&params.password)?,
            full_name: params.full_name.trim().to_string(),
            email: params.email,
        };

        let user = run_in_transaction(self.store.as_ref(), move |tx| {
            async move {
                let user = tx.create_user(new_user).await?;
                after_create(user.clone()).await?;
                Ok(user)
            }
            .boxed()
        })
        .await?;

        tracing::info!(username = %user.username, "user created");
        Ok(user)
    }

    /// Look a user up and check the password; NotFound covers both failures
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .store
            .get_user(username)
            .await?
            .ok_or_else(|| Error::not_found(format!("user {}", username)))?;

        if !verify_password(password, &user.hashed_password) {
            tracing::debug!(username = %username, "password mismatch");
            return Err(Error::not_found(format!("user {}", username)));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::channel::{ChannelTaskDistributor, Task};
    use crate::adapters::memory::InMemoryLedgerStore;
    use crate::domain::ErrorKind;

    fn params(username: &str, email: &str) -> CreateUserParams {
        CreateUserParams {
            username: username.to_string(),
            full_name: "Test User".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(params("alice", "alice@example.com").validate().is_ok());
        assert!(params("", "alice@example.com").validate().is_err());
        assert!(params("al ice", "alice@example.com").validate().is_err());
        assert!(params("alice", "alice.example.com").validate().is_err());
        assert!(params("alice", "alice@localhost").validate().is_err());
        assert!(params("alice", "a@b..c").validate().is_err());
        assert!(params("alice", ".alice@example.com").validate().is_err());
        assert!(params("alice", "alice.@example.com").validate().is_err());
        assert!(params("alice", "alice@-example.com").validate().is_err());
        assert!(params("alice", "alice@@example.com").validate().is_err());
        assert!(params("alice", "alice.smith+ledger@mail.example.com").validate().is_ok());

        let mut short = params("alice", "alice@example.com");
        short.password = "12345".to_string();
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_hash_round_trip() {
        let hashed = hash_password("secret123").unwrap();
        assert!(hashed.starts_with("$argon2id$"));
        assert!(verify_password("secret123", &hashed));
        assert!(!verify_password("secret124", &hashed));
        assert!(!verify_password("secret123", "not a phc string"));
    }

    #[tokio::test]
    async fn test_create_and_verify() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let service = UserService::new(Arc::clone(&store));

        let user = service
            .create_user(params("alice", "alice@example.com"))
            .await
            .unwrap();
        assert_ne!(user.hashed_password, "secret123");

        let verified = service.verify_credentials("alice", "secret123").await.unwrap();
        assert_eq!(verified.email, "alice@example.com");

        let err = service.verify_credentials("alice", "wrong!!").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_constraint() {
        let service = UserService::new(Arc::new(InMemoryLedgerStore::new()));
        service
            .create_user(params("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = service
            .create_user(params("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[tokio::test]
    async fn test_failing_hook_rolls_user_back() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let service = UserService::new(Arc::clone(&store));

        let err = service
            .create_user_with(params("bob", "bob@example.com"), |_| async {
                Err(Error::queue("queue unavailable"))
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("queue unavailable"));
        assert!(store.get_user("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closed_task_queue_rolls_user_back() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let service = UserService::new(Arc::clone(&store));
        let (distributor, tasks) = ChannelTaskDistributor::new();
        drop(tasks);

        let err = service
            .create_user_with(
                params("dave", "dave@example.com"),
                verify_email_hook(Arc::new(distributor)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Queue(_)), "got {:?}", err);
        assert!(store.get_user("dave").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_email_hook_enqueues_task() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let service = UserService::new(Arc::clone(&store));
        let (distributor, mut tasks) = ChannelTaskDistributor::new();

        service
            .create_user_with(
                params("carol", "carol@example.com"),
                verify_email_hook(Arc::new(distributor)),
            )
            .await
            .unwrap();

        match tasks.recv().await {
            Some(Task::SendVerifyEmail(payload)) => {
                assert_eq!(payload.username, "carol");
                assert_eq!(payload.email, "carol@example.com");
            }
            other => panic!("unexpected task: {:?}", other),
        }
    }
}
