use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, Role, UpdateUser, User, UserFilter};
use crate::repository::UserRepository;

/// Service layer for staff accounts
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a staff account; the email is stored lowercased
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        let email = normalise_email(&input.email);
        validate_password(&input.password)?;

        if self.repository.get_by_email(&email).await?.is_some() {
            return Err(UserError::DuplicateEmail(email));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(email, input.name.trim().to_string(), password_hash, input.roles);

        self.repository.create(user).await
    }

    pub async fn get_user(&self, id: Uuid) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    pub async fn list_users(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        self.repository.list(filter).await
    }

    pub async fn update_user(&self, id: Uuid, input: UpdateUser) -> UserResult<User> {
        let mut user = self.get_user(id).await?;

        let new_password_hash = match input.password {
            Some(ref password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        user.apply_update(input, new_password_hash);
        self.repository.update(user).await
    }

    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        if !self.repository.delete(id).await? {
            return Err(UserError::NotFound(id));
        }
        Ok(())
    }

    /// Check a login attempt and stamp `last_login_at` on success.
    ///
    /// Unknown email, wrong password and inactive account all fail with
    /// [`UserError::InvalidCredentials`].
    pub async fn verify_credentials(&self, email: &str, password: &str) -> UserResult<User> {
        let email = normalise_email(email);
        let mut user = self
            .repository
            .get_by_email(&email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(UserError::InvalidCredentials);
        }

        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Login attempt on inactive account");
            return Err(UserError::InvalidCredentials);
        }

        let now = Utc::now();
        self.repository.record_login(user.id, now).await?;
        user.last_login_at = Some(now);

        Ok(user)
    }

    /// Create the first admin unless an account with `email` already exists.
    /// Returns the new account, or `None` when nothing was created.
    pub async fn ensure_bootstrap_admin(
        &self,
        email: &str,
        password: &str,
    ) -> UserResult<Option<User>> {
        let email = normalise_email(email);
        if self.repository.get_by_email(&email).await?.is_some() {
            tracing::debug!(email = %email, "Bootstrap admin already present");
            return Ok(None);
        }

        let user = self
            .create_user(CreateUser {
                email,
                name: "Administrator".to_string(),
                password: password.to_string(),
                roles: vec![Role::Admin],
            })
            .await?;

        tracing::info!(user_id = %user.id, "Bootstrap admin created");
        Ok(Some(user))
    }
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_password(password: &str) -> UserResult<()> {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(UserError::Validation(
            "Password must be between 8 and 128 characters".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
