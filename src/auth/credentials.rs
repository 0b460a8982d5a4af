use std::sync::Arc;
use validator::Validate;

use super::password::{hash_password, verify_password};
use crate::db::Store;
use crate::error::AppError;
use crate::models::{User, UserInput};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Account creation and password login.
pub struct Accounts {
    store: Arc<dyn Store>,
    password_cost: u32,
}

impl Accounts {
    pub fn new(store: Arc<dyn Store>, password_cost: u32) -> Self {
        Self {
            store,
            password_cost,
        }
    }

    /// Validates `input`, hashes the password, and stores the new user.
    ///
    /// Fails with `AppError::Validation` on malformed fields or an email already in use.
    pub async fn create_user(&self, input: UserInput) -> Result<User, AppError> {
        input.validate()?;

        if self.store.find_user_by_email(&input.email).await?.is_some() {
            return Err(AppError::Validation("Email already registered".into()));
        }

        let password_hash = hash_password(&input.password, self.password_cost)?;
        let user = User::new(input.email, password_hash);
        self.store.insert_user(&user).await?;

        log::info!("Created user {}", user.id);
        Ok(user)
    }

    /// Finds the user with exactly this email and checks the password.
    ///
    /// Unknown email and wrong password produce the same `AppError::Authentication`.
    pub async fn find_by_credentials(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.into()))?;

        if !verify_password(password, &user.password_hash)? {
            log::debug!("Password mismatch for user {}", user.id);
            return Err(AppError::Authentication(INVALID_CREDENTIALS.into()));
        }
        Ok(user)
    }
}
