use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum_helpers::JwtAuth;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{self, NoopUserCache, UserCache};
use crate::error::{UserError, UserResult};
use crate::models::{
    Actor, CreateUser, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, DeleteResponse, ListQuery, LoginRequest,
    LoginResponse, MAX_PAGE_SIZE, Role, UpdateUser, User, UserListResponse,
};
use crate::repository::UserRepository;

/// Service layer for User business logic
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    cache: Arc<dyn UserCache>,
    auth: JwtAuth,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R, auth: JwtAuth) -> Self {
        Self {
            repository: Arc::new(repository),
            cache: Arc::new(NoopUserCache),
            auth,
        }
    }

    pub fn with_cache(mut self, cache: impl UserCache + 'static) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Register a user. Only an admin caller may pick a role other than `user`.
    pub async fn create_user(&self, input: CreateUser, actor: Option<&Actor>) -> UserResult<User> {
        validate_password(&input.password)?;

        let email = normalize_email(&input.email);
        if self.repository.email_exists(&email).await? {
            return Err(UserError::DuplicateEmail(email));
        }

        let role = match actor {
            Some(actor) if actor.is_admin() => input.role.unwrap_or_default(),
            _ => Role::User,
        };

        let password_hash = hash_password(&input.password)?;
        let user = User::new(email, input.first_name, input.last_name, password_hash, role);

        let created = self.repository.create(user).await?;
        self.cache.invalidate(cache::COUNT_KEY).await;
        Ok(created)
    }

    pub async fn get_user(&self, id: Uuid) -> UserResult<User> {
        let key = cache::user_key(id);
        if let Some(user) = self.cached::<User>(&key).await {
            return Ok(user);
        }

        let user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        self.store(&key, &user).await;
        Ok(user)
    }

    pub async fn list_users(&self, query: ListQuery) -> UserResult<UserListResponse> {
        let (page, page_size) = resolve_page(&query)?;

        let key = cache::list_key(page, page_size);
        if let Some(list) = self.cached::<UserListResponse>(&key).await {
            return Ok(list);
        }

        let data = self.repository.list(page, page_size).await?;
        let list = UserListResponse {
            data,
            page,
            page_size,
        };

        self.store(&key, &list).await;
        Ok(list)
    }

    pub async fn count_users(&self) -> UserResult<u64> {
        if let Some(count) = self.cached::<u64>(cache::COUNT_KEY).await {
            return Ok(count);
        }

        let count = self.repository.count().await?;
        self.store(cache::COUNT_KEY, &count).await;
        Ok(count)
    }

    /// Admins may update anyone; other users only themselves, without
    /// touching their role.
    pub async fn update_user(&self, actor: &Actor, id: Uuid, input: UpdateUser) -> UserResult<User> {
        if !actor.is_admin() && actor.user_id != id {
            return Err(UserError::Forbidden(
                "you can only update your own account".to_string(),
            ));
        }
        if input.role.is_some() && !actor.is_admin() {
            return Err(UserError::Forbidden("only admins can change roles".to_string()));
        }

        let mut user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        if let Some(ref email) = input.email {
            let email = normalize_email(email);
            if !email.eq_ignore_ascii_case(&user.email) {
                if self.repository.email_exists(&email).await? {
                    return Err(UserError::DuplicateEmail(email));
                }
                user.email = email;
            }
        }
        if let Some(ref password) = input.password {
            validate_password(password)?;
            user.password_hash = hash_password(password)?;
        }
        if let Some(first_name) = input.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            user.last_name = last_name;
        }
        if let Some(role) = input.role {
            user.role = role;
        }

        let updated = self.repository.update(user).await?;
        self.cache.invalidate(&cache::user_key(id)).await;

        tracing::info!(user_id = %id, actor_id = %actor.user_id, "User updated");
        Ok(updated)
    }

    /// Soft delete, admin only
    pub async fn delete_user(&self, actor: &Actor, id: Uuid) -> UserResult<DeleteResponse> {
        if !actor.is_admin() {
            return Err(UserError::Forbidden("only admins can delete users".to_string()));
        }

        let deleted_at = self.repository.soft_delete(id).await?;
        self.cache.invalidate(&cache::user_key(id)).await;
        self.cache.invalidate(cache::COUNT_KEY).await;

        tracing::info!(user_id = %id, actor_id = %actor.user_id, "User deleted");
        Ok(DeleteResponse {
            user_id: id,
            deleted_at,
        })
    }

    /// Check credentials and issue an access token
    pub async fn login(&self, input: LoginRequest) -> UserResult<LoginResponse> {
        let user = self
            .repository
            .get_by_email(&normalize_email(&input.email))
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Rejected login with wrong password");
            return Err(UserError::InvalidCredentials);
        }

        let issued = self
            .auth
            .create_token(user.id, &user.email, &user.role.to_string())
            .map_err(|e| UserError::Token(e.to_string()))?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse::bearer(issued.token, issued.expires_in))
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.cache.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.cache.set(key, json).await,
            Err(e) => tracing::warn!(key, error = %e, "Could not serialize cache entry"),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn resolve_page(query: &ListQuery) -> UserResult<(u64, u64)> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    if page == 0 {
        return Err(UserError::Validation("page must be at least 1".to_string()));
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(UserError::Validation(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    Ok((page, page_size))
}

fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?~\"";

fn validate_password(password: &str) -> UserResult<()> {
    if password.len() < 8 {
        return Err(UserError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(UserError::Validation(
            "Password cannot exceed 128 characters".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(UserError::Validation(
            "Password must contain at least one uppercase letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(UserError::Validation(
            "Password must contain at least one lowercase letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(UserError::Validation(
            "Password must contain at least one digit".to_string(),
        ));
    }

    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(UserError::Validation(format!(
            "Password must contain at least one special character ({})",
            SPECIAL_CHARS
        )));
    }

    Ok(())
}
