//! Authentication and user account service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        user::{CreateUser, SignupRequest},
        User, UserClaims, UserInfo,
    },
    repository::RecordStore,
};

#[derive(Clone)]
pub struct UsersService {
    store: Arc<dyn RecordStore>,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(store: Arc<dyn RecordStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Check credentials and issue a JWT for the account
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, UserInfo)> {
        let user = self
            .store
            .user_find_by_email(email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            tracing::warn!("Failed login for {}", user.email);
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!("User {} logged in as {}", user.email, user.role);
        Ok((token, UserInfo::from(&user)))
    }

    /// Self-service registration; the account is always a student
    pub async fn signup(&self, request: SignupRequest) -> AppResult<UserInfo> {
        request.validate()?;
        let user = self.create_user(CreateUser::from(request)).await?;
        Ok(UserInfo::from(&user))
    }

    /// Create an account with any role
    pub async fn create_user(&self, data: CreateUser) -> AppResult<User> {
        data.validate()?;

        let email = data.email.trim().to_lowercase();
        if self.store.user_find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!("Email {} is already registered", email)));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: self.hash_password(&data.password)?,
            name: data.name.trim().to_string(),
            role: data.role,
            created_at: Utc::now(),
        };
        let created = self.store.user_create(user).await?;
        tracing::info!("Account {} created with role {}", created.email, created.role);
        Ok(created)
    }

    pub async fn me(&self, claims: &UserClaims) -> AppResult<UserInfo> {
        let user = self.store.user_get(claims.user_id()).await?;
        Ok(UserInfo::from(&user))
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        if user.password_hash.is_empty() {
            return Ok(false);
        }
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Panel, Role},
        repository::MemoryStore,
    };

    fn service() -> UsersService {
        UsersService::new(
            Arc::new(MemoryStore::new()),
            AuthConfig {
                jwt_secret: "test-secret".to_string(),
                jwt_expiration_hours: 1,
            },
        )
    }

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: "student123".to_string(),
            name: "John Student".to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_creates_student_and_login_works() {
        let users = service();
        let info = users.signup(signup("student@school.edu")).await.unwrap();
        assert_eq!(info.role, Role::Student);
        assert_eq!(info.panels, vec![Panel::Catalog, Panel::MyRequests]);

        let (token, logged_in) = users
            .login("Student@School.edu", "student123")
            .await
            .unwrap();
        assert_eq!(logged_in.id, info.id);

        let claims = UserClaims::from_token(&token, "test-secret").unwrap();
        assert_eq!(claims.user_id(), info.id);
        assert_eq!(claims.role, Role::Student);
        assert_eq!(users.me(&claims).await.unwrap().email, "student@school.edu");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let users = service();
        users.signup(signup("student@school.edu")).await.unwrap();

        assert!(matches!(
            users.login("student@school.edu", "wrong-password").await,
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            users.login("nobody@school.edu", "student123").await,
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let users = service();
        users.signup(signup("student@school.edu")).await.unwrap();
        assert!(matches!(
            users.signup(signup(" STUDENT@school.edu")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let users = service();
        let mut short = signup("student@school.edu");
        short.password = "12345".to_string();
        assert!(matches!(users.signup(short).await, Err(AppError::Validation(_))));
        assert!(matches!(
            users.signup(signup("not-an-email")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_can_create_staff() {
        let users = service();
        let staff = users
            .create_user(CreateUser {
                email: "staff@school.edu".to_string(),
                password: "staff123".to_string(),
                name: "Jane Staff".to_string(),
                role: Role::Staff,
            })
            .await
            .unwrap();
        assert_eq!(staff.role, Role::Staff);
        assert_ne!(staff.password_hash, "staff123");

        let (_, info) = users.login("staff@school.edu", "staff123").await.unwrap();
        assert!(info.panels.contains(&Panel::Approvals));
        assert!(!info.panels.contains(&Panel::Admin));
    }
}
