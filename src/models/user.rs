//! User model, roles and panel access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Panels reachable with this role
    pub fn panels(self) -> &'static [Panel] {
        match self {
            Role::Student => &[Panel::Catalog, Panel::MyRequests],
            Role::Staff => &[Panel::Catalog, Panel::MyRequests, Panel::Approvals],
            Role::Admin => &[
                Panel::Catalog,
                Panel::MyRequests,
                Panel::Approvals,
                Panel::Admin,
            ],
        }
    }

    pub fn can_reach(self, panel: Panel) -> bool {
        self.panels().contains(&panel)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Area of the application a role may reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Panel {
    Catalog,
    MyRequests,
    Approvals,
    Admin,
}

impl Panel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::Catalog => "catalog",
            Panel::MyRequests => "my-requests",
            Panel::Approvals => "approvals",
            Panel::Admin => "admin",
        }
    }
}

/// Stored user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 hash; kept in snapshots, never sent to clients
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub panels: Vec<Panel>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            panels: user.role.panels().to_vec(),
        }
    }
}

/// Public signup request (always creates a student)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

/// Admin-side account creation, any role
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub role: Role,
}

impl From<SignupRequest> for CreateUser {
    fn from(signup: SignupRequest) -> Self {
        CreateUser {
            email: signup.email,
            password: signup.password,
            name: signup.name,
            role: Role::Student,
        }
    }
}

/// JWT claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: Uuid,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user: &User, expiration_hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.id,
            name: user.name.clone(),
            role: user.role,
            exp: now + (expiration_hours as i64 * 3600),
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Require the caller's role to reach `panel`
    pub fn require_panel(&self, panel: Panel) -> Result<(), AppError> {
        if self.role.can_reach(panel) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Role {} cannot access the {} panel",
                self.role,
                panel.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_table() {
        assert_eq!(Role::Student.panels(), &[Panel::Catalog, Panel::MyRequests]);
        assert!(Role::Staff.can_reach(Panel::Approvals));
        assert!(!Role::Staff.can_reach(Panel::Admin));
        assert_eq!(Role::Admin.panels().len(), 4);
    }

    #[test]
    fn test_require_panel() {
        let user = User {
            id: Uuid::new_v4(),
            email: "student@school.edu".to_string(),
            password_hash: String::new(),
            name: "John Student".to_string(),
            role: Role::Student,
            created_at: Utc::now(),
        };
        let claims = UserClaims::new(&user, 1);
        assert!(claims.require_panel(Panel::Catalog).is_ok());
        assert!(matches!(
            claims.require_panel(Panel::Approvals),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn test_token_round_trip() {
        let user = User {
            id: Uuid::new_v4(),
            email: "staff@school.edu".to_string(),
            password_hash: String::new(),
            name: "Jane Staff".to_string(),
            role: Role::Staff,
            created_at: Utc::now(),
        };
        let token = UserClaims::new(&user, 1).create_token("secret").unwrap();
        let claims = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id(), user.id);
        assert_eq!(claims.role, Role::Staff);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_panels_serialize_kebab_case() {
        let json = serde_json::to_string(Role::Student.panels()).unwrap();
        assert_eq!(json, r#"["catalog","my-requests"]"#);
    }

    #[test]
    fn test_signup_always_creates_student() {
        let signup = SignupRequest {
            email: "new@school.edu".to_string(),
            password: "secret123".to_string(),
            name: "New Student".to_string(),
        };
        assert_eq!(CreateUser::from(signup).role, Role::Student);
    }
}
