use crate::entity::role;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "alice_wonder")]
    pub username: String,
    /// Unique email address.
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// `participant` (default) or `organizer`.
    #[schema(example = "participant")]
    pub role: Option<String>,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    validate_email(&payload.email)?;
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    if let Some(ref role_name) = payload.role
        && !role::SELF_SERVICE_ROLES.contains(&role_name.as_str())
    {
        return Err(AppError::Validation(format!(
            "Role must be one of: {}",
            role::SELF_SERVICE_ROLES.join(", ")
        )));
    }
    Ok(())
}

/// Check the shape of an email address: one `@`, non-empty local part,
/// a dotted domain, no whitespace.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let invalid = || AppError::Validation("Email address is invalid".into());

    if email.len() < 3 || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username of the account to log into.
    #[schema(example = "alice_wonder")]
    pub username: String,
    /// Account password.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    /// ID of the newly created user.
    #[schema(example = 42)]
    pub id: i32,
    /// Username of the newly created user.
    #[schema(example = "alice_wonder")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "participant")]
    pub role: String,
}

impl From<crate::entity::user::Model> for RegisterResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    /// Authenticated user's username.
    #[schema(example = "alice_wonder")]
    pub username: String,
    /// User's role.
    #[schema(example = "organizer")]
    pub role: String,
    /// Permissions granted to the user.
    #[schema(example = json!(["hackathon:create"]))]
    pub permissions: Vec<String>,
}

/// Current authenticated user's identity, as carried by the token.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    /// User ID.
    #[schema(example = 42)]
    pub id: i32,
    /// Username.
    #[schema(example = "alice_wonder")]
    pub username: String,
    /// Role.
    #[schema(example = "participant")]
    pub role: String,
    /// Permissions.
    #[schema(example = json!([]))]
    pub permissions: Vec<String>,
}
