//! API DTOs (Data Transfer Objects)

use directory::models::User;
use kernel::id::UserId;
use serde::{Deserialize, Serialize};

use crate::application::{
    AuthenticatedUser, ChangePasswordInput, LoginInput, RegisterInput, UpdateProfileInput,
};

/// User as shown to clients; never carries the password hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.display_name,
        }
    }
}

/// Body of a successful register, login, or profile update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: PublicUser,
    pub token: String,
}

impl AuthResponse {
    pub fn new(message: &'static str, auth: AuthenticatedUser) -> Self {
        Self {
            message,
            user: auth.user.into(),
            token: auth.token,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: &'static str,
}

// ============================================================================
// Register
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            name: req.name,
        }
    }
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl From<LoginRequest> for LoginInput {
    fn from(req: LoginRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// GET /api/auth/me response
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<UpdateProfileRequest> for UpdateProfileInput {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl From<ChangePasswordRequest> for ChangePasswordInput {
    fn from(req: ChangePasswordRequest) -> Self {
        Self {
            current_password: req.current_password,
            new_password: req.new_password,
        }
    }
}
