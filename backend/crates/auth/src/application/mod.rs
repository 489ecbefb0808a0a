//! Application Layer
//!
//! Use cases and application services.

pub mod change_password;
pub mod config;
pub mod credentials;
pub mod gateway;
pub mod login;
pub mod profile;
pub mod register;
pub mod token;

// Re-exports
pub use change_password::{ChangePasswordInput, ChangePasswordUseCase};
pub use config::AuthConfig;
pub use credentials::PasswordService;
pub use gateway::{AuthGateway, GatewayOutcome};
pub use login::{LoginInput, LoginUseCase};
pub use profile::{CurrentUserUseCase, UpdateProfileInput, UpdateProfileUseCase};
pub use register::{RegisterInput, RegisterUseCase};
pub use token::{AuthenticatedUser, Claims, TokenService};

/// Treat an empty string the same as an absent field
pub(crate) fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
