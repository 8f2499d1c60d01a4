pub mod auth_service;
pub mod auth_service_impl;

pub use auth_service::{AuthContext, AuthError, AuthService, LoginOutcome};
pub use auth_service_impl::SeaOrmAuthService;
