//! Identity, sessions, and access control.

pub mod auth_service;
pub mod hashing;
pub mod jwt;
pub mod models;
pub mod policy;
pub mod session;
pub mod validation;

pub use auth_service::AuthService;
pub use jwt::{AccessTokenClaims, Actor, TokenIssuer};
pub use models::{
    AuthTokens, ChangePasswordRequest, LoginRequest, NewRefreshToken, NewUser, RefreshTokenRecord,
    RefreshTokenState, RegisterRequest, Role, User,
};
pub use session::{SessionService, REFRESH_COOKIE_NAME};
