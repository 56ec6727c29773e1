//! Account authentication facade: registration, login, password changes, and
//! session refresh.

use std::sync::{Arc, LazyLock};

use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::hashing;
use crate::auth::jwt::TokenIssuer;
use crate::auth::models::{
    AuthTokens, ChangePasswordRequest, LoginRequest, NewUser, RegisterRequest, Role, User,
};
use crate::auth::session::SessionService;
use crate::domain::UserId;
use crate::errors::{Result, TaskplaneError};
use crate::storage::repositories::UserRepository;

/// Pre-computed dummy hash for timing-safe user enumeration prevention.
/// When a non-existent email is used, we still run Argon2 verification against
/// this hash so the response time matches real verification.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value")
        .unwrap_or_else(|_| "$argon2id$v=19$m=768,t=1,p=1$dW5rbm93bg$dW5rbm93bg".to_string())
});

const INVALID_CREDENTIALS: &str = "invalid email or password";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Seam for password verification so tests can observe how often it runs.
/// Production always goes through Argon2 in [`hashing`].
trait PasswordVerifier: Send + Sync {
    fn verify(&self, password_hash: &str, password: &str) -> bool;
}

struct Argon2Verifier;

impl PasswordVerifier for Argon2Verifier {
    fn verify(&self, password_hash: &str, password: &str) -> bool {
        hashing::verify_password(password_hash, password)
    }
}

/// Service coordinating credentials, sessions, and access tokens.
#[derive(Clone)]
pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    session_service: SessionService,
    token_issuer: Arc<TokenIssuer>,
    verifier: Arc<dyn PasswordVerifier>,
}

impl AuthService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        session_service: SessionService,
        token_issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self { user_repository, session_service, token_issuer, verifier: Arc::new(Argon2Verifier) }
    }

    #[cfg(test)]
    fn with_verifier(mut self, verifier: Arc<dyn PasswordVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    fn issue_tokens(&self, user: &User, raw_refresh: String, expires_at: chrono::DateTime<chrono::Utc>) -> Result<AuthTokens> {
        Ok(AuthTokens {
            access_token: self.token_issuer.create_token(user)?,
            refresh_token: raw_refresh,
            refresh_expires_at: expires_at,
        })
    }

    /// Register a new account and open its first session.
    ///
    /// New accounts always start as [`Role::Member`]; elevation is a separate
    /// administrative concern.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<(User, AuthTokens)> {
        request.validate()?;

        let email = normalize_email(&request.email);
        if self.user_repository.email_exists(&email).await? {
            return Err(TaskplaneError::conflict("email address is already registered", "user"));
        }

        if let Some(org_id) = &request.organization_id {
            if !self.user_repository.organization_exists(org_id).await? {
                return Err(TaskplaneError::validation_field(
                    "organization does not exist",
                    "organizationId",
                ));
            }
        }

        let password_hash = hashing::hash_password(&request.password)?;
        let user = self
            .user_repository
            .create_user(NewUser {
                id: UserId::new(),
                name: request.name.trim().to_string(),
                email,
                role: Role::Member,
                organization_id: request.organization_id,
                password_hash,
            })
            .await?;

        let (raw_refresh, record) = self.session_service.create_session(&user.id).await?;
        let tokens = self.issue_tokens(&user, raw_refresh, record.expires_at)?;

        info!(user_id = %user.id, "user registered");
        Ok((user, tokens))
    }

    /// Authenticate with email and password.
    ///
    /// Both unknown email and wrong password take the same code path length
    /// (exactly one Argon2 verification) and surface the same error.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<(User, AuthTokens)> {
        request.validate()?;

        let email = normalize_email(&request.email);

        let (user, password_hash) =
            match self.user_repository.find_by_email_with_hash(&email).await? {
                Some(result) => result,
                None => {
                    // Burn the same verification cost as the real path
                    let _ = self.verifier.verify(&DUMMY_HASH, &request.password);
                    warn!(email = %email, "login attempt for non-existent user");
                    return Err(TaskplaneError::unauthorized(INVALID_CREDENTIALS));
                }
            };

        if !self.verifier.verify(&password_hash, &request.password) {
            warn!(user_id = %user.id, "login attempt with incorrect password");
            return Err(TaskplaneError::unauthorized(INVALID_CREDENTIALS));
        }

        let (raw_refresh, record) = self.session_service.create_session(&user.id).await?;
        let tokens = self.issue_tokens(&user, raw_refresh, record.expires_at)?;

        info!(user_id = %user.id, "user logged in");
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new access token and a successor refresh
    /// token. Reuse of a retired token invalidates the whole session family.
    pub async fn refresh_session(&self, raw_refresh: &str) -> Result<(User, AuthTokens)> {
        let (new_raw, record) = self.session_service.rotate(raw_refresh).await?;
        let user = self.user_repository.get_user(&record.user_id).await?;
        let tokens = self.issue_tokens(&user, new_raw, record.expires_at)?;
        Ok((user, tokens))
    }

    /// Close the session identified by the refresh token. Idempotent.
    pub async fn logout(&self, raw_refresh: &str) -> Result<()> {
        self.session_service.revoke(raw_refresh).await
    }

    /// Change the password for an authenticated user. Every refresh session
    /// the user holds is revoked; open access tokens ride out their short TTL.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: &UserId,
        request: ChangePasswordRequest,
    ) -> Result<()> {
        request.validate()?;

        let user = self.user_repository.get_user(user_id).await?;
        let (_, current_hash) = self
            .user_repository
            .find_by_email_with_hash(&user.email)
            .await?
            .ok_or_else(|| TaskplaneError::not_found("user", user_id.as_str()))?;

        if !self.verifier.verify(&current_hash, &request.current_password) {
            warn!(user_id = %user_id, "password change with incorrect current password");
            return Err(TaskplaneError::unauthorized("current password is incorrect"));
        }

        let new_hash = hashing::hash_password(&request.new_password)?;
        self.user_repository.update_password_hash(user_id, &new_hash).await?;

        self.session_service.revoke_all_for_user(user_id).await?;

        info!(user_id = %user_id, "password changed; all refresh sessions revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::storage::repositories::{SqlxRefreshTokenRepository, SqlxUserRepository};
    use crate::storage::tests_support::migrated_pool;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            refresh_token_pepper: "fedcba9876543210fedcba9876543210".to_string(),
            ..Default::default()
        }
    }

    fn service_on(pool: crate::storage::DbPool) -> AuthService {
        let config = test_auth_config();
        let session_service =
            SessionService::new(Arc::new(SqlxRefreshTokenRepository::new(pool.clone())), &config);
        AuthService::new(
            Arc::new(SqlxUserRepository::new(pool)),
            session_service,
            Arc::new(TokenIssuer::new(&config)),
        )
    }

    async fn test_service() -> AuthService {
        service_on(migrated_pool().await)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "Passw0rdOk".to_string(),
            confirm_password: "Passw0rdOk".to_string(),
            organization_id: None,
        }
    }

    #[tokio::test]
    async fn register_creates_member_with_session() {
        let service = test_service().await;

        let (user, tokens) = service.register(register_request("new@example.com")).await.unwrap();
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.email, "new@example.com");
        assert!(!tokens.access_token.is_empty());
        assert!(!tokens.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn register_normalizes_email_and_rejects_duplicates() {
        let service = test_service().await;

        service.register(register_request("Dup@Example.com")).await.unwrap();

        let err = service.register(register_request("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, TaskplaneError::Conflict { .. }));
    }

    #[tokio::test]
    async fn register_rejects_unknown_organization() {
        let pool = migrated_pool().await;
        let service = service_on(pool.clone());

        let mut request = register_request("org@example.com");
        request.organization_id = Some(crate::domain::OrganizationId::new());

        let err = service.register(request).await.unwrap_err();
        assert!(matches!(err, TaskplaneError::Validation { .. }));
        assert_eq!(err.status_code(), 400);

        // With the organization present, the same request goes through
        let org_id = crate::domain::OrganizationId::new();
        sqlx::query("INSERT INTO organizations (id, name) VALUES ($1, $2)")
            .bind(&org_id)
            .bind("acme")
            .execute(&pool)
            .await
            .unwrap();

        let mut request = register_request("org@example.com");
        request.organization_id = Some(org_id.clone());
        let (user, _) = service.register(request).await.unwrap();
        assert_eq!(user.organization_id, Some(org_id));
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let service = test_service().await;

        let mut request = register_request("weak@example.com");
        request.password = "short".to_string();
        request.confirm_password = "short".to_string();

        let err = service.register(request).await.unwrap_err();
        assert!(matches!(err, TaskplaneError::Validation { .. }));
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_credentials() {
        let service = test_service().await;
        service.register(register_request("login@example.com")).await.unwrap();

        let (user, tokens) = service
            .login(LoginRequest {
                email: "Login@Example.com".to_string(),
                password: "Passw0rdOk".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.email, "login@example.com");
        assert!(!tokens.access_token.is_empty());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let service = test_service().await;
        service.register(register_request("known@example.com")).await.unwrap();

        let unknown = service
            .login(LoginRequest {
                email: "unknown@example.com".to_string(),
                password: "Passw0rdOk".to_string(),
            })
            .await
            .unwrap_err();

        let wrong_password = service
            .login(LoginRequest {
                email: "known@example.com".to_string(),
                password: "WrongPass1".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(unknown.to_string(), wrong_password.to_string());
        assert_eq!(unknown.status_code(), 401);
        assert_eq!(wrong_password.status_code(), 401);
    }

    struct CountingVerifier {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl CountingVerifier {
        fn count(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    impl PasswordVerifier for CountingVerifier {
        fn verify(&self, password_hash: &str, password: &str) -> bool {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            hashing::verify_password(password_hash, password)
        }
    }

    #[tokio::test]
    async fn every_login_path_runs_exactly_one_verification() {
        let verifier = Arc::new(CountingVerifier {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let service = test_service().await.with_verifier(verifier.clone());

        // Registration hashes but never verifies
        service.register(register_request("count@example.com")).await.unwrap();
        assert_eq!(verifier.count(), 0);

        // Unknown email still burns one verification against the dummy hash
        let _ = service
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "Passw0rdOk".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(verifier.count(), 1);

        // Wrong password verifies against the stored hash, once
        let _ = service
            .login(LoginRequest {
                email: "count@example.com".to_string(),
                password: "WrongPass1".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(verifier.count(), 2);

        // The happy path verifies exactly once too
        service
            .login(LoginRequest {
                email: "count@example.com".to_string(),
                password: "Passw0rdOk".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(verifier.count(), 3);
    }

    #[tokio::test]
    async fn refresh_rotates_and_old_token_dies() {
        let service = test_service().await;
        let (_, tokens) = service.register(register_request("r@example.com")).await.unwrap();

        let (_, new_tokens) = service.refresh_session(&tokens.refresh_token).await.unwrap();
        assert_ne!(new_tokens.refresh_token, tokens.refresh_token);

        // Replay of the retired token kills the family
        let err = service.refresh_session(&tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, TaskplaneError::SessionInvalidated { .. }));

        let err = service.refresh_session(&new_tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, TaskplaneError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn logout_revokes_session() {
        let service = test_service().await;
        let (_, tokens) = service.register(register_request("l@example.com")).await.unwrap();

        service.logout(&tokens.refresh_token).await.unwrap();

        let err = service.refresh_session(&tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, TaskplaneError::Unauthorized { .. }));

        // Logging out again is fine
        service.logout(&tokens.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn change_password_revokes_all_sessions() {
        let service = test_service().await;
        let (user, tokens) = service.register(register_request("cp@example.com")).await.unwrap();
        let (_, second) = service
            .login(LoginRequest {
                email: "cp@example.com".to_string(),
                password: "Passw0rdOk".to_string(),
            })
            .await
            .unwrap();

        service
            .change_password(
                &user.id,
                ChangePasswordRequest {
                    current_password: "Passw0rdOk".to_string(),
                    new_password: "NewPassw0rd1".to_string(),
                    confirm_password: "NewPassw0rd1".to_string(),
                },
            )
            .await
            .unwrap();

        // Both sessions are gone
        assert!(service.refresh_session(&tokens.refresh_token).await.is_err());
        assert!(service.refresh_session(&second.refresh_token).await.is_err());

        // Old password no longer works, new one does
        assert!(service
            .login(LoginRequest {
                email: "cp@example.com".to_string(),
                password: "Passw0rdOk".to_string(),
            })
            .await
            .is_err());
        assert!(service
            .login(LoginRequest {
                email: "cp@example.com".to_string(),
                password: "NewPassw0rd1".to_string(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn change_password_requires_correct_current_password() {
        let service = test_service().await;
        let (user, _) = service.register(register_request("cw@example.com")).await.unwrap();

        let err = service
            .change_password(
                &user.id,
                ChangePasswordRequest {
                    current_password: "WrongPass1".to_string(),
                    new_password: "NewPassw0rd1".to_string(),
                    confirm_password: "NewPassw0rd1".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskplaneError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn change_password_rejects_reusing_current() {
        let service = test_service().await;
        let (user, _) = service.register(register_request("same@example.com")).await.unwrap();

        let err = service
            .change_password(
                &user.id,
                ChangePasswordRequest {
                    current_password: "Passw0rdOk".to_string(),
                    new_password: "Passw0rdOk".to_string(),
                    confirm_password: "Passw0rdOk".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskplaneError::Validation { .. }));
    }
}
