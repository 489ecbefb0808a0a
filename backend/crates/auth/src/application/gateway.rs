//! Auth Gateway
//!
//! Entry point for the HTTP layer. Every rate-limited operation is
//! admitted before its input is looked at, so a malformed or invalid
//! request still consumes a slot in the caller's window. Each outcome is
//! reported to the audit sink.

use std::sync::Arc;

use chrono::Utc;
use directory::UserDirectory;
use directory::models::User;
use kernel::session::SessionIdentity;
use platform::client::ClientId;
use platform::rate_limit::{RateLimitResult, RateLimitStore};

use crate::application::change_password::{ChangePasswordInput, ChangePasswordUseCase};
use crate::application::config::AuthConfig;
use crate::application::credentials::PasswordService;
use crate::application::login::{LoginInput, LoginUseCase};
use crate::application::profile::{CurrentUserUseCase, UpdateProfileInput, UpdateProfileUseCase};
use crate::application::register::{RegisterInput, RegisterUseCase};
use crate::application::token::{AuthenticatedUser, TokenService};
use crate::domain::audit::{AuditEvent, AuditEventKind, AuditSink};
use crate::error::{AuthError, AuthResult};

pub const REGISTER_LIMIT_MESSAGE: &str = "Too many requests. Please try again later.";
pub const LOGIN_LIMIT_MESSAGE: &str = "Too many login attempts. Please try again later.";

/// Result of a rate-limited operation
///
/// `rate` is absent only when the limiter itself failed.
#[derive(Debug)]
pub struct GatewayOutcome<T> {
    pub rate: Option<RateLimitResult>,
    pub result: AuthResult<T>,
}

impl<T> GatewayOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GatewayOutcome<U> {
        GatewayOutcome {
            rate: self.rate,
            result: self.result.map(f),
        }
    }
}

pub struct AuthGateway<D, L> {
    directory: Arc<D>,
    limiter: Arc<L>,
    passwords: PasswordService,
    tokens: TokenService,
    audit: Arc<dyn AuditSink>,
}

impl<D, L> AuthGateway<D, L>
where
    D: UserDirectory + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    pub fn new(
        directory: Arc<D>,
        limiter: Arc<L>,
        config: &AuthConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            directory,
            limiter,
            passwords: PasswordService::new(config),
            tokens: TokenService::new(config),
            audit,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }

    // ========================================================================
    // Rate-limited operations
    // ========================================================================

    /// Input errors (such as an unreadable body) are reported after admission.
    pub async fn register(
        &self,
        client: &ClientId,
        input: AuthResult<RegisterInput>,
    ) -> GatewayOutcome<AuthenticatedUser> {
        let rate = match self.admit(client, REGISTER_LIMIT_MESSAGE).await {
            Ok(rate) => rate,
            Err(outcome) => return outcome,
        };

        let attempted = input
            .as_ref()
            .ok()
            .and_then(RegisterInput::attempted_email)
            .map(str::to_string);
        let use_case = RegisterUseCase::new(
            Arc::clone(&self.directory),
            self.passwords.clone(),
            self.tokens.clone(),
        );
        let result = match input {
            Ok(input) => use_case.execute(input).await,
            Err(e) => Err(e),
        };

        self.audit_result(
            client,
            &result,
            attempted,
            AuditEventKind::RegisterSucceeded,
            AuditEventKind::RegisterFailed,
        );
        GatewayOutcome { rate, result }
    }

    pub async fn login(
        &self,
        client: &ClientId,
        input: AuthResult<LoginInput>,
    ) -> GatewayOutcome<AuthenticatedUser> {
        let rate = match self.admit(client, LOGIN_LIMIT_MESSAGE).await {
            Ok(rate) => rate,
            Err(outcome) => return outcome,
        };

        let attempted = input
            .as_ref()
            .ok()
            .and_then(LoginInput::attempted_email)
            .map(str::to_string);
        let use_case = LoginUseCase::new(
            Arc::clone(&self.directory),
            self.passwords.clone(),
            self.tokens.clone(),
        );
        let result = match input {
            Ok(input) => use_case.execute(input).await,
            Err(e) => Err(e),
        };

        self.audit_result(
            client,
            &result,
            attempted,
            AuditEventKind::LoginSucceeded,
            AuditEventKind::LoginFailed,
        );
        GatewayOutcome { rate, result }
    }

    pub async fn change_password(
        &self,
        client: &ClientId,
        session: &SessionIdentity,
        input: AuthResult<ChangePasswordInput>,
    ) -> GatewayOutcome<()> {
        let rate = match self.admit(client, LOGIN_LIMIT_MESSAGE).await {
            Ok(rate) => rate,
            Err(outcome) => return outcome,
        };

        let use_case =
            ChangePasswordUseCase::new(Arc::clone(&self.directory), self.passwords.clone());
        let result = match input {
            Ok(input) => use_case.execute(session, input).await,
            Err(e) => Err(e),
        };

        let event = match &result {
            Ok(()) => AuditEvent::new(AuditEventKind::PasswordChanged, client.as_str()),
            Err(e) => AuditEvent::new(AuditEventKind::PasswordChangeFailed, client.as_str())
                .reason(e.reason()),
        };
        self.audit.record(event.user(session.user_id));
        GatewayOutcome { rate, result }
    }

    // ========================================================================
    // Session-only operations
    // ========================================================================

    /// Caller's current window, without counting a request
    pub async fn rate_status(&self, client: &ClientId) -> Option<RateLimitResult> {
        match self.limiter.status(client.as_str()).await {
            Ok(rate) => Some(rate),
            Err(e) => {
                tracing::warn!(error = %e, client_id = %client, "Rate limit status unavailable");
                None
            }
        }
    }

    pub async fn current_user(&self, session: &SessionIdentity) -> AuthResult<User> {
        CurrentUserUseCase::new(Arc::clone(&self.directory))
            .execute(session)
            .await
    }

    pub async fn update_profile(
        &self,
        client: &ClientId,
        session: &SessionIdentity,
        input: UpdateProfileInput,
    ) -> AuthResult<AuthenticatedUser> {
        let result = UpdateProfileUseCase::new(Arc::clone(&self.directory), self.tokens.clone())
            .execute(session, input)
            .await;

        let event = match &result {
            Ok(_) => AuditEvent::new(AuditEventKind::ProfileUpdated, client.as_str()),
            Err(e) => AuditEvent::new(AuditEventKind::ProfileUpdateFailed, client.as_str())
                .reason(e.reason()),
        };
        self.audit.record(event.user(session.user_id));
        result
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Count one request against the caller's window
    async fn admit<T>(
        &self,
        client: &ClientId,
        message: &'static str,
    ) -> Result<Option<RateLimitResult>, GatewayOutcome<T>> {
        let rate = match self.limiter.check_and_increment(client.as_str()).await {
            Ok(rate) => rate,
            Err(e) => {
                return Err(GatewayOutcome {
                    rate: None,
                    result: Err(e.into()),
                });
            }
        };

        if rate.allowed {
            return Ok(Some(rate));
        }

        let retry_after_secs = rate.retry_after_secs(Utc::now().timestamp_millis());
        self.audit.record(
            AuditEvent::new(AuditEventKind::RateLimited, client.as_str()).reason("rate_limited"),
        );
        Err(GatewayOutcome {
            rate: Some(rate),
            result: Err(AuthError::RateLimited {
                message,
                retry_after_secs,
            }),
        })
    }

    fn audit_result(
        &self,
        client: &ClientId,
        result: &AuthResult<AuthenticatedUser>,
        attempted_email: Option<String>,
        succeeded: AuditEventKind,
        failed: AuditEventKind,
    ) {
        let event = match result {
            Ok(auth) => AuditEvent::new(succeeded, client.as_str())
                .user(auth.user.id)
                .email(auth.user.email.clone()),
            Err(e) => {
                let event = AuditEvent::new(failed, client.as_str()).reason(e.reason());
                match attempted_email {
                    Some(email) => event.email(email),
                    None => event,
                }
            }
        };
        self.audit.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{TestDirectory, memory_directory, test_config};
    use platform::rate_limit::{InMemoryRateLimiter, RateLimitConfig};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<AuditEvent>>);

    impl RecordingSink {
        fn kinds(&self) -> Vec<AuditEventKind> {
            self.0.lock().unwrap().iter().map(|e| e.kind).collect()
        }
    }

    impl AuditSink for RecordingSink {
        fn record(&self, event: AuditEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn gateway(
        max_requests: u32,
    ) -> (
        AuthGateway<TestDirectory, InMemoryRateLimiter>,
        Arc<RecordingSink>,
    ) {
        let sink = Arc::new(RecordingSink::default());
        let gateway = AuthGateway::new(
            memory_directory(),
            Arc::new(InMemoryRateLimiter::new(RateLimitConfig::new(max_requests, 60))),
            &test_config(),
            sink.clone(),
        );
        (gateway, sink)
    }

    fn register_input(email: &str) -> AuthResult<RegisterInput> {
        Ok(RegisterInput {
            email: Some(email.to_string()),
            password: Some("secret1".to_string()),
            name: Some("Ann".to_string()),
        })
    }

    fn client() -> ClientId {
        ClientId::new("203.0.113.7")
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (gateway, sink) = gateway(5);

        let registered = gateway.register(&client(), register_input("a@b.com")).await;
        let rate = registered.rate.unwrap();
        assert_eq!(rate.remaining, 4);
        let registered = registered.result.unwrap();

        let login = gateway
            .login(
                &client(),
                Ok(LoginInput {
                    email: Some("a@b.com".into()),
                    password: Some("secret1".into()),
                }),
            )
            .await;
        assert_eq!(login.rate.unwrap().remaining, 3);
        assert_eq!(login.result.unwrap().user.id, registered.user.id);

        assert_eq!(
            sink.kinds(),
            vec![AuditEventKind::RegisterSucceeded, AuditEventKind::LoginSucceeded]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_still_counts() {
        let (gateway, sink) = gateway(2);
        let bad = || Err(AuthError::Validation("Invalid request body".into()));

        let first = gateway.register(&client(), bad()).await;
        assert!(matches!(first.result, Err(AuthError::Validation(_))));
        assert_eq!(first.rate.unwrap().remaining, 1);

        gateway.register(&client(), bad()).await;
        let third = gateway.register(&client(), register_input("a@b.com")).await;
        match third.result {
            Err(AuthError::RateLimited {
                message,
                retry_after_secs,
            }) => {
                assert_eq!(message, REGISTER_LIMIT_MESSAGE);
                assert!(retry_after_secs >= 1);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert_eq!(third.rate.unwrap().remaining, 0);
        assert_eq!(sink.kinds().last(), Some(&AuditEventKind::RateLimited));
    }

    #[tokio::test]
    async fn test_limit_is_shared_across_operations() {
        let (gateway, _) = gateway(1);
        gateway.register(&client(), register_input("a@b.com")).await;

        let login = gateway.login(&client(), Ok(LoginInput::default())).await;
        assert!(matches!(
            login.result,
            Err(AuthError::RateLimited { message, .. }) if message == LOGIN_LIMIT_MESSAGE
        ));

        let other_client = gateway
            .login(&ClientId::new("198.51.100.1"), Ok(LoginInput::default()))
            .await;
        assert!(matches!(other_client.result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rate_status_does_not_count() {
        let (gateway, _) = gateway(5);
        gateway.register(&client(), register_input("a@b.com")).await;

        for _ in 0..3 {
            let status = gateway.rate_status(&client()).await.unwrap();
            assert_eq!(status.remaining, 4);
            assert!(status.allowed);
        }
    }

    #[tokio::test]
    async fn test_failed_login_audited_with_email() {
        let (gateway, sink) = gateway(5);
        gateway
            .login(
                &client(),
                Ok(LoginInput {
                    email: Some("ghost@b.com".into()),
                    password: Some("secret1".into()),
                }),
            )
            .await;

        let events = sink.0.lock().unwrap();
        assert_eq!(events[0].kind, AuditEventKind::LoginFailed);
        assert_eq!(events[0].email.as_deref(), Some("ghost@b.com"));
        assert_eq!(events[0].reason, Some("invalid_credentials"));
    }
}
