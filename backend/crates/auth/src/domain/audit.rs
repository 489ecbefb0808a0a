//! Audit Events
//!
//! Security-relevant outcomes of gateway requests. Passwords and hashes
//! are never part of an event.

use kernel::id::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    RegisterSucceeded,
    RegisterFailed,
    LoginSucceeded,
    LoginFailed,
    ProfileUpdated,
    ProfileUpdateFailed,
    PasswordChanged,
    PasswordChangeFailed,
    RateLimited,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::RegisterSucceeded => "register_succeeded",
            AuditEventKind::RegisterFailed => "register_failed",
            AuditEventKind::LoginSucceeded => "login_succeeded",
            AuditEventKind::LoginFailed => "login_failed",
            AuditEventKind::ProfileUpdated => "profile_updated",
            AuditEventKind::ProfileUpdateFailed => "profile_update_failed",
            AuditEventKind::PasswordChanged => "password_changed",
            AuditEventKind::PasswordChangeFailed => "password_change_failed",
            AuditEventKind::RateLimited => "rate_limited",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AuditEventKind::RegisterFailed
                | AuditEventKind::LoginFailed
                | AuditEventKind::ProfileUpdateFailed
                | AuditEventKind::PasswordChangeFailed
                | AuditEventKind::RateLimited
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    pub client_id: String,
    pub user_id: Option<UserId>,
    /// Attempted (failure) or account (success) email
    pub email: Option<String>,
    pub reason: Option<&'static str>,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind, client_id: impl Into<String>) -> Self {
        Self {
            kind,
            client_id: client_id.into(),
            user_id: None,
            email: None,
            reason: None,
        }
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}
