use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::principal::{Identity, Role};
use super::token::{SessionToken, TokenCodec};
use crate::error::{AppError, AppResult};
use crate::tprintln;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Handed to the route layer, which owns setting the cookie.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub identity: Identity,
    pub token: SessionToken,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Stored account. The password hash never leaves this module.
#[derive(Debug, Clone)]
struct UserRecord {
    identity: Identity,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Listing view of an account.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(flatten)]
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
}

/// Process-local account store keyed by lowercased email.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

fn email_key(email: &str) -> String { email.trim().to_ascii_lowercase() }

/// Stand-in hash for unknown emails so a miss costs one full Argon2 verify.
static DUMMY_HASH: Lazy<String> =
    Lazy::new(|| crate::security::hash_password("placeholder-never-matches").unwrap_or_default());

fn check_password<F>(rec: Option<&UserRecord>, password: &str, verify: F) -> Option<Identity>
where
    F: Fn(&str, &str) -> bool,
{
    match rec {
        Some(r) if verify(&r.password_hash, password) => Some(r.identity.clone()),
        Some(_) => None,
        None => {
            let _ = verify(&DUMMY_HASH, password);
            None
        }
    }
}

impl UserDirectory {
    pub fn new() -> Self { Self::default() }

    pub fn create_user(&self, new: NewUser) -> AppResult<Identity> {
        let key = email_key(&new.email);
        if key.is_empty() || !key.contains('@') {
            return Err(AppError::user("invalid_email", "a valid email is required"));
        }
        if new.password.len() < 8 {
            return Err(AppError::user("weak_password", "password must be at least 8 characters"));
        }
        let password_hash = crate::security::hash_password(&new.password)?;
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            email: key.clone(),
            role: new.role,
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
        };
        let mut users = self.users.write();
        if users.contains_key(&key) {
            return Err(AppError::conflict("email_taken", "email already registered"));
        }
        users.insert(key, UserRecord { identity: identity.clone(), password_hash, created_at: Utc::now() });
        debug!(user_id = %identity.id, role = %identity.role, "user created");
        Ok(identity)
    }

    /// Password check; `None` for unknown email and wrong password alike.
    pub fn authenticate(&self, email: &str, password: &str) -> Option<Identity> {
        let rec = self.users.read().get(&email_key(email)).cloned();
        check_password(rec.as_ref(), password, crate::security::verify_password)
    }

    pub fn find_by_email(&self, email: &str) -> Option<Identity> {
        self.users.read().get(&email_key(email)).map(|r| r.identity.clone())
    }

    /// Oldest first.
    pub fn list(&self) -> Vec<UserSummary> {
        let mut out: Vec<UserSummary> = self
            .users
            .read()
            .values()
            .map(|r| UserSummary { identity: r.identity.clone(), created_at: r.created_at })
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.identity.email.cmp(&b.identity.email)));
        out
    }

    pub fn len(&self) -> usize { self.users.read().len() }

    pub fn is_empty(&self) -> bool { self.users.read().is_empty() }
}

/// Seed a bootstrap admin unless an account with that email already exists.
pub fn ensure_default_admin(dir: &UserDirectory, email: &str, password: &str) -> Result<()> {
    if dir.find_by_email(email).is_some() {
        return Ok(());
    }
    let identity = dir.create_user(NewUser {
        email: email.to_string(),
        password: password.to_string(),
        role: Role::Admin,
        first_name: "Admin".into(),
        last_name: String::new(),
    })?;
    info!(target: "startup", email = %identity.email, "bootstrap admin created");
    Ok(())
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse>;
}

pub struct LocalAuthProvider {
    pub users: UserDirectory,
    pub codec: Arc<TokenCodec>,
}

impl LocalAuthProvider {
    pub fn new(users: UserDirectory, codec: Arc<TokenCodec>) -> Self { Self { users, codec } }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        let Some(identity) = self.users.authenticate(&req.email, &req.password) else {
            return Err(AppError::auth("invalid_credentials", "invalid email or password"));
        };
        let token = self.codec.issue(&identity)?;
        tprintln!("auth.login user={} role={}", identity.id, identity.role);
        Ok(LoginResponse { identity, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser { email: email.into(), password: "correct horse".into(), role, first_name: "Pat".into(), last_name: "Doe".into() }
    }

    #[test]
    fn create_and_authenticate() {
        let dir = UserDirectory::new();
        let id = dir.create_user(new_user("Pat@Example.com", Role::SalesRep)).unwrap();
        assert_eq!(id.email, "pat@example.com");
        assert_eq!(dir.authenticate("pat@example.com", "correct horse"), Some(id.clone()));
        assert_eq!(dir.authenticate("PAT@example.com", "correct horse"), Some(id));
        assert_eq!(dir.authenticate("pat@example.com", "wrong"), None);
        assert_eq!(dir.authenticate("nobody@example.com", "correct horse"), None);
    }

    #[test]
    fn unknown_email_still_pays_for_a_verify() {
        use std::cell::Cell;
        let calls = Cell::new(0);
        let counting = |hash: &str, pw: &str| {
            calls.set(calls.get() + 1);
            crate::security::verify_password(hash, pw)
        };
        let rec = UserRecord {
            identity: Identity { id: "u1".into(), email: "k@example.com".into(), role: Role::SalesRep, first_name: String::new(), last_name: String::new() },
            password_hash: crate::security::hash_password("correct horse").unwrap(),
            created_at: Utc::now(),
        };

        assert_eq!(check_password(Some(&rec), "wrong", &counting), None);
        assert_eq!(calls.get(), 1);
        assert_eq!(check_password(None, "wrong", &counting), None);
        assert_eq!(calls.get(), 2);
        assert!(DUMMY_HASH.starts_with("$argon2"));
        assert_eq!(check_password(None, "placeholder-never-matches", &counting), None);
    }

    #[test]
    fn duplicate_email_conflicts() {
        let dir = UserDirectory::new();
        dir.create_user(new_user("a@example.com", Role::SalesRep)).unwrap();
        let err = dir.create_user(new_user("A@example.com", Role::Manager)).unwrap_err();
        assert_eq!(err.http_status(), 409);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn input_validation() {
        let dir = UserDirectory::new();
        assert_eq!(dir.create_user(new_user("no-at-sign", Role::SalesRep)).unwrap_err().http_status(), 400);
        let mut short = new_user("b@example.com", Role::SalesRep);
        short.password = "short".into();
        assert_eq!(dir.create_user(short).unwrap_err().code_str(), "weak_password");
    }

    #[test]
    fn default_admin_is_idempotent() {
        let dir = UserDirectory::new();
        ensure_default_admin(&dir, "root@example.com", "bootstrap-pass").unwrap();
        ensure_default_admin(&dir, "root@example.com", "other-pass").unwrap();
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.find_by_email("root@example.com").unwrap().role, Role::Admin);
    }

    #[test]
    fn login_issues_verifiable_token() {
        let dir = UserDirectory::new();
        let id = dir.create_user(new_user("m@example.com", Role::Manager)).unwrap();
        let codec = Arc::new(TokenCodec::new("login-secret").unwrap());
        let provider = LocalAuthProvider::new(dir, codec.clone());
        let resp = provider.login(&LoginRequest { email: "m@example.com".into(), password: "correct horse".into() }).unwrap();
        assert_eq!(resp.identity, id);
        assert_eq!(codec.verify(&resp.token), Some(id));
        let bad = provider.login(&LoginRequest { email: "m@example.com".into(), password: "nope".into() });
        assert!(matches!(bad, Err(AppError::Auth { .. })));
    }
}
