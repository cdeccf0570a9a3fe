//! Axum routes for the relationship-management API.
//!
//! Responsibilities:
//! - Session handling with a signed, http-only cookie (or bearer header).
//! - Login/logout/me endpoints backed by the `identity` module.
//! - Role-gated user administration.
//! - Scoped reads of, and user-authored writes to, the activity trail.
//! - The route guard middleware in front of every route.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::{info, warn};

use crate::activity::{ActivityRecorder, ActivityStore, JsonlActivityStore, MemoryActivityStore};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::guard::{GuardDecision, RouteGuard};
use crate::identity::{
    ensure_default_admin, CredentialSource, Identity, LocalAuthProvider, SessionResolver, TokenCodec, UserDirectory,
    SESSION_COOKIE, TOKEN_TTL_SECS,
};

pub mod auth;
pub mod users;
pub mod activities;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionResolver,
    pub auth: Arc<LocalAuthProvider>,
    pub users: UserDirectory,
    pub activities: ActivityRecorder,
    pub guard: Arc<RouteGuard>,
    pub secure_cookies: bool,
}

impl AppState {
    /// Wire the core together. Fails when the signing secret is unusable.
    pub fn new(config: &AppConfig, users: UserDirectory, store: Arc<dyn ActivityStore>) -> AppResult<Self> {
        let codec = Arc::new(TokenCodec::new(&config.jwt_secret)?);
        Ok(Self {
            sessions: SessionResolver::new(codec.clone()),
            auth: Arc::new(LocalAuthProvider::new(users.clone(), codec)),
            users,
            activities: ActivityRecorder::new(store),
            guard: Arc::new(RouteGuard::default()),
            secure_cookies: config.secure_cookies(),
        })
    }

    /// Current identity for this request, or `None` for anonymous.
    pub fn identity(&self, headers: &HeaderMap) -> Option<Identity> {
        self.sessions.resolve(&RequestCredentials(headers))
    }

    pub fn require_identity(&self, headers: &HeaderMap) -> AppResult<Identity> {
        self.identity(headers).ok_or_else(AppError::unauthenticated)
    }
}

/// Build the full router with all routes and the guard middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/login", get(login_page))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/activities", get(activities::list_activities).post(activities::create_activity))
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .with_state(state)
}

fn activity_store_for(config: &AppConfig) -> Arc<dyn ActivityStore> {
    match &config.activity_log {
        Some(path) => {
            info!(target: "startup", path = %path.display(), "activity trail: jsonl file");
            Arc::new(JsonlActivityStore::new(path))
        }
        None => {
            info!(target: "startup", "activity trail: in-memory");
            Arc::new(MemoryActivityStore::new())
        }
    }
}

/// Start the HTTP server. Configuration errors surface before binding.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!(target: "startup", ?config, "crmcore starting");

    let users = UserDirectory::new();
    if let Some((email, password)) = &config.bootstrap_admin {
        ensure_default_admin(&users, email, password).context("While seeding bootstrap admin")?;
    }
    if users.is_empty() {
        warn!(target: "startup", "no accounts configured; set CRM_ADMIN_EMAIL and CRM_ADMIN_PASSWORD to seed an admin");
    }

    let state = AppState::new(&config, users, activity_store_for(&config))?;
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn route_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let present = SessionResolver::credential_present(&RequestCredentials(req.headers()));
    match state.guard.guard(req.uri().path(), present) {
        GuardDecision::Allow => next.run(req).await,
        GuardDecision::Redirect(to) => Redirect::to(&to).into_response(),
    }
}

async fn landing(State(state): State<AppState>, headers: HeaderMap) -> Response {
    // A cookie that was present but failed verification lands here
    match state.identity(&headers) {
        Some(id) => format!("crmcore ok: {}", id.display_name()).into_response(),
        None => Redirect::to(state.guard.login_path()).into_response(),
    }
}

async fn login_page() -> &'static str {
    "crmcore login: POST credentials to /api/auth/login"
}

/// Header-backed credential source handed to the session resolver.
pub struct RequestCredentials<'a>(pub &'a HeaderMap);

impl CredentialSource for RequestCredentials<'_> {
    fn cookie(&self, name: &str) -> Option<String> {
        parse_cookie(self.0, name)
    }

    fn bearer(&self) -> Option<String> {
        let v = self.0.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = v.trim().split_once(' ')?;
        if scheme.eq_ignore_ascii_case("bearer") { Some(token.trim().to_string()) } else { None }
    }
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(COOKIE) {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
    }
    None
}

fn set_session_cookie(token: &str, secure: bool) -> AppResult<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        SESSION_COOKIE, token, TOKEN_TTL_SECS, secure
    ))
    .map_err(|e| AppError::internal("cookie_encode_failed".to_string(), e.to_string()))
}

fn clear_session_cookie(secure: bool) -> HeaderValue {
    let value = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT{}",
        SESSION_COOKIE,
        if secure { "; Secure" } else { "" }
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("auth-token=; Max-Age=0; Path=/"))
}

pub(crate) fn with_cookie(mut headers: HeaderMap, value: HeaderValue) -> HeaderMap {
    headers.insert(SET_COOKIE, value);
    headers
}
