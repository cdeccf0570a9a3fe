//! Edge check run before routing.
//!
//! Browser navigations without a credential are sent to the login page; API
//! calls without one pass through so the route can answer with a structured
//! 401. Presence is all that is checked here; verification belongs to the
//! session resolver.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
    api_prefix: String,
    public_paths: Vec<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new("/login", "/api", ["/login", "/api/auth/login"])
    }
}

impl RouteGuard {
    pub fn new<I, S>(login_path: &str, api_prefix: &str, public_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            login_path: login_path.to_string(),
            api_prefix: api_prefix.trim_end_matches('/').to_string(),
            public_paths: public_paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn login_path(&self) -> &str { &self.login_path }

    pub fn is_public(&self, path: &str) -> bool {
        let p = normalize(path);
        self.public_paths.iter().any(|pub_path| normalize(pub_path) == p)
    }

    /// `/api` and anything below it; `/apis` is not API.
    pub fn is_api(&self, path: &str) -> bool {
        let p = normalize(path);
        p == self.api_prefix || p.starts_with(&format!("{}/", self.api_prefix))
    }

    pub fn guard(&self, path: &str, credential_present: bool) -> GuardDecision {
        if self.is_public(path) || credential_present || self.is_api(path) {
            return GuardDecision::Allow;
        }
        GuardDecision::Redirect(self.login_path.clone())
    }
}

fn normalize(path: &str) -> &str {
    let p = path.split(['?', '#']).next().unwrap_or(path);
    if p.len() > 1 { p.trim_end_matches('/') } else { p }
}
