use std::collections::HashMap;
use std::sync::Arc;

use super::principal::Identity;
use super::token::TokenCodec;

/// Cookie carrying the session credential in browser flows.
pub const SESSION_COOKIE: &str = "auth-token";

/// Request-scoped store of already-parsed credentials. The route layer
/// implements this over its own request type; the resolver never sees raw
/// headers.
pub trait CredentialSource {
    fn cookie(&self, name: &str) -> Option<String>;

    /// Bearer credential for programmatic clients. Consulted only when the
    /// session cookie is absent.
    fn bearer(&self) -> Option<String> { None }
}

impl CredentialSource for HashMap<String, String> {
    fn cookie(&self, name: &str) -> Option<String> { self.get(name).cloned() }
}

/// Turns an inbound request's credential into the current identity.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    codec: Arc<TokenCodec>,
}

impl SessionResolver {
    pub fn new(codec: Arc<TokenCodec>) -> Self { Self { codec } }

    pub fn codec(&self) -> &TokenCodec { &self.codec }

    /// Anonymous (`None`) when no credential is present or when it fails
    /// verification; the two cases are indistinguishable to callers.
    pub fn resolve<S: CredentialSource + ?Sized>(&self, source: &S) -> Option<Identity> {
        let token = Self::credential(source)?;
        self.codec.verify(&token)
    }

    /// Whether the request carries any credential at all, verified or not.
    pub fn credential_present<S: CredentialSource + ?Sized>(source: &S) -> bool {
        Self::credential(source).is_some()
    }

    fn credential<S: CredentialSource + ?Sized>(source: &S) -> Option<String> {
        source
            .cookie(SESSION_COOKIE)
            .or_else(|| source.bearer())
            .filter(|t| !t.trim().is_empty())
    }
}
