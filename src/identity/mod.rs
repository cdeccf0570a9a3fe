//! Identity and access control: signed session credentials, the role
//! hierarchy, and row-level visibility scopes.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod token;
mod session;
mod authorizer;
mod scope;
mod provider;

pub use principal::{Identity, Role};
pub use token::{SessionToken, TokenCodec, TOKEN_TTL_SECS};
pub use session::{CredentialSource, SessionResolver, SESSION_COOKIE};
pub use authorizer::{allowed_roles, at_least, require_at_least, require_one_of};
pub use scope::{activity_scope, scope_for, Filter, ResourceKind};
pub use provider::{ensure_default_admin, AuthProvider, LocalAuthProvider, LoginRequest, LoginResponse, NewUser, UserDirectory, UserSummary};
