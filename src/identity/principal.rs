use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Privilege levels, declared lowest first so the derived ordering matches
/// the hierarchy: `SalesRep < Manager < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SalesRep,
    Manager,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::SalesRep, Role::Manager, Role::Admin];

    pub fn rank(self) -> u8 {
        match self {
            Role::SalesRep => 1,
            Role::Manager => 2,
            Role::Admin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SalesRep => "salesrep",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "salesrep" => Ok(Role::SalesRep),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(crate::error::AppError::user("invalid_role".to_string(), format!("unknown role '{}'", other))),
        }
    }
}

/// The authenticated principal reconstructed from a verified credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Identity {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() { self.email.clone() } else { full.to_string() }
    }
}
