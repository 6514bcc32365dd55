//! Branches and actor roles

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A physical store location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
}

/// Role of the authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Owner,
    Admin,
    Cashier,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Owner => "OWNER",
            ActorRole::Admin => "ADMIN",
            ActorRole::Cashier => "CASHIER",
        }
    }

    /// Only owners may look at or act on other branches.
    pub fn spans_branches(&self) -> bool {
        matches!(self, ActorRole::Owner)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Ok(ActorRole::Owner),
            "ADMIN" => Ok(ActorRole::Admin),
            "CASHIER" => Ok(ActorRole::Cashier),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}
