// ABOUTME: Database connections an application needs provisioned in its server.
// ABOUTME: Each kind knows its server layer, driver module and XA datasource class.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Postgres,
}

impl DatabaseKind {
    /// Server layer that must be provisioned for this kind of database.
    pub fn layer(&self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgresql-datasource",
        }
    }

    pub fn driver_name(&self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgresql",
        }
    }

    pub fn module(&self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "org.postgresql.jdbc",
        }
    }

    pub fn xa_datasource_class(&self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "org.postgresql.xa.PGXADataSource",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown database kind '{0}' (expected: postgres)")]
pub struct ParseDatabaseKindError(String);

impl FromStr for DatabaseKind {
    type Err = ParseDatabaseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseKind::Postgres),
            _ => Err(ParseDatabaseKindError(s.to_string())),
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DatabaseKind::Postgres => "postgres",
        })
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConnection {
    pub jndi_name: String,
    pub kind: DatabaseKind,
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("jndi_name", &self.jndi_name)
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
