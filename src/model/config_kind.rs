// ABOUTME: The closed set of server configuration file kinds.
// ABOUTME: One enum with uniform naming instead of one accessor type per kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Location of config files inside a deployable archive.
const ARCHIVE_CONFIG_ROOT: &str = "WEB-INF/classes/META-INF/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    /// `server-config.xml`: structural server descriptor (layers).
    Xml,
    /// `server-init.cli`: management script run at server start.
    Cli,
    /// `server-init.yml`: YAML server configuration.
    Yml,
}

#[derive(Debug, Error)]
#[error("unknown config kind '{0}', expected one of: xml, cli, yml")]
pub struct ParseConfigKindError(String);

impl ConfigKind {
    pub const ALL: [ConfigKind; 3] = [ConfigKind::Xml, ConfigKind::Cli, ConfigKind::Yml];

    /// File name of this kind when staged next to the archives.
    pub fn file_name(&self) -> &'static str {
        match self {
            ConfigKind::Xml => "server-config.xml",
            ConfigKind::Cli => "server-init.cli",
            ConfigKind::Yml => "server-init.yml",
        }
    }

    /// Entry path of this kind inside an archive.
    pub fn archive_entry(&self) -> String {
        format!("{}{}", ARCHIVE_CONFIG_ROOT, self.file_name())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Xml => "xml",
            ConfigKind::Cli => "cli",
            ConfigKind::Yml => "yml",
        }
    }
}

impl FromStr for ConfigKind {
    type Err = ParseConfigKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xml" => Ok(ConfigKind::Xml),
            "cli" => Ok(ConfigKind::Cli),
            "yml" => Ok(ConfigKind::Yml),
            other => Err(ParseConfigKindError(other.to_string())),
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
