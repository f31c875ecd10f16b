// ABOUTME: The Application aggregate: archives, config overrides and change timestamps.
// ABOUTME: Change timestamps drive staged-change detection in status queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Archive, ConfigKind, DatabaseConnection};
use crate::types::AppName;

/// Application-level config overrides, one optional blob per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigBlobs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xml: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cli: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    yml: Option<String>,
}

impl ConfigBlobs {
    fn slot(&mut self, kind: ConfigKind) -> &mut Option<String> {
        match kind {
            ConfigKind::Xml => &mut self.xml,
            ConfigKind::Cli => &mut self.cli,
            ConfigKind::Yml => &mut self.yml,
        }
    }

    pub fn get(&self, kind: ConfigKind) -> Option<&str> {
        match kind {
            ConfigKind::Xml => self.xml.as_deref(),
            ConfigKind::Cli => self.cli.as_deref(),
            ConfigKind::Yml => self.yml.as_deref(),
        }
    }

    pub fn has(&self, kind: ConfigKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn set(&mut self, kind: ConfigKind, contents: String) {
        *self.slot(kind) = Some(contents);
    }

    /// Returns the removed contents, if any.
    pub fn clear(&mut self, kind: ConfigKind) -> Option<String> {
        self.slot(kind).take()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ConfigKind> + '_ {
        ConfigKind::ALL.into_iter().filter(|k| self.has(*k))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: AppName,
    #[serde(default)]
    pub archives: Vec<Archive>,
    #[serde(default)]
    pub configs: ConfigBlobs,
    #[serde(default)]
    pub databases: Vec<DatabaseConnection>,
    pub last_archive_change: DateTime<Utc>,
    pub last_config_change: DateTime<Utc>,
}

impl Application {
    pub fn new(name: AppName) -> Self {
        let now = Utc::now();
        Self {
            name,
            archives: Vec::new(),
            configs: ConfigBlobs::default(),
            databases: Vec::new(),
            last_archive_change: now,
            last_config_change: now,
        }
    }

    pub fn archive(&self, file_name: &str) -> Option<&Archive> {
        self.archives.iter().find(|a| a.file_name == file_name)
    }

    /// The archive, other than `except`, that already supplies `kind`.
    pub fn archive_supplying(&self, kind: ConfigKind, except: &str) -> Option<&Archive> {
        self.archives
            .iter()
            .find(|a| a.file_name != except && a.config_files.contains(kind))
    }

    /// Latest local edit to archives or config.
    pub fn last_change(&self) -> DateTime<Utc> {
        self.last_archive_change.max(self.last_config_change)
    }

    pub fn touch_archives(&mut self) {
        self.last_archive_change = Utc::now();
    }

    pub fn touch_config(&mut self) {
        self.last_config_change = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConfigFiles;

    #[test]
    fn blobs_set_get_clear_per_kind() {
        let mut blobs = ConfigBlobs::default();
        blobs.set(ConfigKind::Yml, "a: b".to_string());
        assert!(blobs.has(ConfigKind::Yml));
        assert!(!blobs.has(ConfigKind::Xml));
        assert_eq!(blobs.get(ConfigKind::Yml), Some("a: b"));
        assert_eq!(blobs.kinds().collect::<Vec<_>>(), vec![ConfigKind::Yml]);

        assert_eq!(blobs.clear(ConfigKind::Yml).as_deref(), Some("a: b"));
        assert!(!blobs.has(ConfigKind::Yml));
        assert!(blobs.clear(ConfigKind::Yml).is_none());
    }

    #[test]
    fn archive_supplying_skips_the_excluded_archive() {
        let mut app = Application::new(AppName::new("demo").unwrap());
        let files = ConfigFiles {
            cli: true,
            ..Default::default()
        };
        app.archives.push(Archive::new("a.war", files));

        assert!(app.archive_supplying(ConfigKind::Cli, "a.war").is_none());
        assert_eq!(
            app.archive_supplying(ConfigKind::Cli, "b.war")
                .map(|a| a.file_name.as_str()),
            Some("a.war")
        );
        assert!(app.archive_supplying(ConfigKind::Xml, "b.war").is_none());
    }
}
