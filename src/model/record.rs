// ABOUTME: Bookkeeping for a single deployment attempt.
// ABOUTME: An open record (no end time) is the per-application deployment lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AppName, RecordId};

/// Terminal outcome of a deployment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: RecordId,
    pub application: AppName,
    /// Host and process that opened the attempt.
    pub holder: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Set once the build submission call has returned successfully.
    pub build_triggered: bool,
    /// Only meaningful once `end_time` is set.
    pub status: Option<DeploymentStatus>,
}

impl DeploymentRecord {
    /// A new open attempt for `application`, started now.
    pub fn open(application: &AppName) -> Self {
        Self {
            id: RecordId::generate(),
            application: application.clone(),
            holder: format!(
                "{}:{}",
                gethostname::gethostname().to_string_lossy(),
                std::process::id()
            ),
            start_time: Utc::now(),
            end_time: None,
            build_triggered: false,
            status: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Close the attempt. Has no effect on an already closed record.
    pub fn close(&mut self, status: DeploymentStatus, at: DateTime<Utc>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.end_time = Some(at);
        self.status = Some(status);
        true
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeploymentStatus::Completed => "COMPLETED",
            DeploymentStatus::Failed => "FAILED",
            DeploymentStatus::Cancelled => "CANCELLED",
        })
    }
}

impl fmt::Display for DeploymentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deployment {} of '{}' started {} by {}",
            self.id,
            self.application,
            self.start_time.to_rfc3339(),
            self.holder
        )
    }
}
