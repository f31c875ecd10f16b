// ABOUTME: Plain-data store state shared by the memory and file backends.
// ABOUTME: All lock-invariant checks live here so both backends enforce them identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ApplicationEdit, StoreError};
use crate::model::{Application, DeploymentRecord, DeploymentStatus};
use crate::types::{AppName, RecordId};

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    applications: BTreeMap<AppName, Application>,
    #[serde(default)]
    records: Vec<DeploymentRecord>,
}

impl Snapshot {
    pub fn create_application(&mut self, app: Application) -> Result<(), StoreError> {
        if self.applications.contains_key(&app.name) {
            return Err(StoreError::ApplicationExists(app.name.to_string()));
        }
        self.applications.insert(app.name.clone(), app);
        Ok(())
    }

    pub fn application(&self, name: &AppName) -> Option<Application> {
        self.applications.get(name).cloned()
    }

    pub fn applications(&self) -> Vec<Application> {
        self.applications.values().cloned().collect()
    }

    pub fn update_application(
        &mut self,
        name: &AppName,
        edit: ApplicationEdit<'_>,
    ) -> Result<bool, StoreError> {
        if let Some(open) = self.open_record(name) {
            return Err(StoreError::LockHeld {
                app: name.to_string(),
                record: Box::new(open),
            });
        }
        let Some(existing) = self.applications.get_mut(name) else {
            return Err(StoreError::ApplicationNotFound(name.to_string()));
        };
        let mut draft = existing.clone();
        if !edit(&mut draft) {
            return Ok(false);
        }
        *existing = draft;
        Ok(true)
    }

    pub fn delete_application(&mut self, name: &AppName) -> Result<(), StoreError> {
        if self.applications.remove(name).is_none() {
            return Err(StoreError::ApplicationNotFound(name.to_string()));
        }
        self.records.retain(|r| &r.application != name);
        Ok(())
    }

    pub fn create_record(&mut self, record: DeploymentRecord) -> Result<(), StoreError> {
        if !self.applications.contains_key(&record.application) {
            return Err(StoreError::ApplicationNotFound(
                record.application.to_string(),
            ));
        }
        if let Some(open) = self.open_record(&record.application) {
            return Err(StoreError::LockHeld {
                app: record.application.to_string(),
                record: Box::new(open),
            });
        }
        self.records.push(record);
        Ok(())
    }

    fn record_mut(&mut self, id: &RecordId) -> Result<&mut DeploymentRecord, StoreError> {
        self.records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))
    }

    pub fn mark_build_triggered(&mut self, id: &RecordId) -> Result<(), StoreError> {
        self.record_mut(id)?.build_triggered = true;
        Ok(())
    }

    pub fn close_record(
        &mut self,
        id: &RecordId,
        status: DeploymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        let record = self.record_mut(id)?;
        if record.close(status, at) {
            Ok(Some(record.clone()))
        } else {
            Ok(None)
        }
    }

    pub fn open_record(&self, name: &AppName) -> Option<DeploymentRecord> {
        self.records
            .iter()
            .find(|r| &r.application == name && r.is_open())
            .cloned()
    }

    pub fn open_records(&self) -> Vec<DeploymentRecord> {
        self.records.iter().filter(|r| r.is_open()).cloned().collect()
    }

    pub fn latest_completed_record(&self, name: &AppName) -> Option<DeploymentRecord> {
        self.records
            .iter()
            .filter(|r| &r.application == name && r.status == Some(DeploymentStatus::Completed))
            .max_by_key(|r| r.start_time)
            .cloned()
    }

    pub fn records(&self, name: &AppName) -> Vec<DeploymentRecord> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|r| &r.application == name)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records
    }
}
