// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The startup configuration, optionally persisted as a YAML file

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use model::{ConfigKey, ConfigKeyVal, ConfigStatus, Datatype, UpllError, UpllResult};

use crate::configmgr::MgrState;
use crate::rename::{RenameEntry, RenameTable};
use crate::table::Record;

/// Version of the startup file format
pub const STARTUP_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed startup file: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("Unsupported startup file version {0}")]
    Version(u32),
}

impl From<StartupError> for UpllError {
    fn from(e: StartupError) -> Self {
        UpllError::Internal(e.to_string())
    }
}

/// Contents of a startup file
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StartupFile {
    pub version: u32,
    #[serde(default)]
    pub configs: Vec<ConfigKeyVal>,
    #[serde(default)]
    pub renames: Vec<RenameEntry>,
}

impl StartupFile {
    pub fn read(path: &Path) -> Result<Self, StartupError> {
        let text = std::fs::read_to_string(path)?;
        let file: StartupFile = serde_yaml_ng::from_str(&text)?;
        if file.version != STARTUP_VERSION {
            return Err(StartupError::Version(file.version));
        }
        Ok(file)
    }

    pub fn write(&self, path: &Path) -> Result<(), StartupError> {
        let text = serde_yaml_ng::to_string(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

impl MgrState {
    /// Make the running configuration the one loaded at startup
    pub(crate) fn save_startup(&mut self) -> UpllResult<()> {
        self.db.copy(Datatype::Running, Datatype::Startup);
        if let Some(path) = &self.startup_path {
            let file = StartupFile {
                version: STARTUP_VERSION,
                configs: self
                    .db
                    .rows(Datatype::Startup)
                    .map(|(key, record)| {
                        let mut ckv = ConfigKeyVal::new(key.clone());
                        ckv.val.clone_from(&record.val);
                        ckv.ctrlr_dom.clone_from(&record.ctrlr_dom);
                        ckv
                    })
                    .collect(),
                renames: self.renames.entries(),
            };
            file.write(path)?;
            info!(
                "Saved {} objects to {}",
                file.configs.len(),
                path.display()
            );
        }
        Ok(())
    }

    /// Replace the whole configuration by the startup one. Objects are not applied
    /// anywhere until their controllers are audited.
    pub(crate) fn load_startup(&mut self) -> UpllResult<()> {
        if let Some(path) = self.startup_path.clone() {
            if path.exists() {
                let file = StartupFile::read(&path)?;
                self.db.clear(Datatype::Startup);
                for ckv in file.configs {
                    self.db
                        .put(Datatype::Startup, ckv.key, Record::new(ckv.val, ckv.ctrlr_dom));
                }
                self.renames = RenameTable::from_entries(&file.renames);
                info!("Loaded startup configuration from {}", path.display());
            } else {
                warn!("No startup file at {}", path.display());
            }
        }
        self.db.copy(Datatype::Startup, Datatype::Running);

        let statuses: Vec<(ConfigKey, Vec<String>)> = self
            .db
            .rows(Datatype::Running)
            .map(|(key, record)| {
                let ctrlrs = self.mgrs.ctrlrs_of(&self.db, Datatype::Running, key, record);
                (key.clone(), ctrlrs.into_keys().collect())
            })
            .collect();
        for (key, ctrlrs) in statuses {
            let Ok(mgr) = self.mgrs.get(key.key_type()) else {
                continue;
            };
            let Some(record) = self.db.get_mut(Datatype::Running, &key) else {
                continue;
            };
            record.reset_status();
            record.flags.renamed = ctrlrs.iter().any(|c| self.renames.is_renamed(c, &key));
            for ctrlr in &ctrlrs {
                mgr.update_config_status(record, ctrlr, ConfigStatus::NotApplied);
            }
            if ctrlrs.is_empty() {
                record.recompute_status();
            }
        }
        self.db.copy(Datatype::Running, Datatype::Candidate);
        self.oper.prune(&self.db);
        debug!(
            "Startup configuration has {} objects",
            self.db.len(Datatype::Running)
        );
        Ok(())
    }

    /// Forget the startup configuration
    pub(crate) fn clear_startup(&mut self) -> UpllResult<()> {
        self.db.clear(Datatype::Startup);
        if let Some(path) = &self.startup_path
            && path.exists()
        {
            std::fs::remove_file(path).map_err(StartupError::from)?;
            info!("Removed {}", path.display());
        }
        Ok(())
    }
}
