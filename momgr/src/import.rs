// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Import of the configuration of a controller.
//!
//! The configuration is read into the IMPORT datatype, where VTNs and flow lists may
//! be renamed to avoid clashes. A merge then adds the imported objects to CANDIDATE
//! and RUNNING, all or nothing.

use tracing::{debug, info, warn};

use model::validate::check_name;
use model::{ConfigKey, ConfigStatus, ConfigVal, Datatype, KeyType, UpllError, UpllResult};

use crate::configmgr::MgrState;
use crate::mgrs::check_vnode_name;
use crate::rename::{RenameTable, Towards};
use crate::table::Record;

/// An import in progress
#[derive(Debug)]
pub(crate) struct ImportState {
    /// the controller the configuration comes from
    pub(crate) ctrlr: String,
    /// renames done on the imported objects
    pub(crate) renames: RenameTable,
}

impl MgrState {
    fn import_state(&self) -> UpllResult<&ImportState> {
        self.import
            .as_ref()
            .ok_or_else(|| UpllError::NotAllowedAtThisTime("no import in progress".to_owned()))
    }

    /// Read the configuration of a controller into IMPORT. Returns the number of
    /// objects read.
    pub(crate) fn import_ctrlr_config(&mut self, ctrlr: &str) -> UpllResult<u32> {
        if let Some(state) = &self.import {
            return Err(UpllError::NotAllowedAtThisTime(format!(
                "import from controller {} in progress",
                state.ctrlr
            )));
        }
        let Some(driver) = self.drivers.get(ctrlr) else {
            return Err(UpllError::DriverNotPresent(ctrlr.to_owned()));
        };
        if !self.drivers.is_connected(ctrlr) {
            return Err(UpllError::CtrlrDisconnected(ctrlr.to_owned()));
        }
        let found = driver
            .read_config()
            .map_err(|_| UpllError::CtrlrDisconnected(ctrlr.to_owned()))?;

        let mut rows = Vec::with_capacity(found.len());
        for ckv in &found {
            let ckv = self.renames.translate_ckv(ctrlr, ckv, Towards::Unc);
            self.mgrs.get(ckv.key_type())?.validate_key(&ckv.key)?;
            let mut record = Record::new(ckv.val, ckv.ctrlr_dom);
            record.flags.imported = true;
            rows.push((ckv.key, record));
        }
        let count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        self.db.clear(Datatype::Import);
        for (key, record) in rows {
            self.db.put(Datatype::Import, key, record);
        }
        self.import = Some(ImportState {
            ctrlr: ctrlr.to_owned(),
            renames: RenameTable::new(),
        });
        info!("Imported {count} objects from controller {ctrlr}");
        Ok(count)
    }

    /// Rename an imported VTN or flow list. The controller keeps knowing the
    /// object by its original name.
    pub(crate) fn rename_imported(
        &mut self,
        kt: KeyType,
        old_name: &str,
        new_name: &str,
    ) -> UpllResult<()> {
        let ctrlr = self.import_state()?.ctrlr.clone();
        let (old_key, new_key) = match kt {
            KeyType::Vtn => (ConfigKey::vtn(old_name), ConfigKey::vtn(new_name)),
            KeyType::FlowList => (ConfigKey::flowlist(old_name), ConfigKey::flowlist(new_name)),
            _ => {
                return Err(UpllError::BadRequest(format!(
                    "objects of type {kt} cannot be renamed"
                )));
            }
        };
        check_name("new_name", new_name)?;
        if !self.db.exists(Datatype::Import, &old_key) {
            return Err(UpllError::NoSuchInstance(old_key));
        }
        if self.db.exists(Datatype::Import, &new_key) {
            return Err(UpllError::InstanceExists(new_key));
        }

        let mut moved: Vec<(ConfigKey, ConfigKey)> = vec![];
        let mut relinked: Vec<ConfigKey> = vec![];
        for (key, record) in self.db.rows(Datatype::Import) {
            match kt {
                KeyType::Vtn if key.vtn_name() == Some(old_name) => {
                    moved.push((key.clone(), key.with_vtn_name(new_name)));
                }
                KeyType::FlowList if key.flowlist_name() == Some(old_name) => {
                    moved.push((key.clone(), key.with_flowlist_name(new_name)));
                }
                KeyType::FlowList
                    if record.val.as_ref().and_then(ConfigVal::flowlist_ref) == Some(old_name) =>
                {
                    relinked.push(key.clone());
                }
                _ => {}
            }
        }
        for (from, to) in moved {
            if let Some(mut record) = self.db.remove(Datatype::Import, &from) {
                record.flags.renamed = true;
                self.db.put(Datatype::Import, to, record);
            }
        }
        for key in relinked {
            if let Some(val) = self
                .db
                .get_mut(Datatype::Import, &key)
                .and_then(|r| r.val.as_mut())
            {
                val.set_flowlist_ref(new_name);
            }
        }

        let Some(state) = self.import.as_mut() else {
            return Err(UpllError::NotAllowedAtThisTime("no import in progress".to_owned()));
        };
        let known_as = match state
            .renames
            .entries()
            .into_iter()
            .find(|e| e.kt == kt && e.unc_name == old_name)
        {
            Some(entry) => entry.ctrlr_name,
            None => self.renames.translate(&ctrlr, kt, old_name, Towards::Ctrlr),
        };
        state.renames.remove(kt, old_name);
        state.renames.add(&ctrlr, kt, new_name, &known_as);
        info!("Imported {kt} '{old_name}' renamed to '{new_name}'");
        Ok(())
    }

    /// Check that the imported objects can be added to the configuration. Returns
    /// the keys of the objects not configured yet.
    fn check_merge(&self) -> UpllResult<Vec<ConfigKey>> {
        let mut added = vec![];
        for (key, record) in self.db.rows(Datatype::Import) {
            if let Some(existing) = self.db.get(Datatype::Candidate, key) {
                if existing.val != record.val {
                    warn!("Imported {key} differs from the candidate configuration");
                    return Err(UpllError::MergeConflict(key.clone()));
                }
                continue;
            }
            if key.key_type().is_vnode() {
                check_vnode_name(key, &self.db, Datatype::Candidate)
                    .map_err(|_| UpllError::MergeConflict(key.clone()))?;
            }
            if let Some(parent) = key.parent_key()
                && !self.db.exists(Datatype::Import, &parent)
                && !(self.db.exists(Datatype::Running, &parent)
                    && self.db.exists(Datatype::Candidate, &parent))
            {
                return Err(UpllError::ParentDoesNotExist(key.clone()));
            }
            added.push(key.clone());
        }
        Ok(added)
    }

    /// Merge the imported configuration into CANDIDATE and RUNNING. Nothing is
    /// merged if any imported object conflicts.
    pub(crate) fn merge_import(&mut self) -> UpllResult<()> {
        let ctrlr = self.import_state()?.ctrlr.clone();
        let added = self.check_merge()?;

        for dt in [Datatype::Candidate, Datatype::Running] {
            for key in &added {
                if self.db.exists(dt, key) {
                    continue;
                }
                let Some(imported) = self.db.get(Datatype::Import, key) else {
                    continue;
                };
                let mut record = Record::new(imported.val.clone(), imported.ctrlr_dom.clone());
                record.flags = imported.flags;
                if record.ctrlr_dom.is_none() {
                    record.ctrlr_dom =
                        self.mgrs
                            .resolve_ctrlr_dom(&self.db, dt, key, record.val.as_ref());
                }
                self.db.put(dt, key.clone(), record);
            }
            let held: Vec<ConfigKey> = self
                .db
                .rows(Datatype::Import)
                .map(|(k, _)| k.clone())
                .filter(|k| {
                    self.db.get(dt, k).is_some_and(|r| {
                        self.mgrs.ctrlrs_of(&self.db, dt, k, r).contains_key(&ctrlr)
                    })
                })
                .collect();
            for key in held {
                let Ok(mgr) = self.mgrs.get(key.key_type()) else {
                    continue;
                };
                if let Some(record) = self.db.get_mut(dt, &key) {
                    mgr.update_config_status(record, &ctrlr, ConfigStatus::Applied);
                }
            }
        }
        for key in &added {
            for dt in [Datatype::Candidate, Datatype::Running] {
                if let Some(record) = self.db.get_mut(dt, key)
                    && record.ctrlr_status.is_empty()
                {
                    record.recompute_status();
                }
            }
        }

        if let Some(state) = self.import.take() {
            self.renames.extend(state.renames);
        }
        self.db.clear(Datatype::Import);
        info!("Merged {} objects imported from controller {ctrlr}", added.len());
        Ok(())
    }

    /// Drop the imported configuration
    pub(crate) fn clear_import(&mut self) {
        if let Some(state) = self.import.take() {
            debug!("Dropping configuration imported from controller {}", state.ctrlr);
        }
        self.db.clear(Datatype::Import);
    }
}
