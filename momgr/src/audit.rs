// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Audit: bring a controller back in line with the running configuration.
//!
//! The configuration of the controller is read into the AUDIT datatype and diffed
//! against the share of RUNNING the controller should hold. The differences are
//! pushed in a single transaction, after which every object of that controller is
//! applied there.

use std::collections::BTreeMap;
use tracing::{debug, error, info};

use model::{ConfigKey, ConfigStatus, Datatype, UpllError, UpllResult};

use crate::configmgr::MgrState;
use crate::driver::DriverRequest;
use crate::rename::Towards;
use crate::table::Record;

impl MgrState {
    /// Fill the AUDIT datatype with the configuration of a controller, named as here
    fn read_for_audit(&mut self, ctrlr: &str) -> UpllResult<()> {
        let Some(driver) = self.drivers.get(ctrlr) else {
            return Err(UpllError::DriverNotPresent(ctrlr.to_owned()));
        };
        let found = driver
            .read_config()
            .map_err(|e| UpllError::AuditFailed(ctrlr.to_owned(), e.to_string()))?;
        self.db.clear(Datatype::Audit);
        for ckv in found {
            let ckv = self.renames.translate_ckv(ctrlr, &ckv, Towards::Unc);
            self.db
                .put(Datatype::Audit, ckv.key, Record::new(ckv.val, ckv.ctrlr_dom));
        }
        debug!(
            "Read {} objects from controller {ctrlr}",
            self.db.len(Datatype::Audit)
        );
        Ok(())
    }

    /// Mark the objects of `dt` held by `ctrlr` as applied there
    fn mark_applied(&mut self, dt: Datatype, ctrlr: &str) {
        let held: Vec<ConfigKey> = self
            .db
            .rows(dt)
            .filter(|(key, record)| {
                self.mgrs
                    .ctrlrs_of(&self.db, dt, key, record)
                    .contains_key(ctrlr)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in held {
            let Ok(mgr) = self.mgrs.get(key.key_type()) else {
                continue;
            };
            if let Some(record) = self.db.get_mut(dt, &key) {
                mgr.update_config_status(record, ctrlr, ConfigStatus::Applied);
            }
        }
    }

    /// Audit one controller. Returns the number of changes pushed to it.
    pub(crate) fn audit(&mut self, ctrlr: &str) -> UpllResult<u32> {
        if !self.drivers.contains(ctrlr) {
            return Err(UpllError::DriverNotPresent(ctrlr.to_owned()));
        }
        if !self.drivers.is_connected(ctrlr) {
            return Err(UpllError::CtrlrDisconnected(ctrlr.to_owned()));
        }
        info!("Auditing controller {ctrlr}");
        self.read_for_audit(ctrlr)?;

        let expected = self.share(Datatype::Running, ctrlr);
        let actual = self.db.view(Datatype::Audit);
        let requests = self.plan(ctrlr, &expected, &actual, true);
        let pushed = u32::try_from(requests.len()).unwrap_or(u32::MAX);
        if !requests.is_empty() {
            let plans: BTreeMap<String, Vec<DriverRequest>> =
                std::iter::once((ctrlr.to_owned(), requests)).collect();
            let outcome = self
                .prepare_tx(&plans)
                .map_err(|(_, e)| e.to_string())
                .and_then(|()| {
                    if self.commit_tx([ctrlr.to_owned()]).is_empty() {
                        Ok(())
                    } else {
                        Err("commit failed".to_owned())
                    }
                });
            if let Err(reason) = outcome {
                error!("Audit of controller {ctrlr} failed: {reason}");
                self.db.clear(Datatype::Audit);
                return Err(UpllError::AuditFailed(ctrlr.to_owned(), reason));
            }
        }

        self.mark_applied(Datatype::Running, ctrlr);
        self.mark_applied(Datatype::Candidate, ctrlr);
        self.db.clear(Datatype::Audit);
        info!("Audit of controller {ctrlr} done: {pushed} changes");
        Ok(pushed)
    }
}
