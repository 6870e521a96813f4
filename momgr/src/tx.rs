// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Commit of the candidate configuration.
//!
//! The differences between CANDIDATE and RUNNING are computed separately for each
//! controller, over the share of the configuration that controller holds. Every
//! reachable controller gets its changes in a transaction; the transactions are
//! committed only once all of them voted in favor.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

use model::{ConfigKey, ConfigKeyVal, ConfigStatus, Datatype, KeyType, UpllError, UpllResult};

use crate::configmgr::MgrState;
use crate::driver::{Driver, DriverError, DriverRequest};
use crate::rename::Towards;
use crate::table::diff_views;

/// Begin a transaction, send the requests and ask for a vote
fn stage(driver: &mut dyn Driver, requests: &[DriverRequest]) -> Result<(), DriverError> {
    driver.begin_tx()?;
    for request in requests {
        driver.send(request)?;
    }
    driver.vote()
}

impl MgrState {
    /// The objects of datatype `dt` that controller `ctrlr` holds, as that controller
    /// sees them (bound to its own controller and domain)
    pub(crate) fn share(&self, dt: Datatype, ctrlr: &str) -> BTreeMap<ConfigKey, ConfigKeyVal> {
        self.db
            .rows(dt)
            .filter_map(|(key, record)| {
                let ctrlrs = self.mgrs.ctrlrs_of(&self.db, dt, key, record);
                let cd = ctrlrs.get(ctrlr)?;
                let mut ckv = record.to_ckv(key);
                ckv.ctrlr_dom = Some(cd.clone());
                Some((key.clone(), ckv))
            })
            .collect()
    }

    /// All the controllers that objects of `dt` are sent to
    pub(crate) fn ctrlrs_in(&self, dt: Datatype) -> BTreeSet<String> {
        self.db
            .rows(dt)
            .flat_map(|(key, record)| self.mgrs.ctrlrs_of(&self.db, dt, key, record).into_keys())
            .collect()
    }

    /// The requests that turn the `old` share of a controller into the `new` one, with
    /// names as the controller knows them
    pub(crate) fn plan(
        &self,
        ctrlr: &str,
        new: &BTreeMap<ConfigKey, ConfigKeyVal>,
        old: &BTreeMap<ConfigKey, ConfigKeyVal>,
        audit: bool,
    ) -> Vec<DriverRequest> {
        diff_views(new, old, audit)
            .iter()
            .map(|entry| {
                let mut request = DriverRequest::from_diff(entry);
                request.ckv = self.renames.translate_ckv(ctrlr, &request.ckv, Towards::Ctrlr);
                request
            })
            .collect()
    }

    /// Stage and vote the requests of each controller. On any failure, every
    /// transaction begun is aborted.
    pub(crate) fn prepare_tx(
        &mut self,
        plans: &BTreeMap<String, Vec<DriverRequest>>,
    ) -> Result<(), (String, DriverError)> {
        let mut begun: Vec<&str> = vec![];
        let mut outcome = Ok(());
        for (ctrlr, requests) in plans {
            let Some(driver) = self.drivers.get_mut(ctrlr) else {
                continue;
            };
            begun.push(ctrlr);
            if let Err(e) = stage(driver.as_mut(), requests) {
                outcome = Err((ctrlr.clone(), e));
                break;
            }
            debug!("Controller {ctrlr} voted for {} changes", requests.len());
        }
        if outcome.is_err() {
            for ctrlr in begun {
                if let Some(driver) = self.drivers.get_mut(ctrlr) {
                    driver.abort();
                }
            }
        }
        outcome
    }

    /// Commit the prepared transactions. Returns the controllers that failed.
    pub(crate) fn commit_tx(
        &mut self,
        ctrlrs: impl IntoIterator<Item = String>,
    ) -> BTreeSet<String> {
        let mut failed = BTreeSet::new();
        for ctrlr in ctrlrs {
            let Some(driver) = self.drivers.get_mut(&ctrlr) else {
                continue;
            };
            if let Err(e) = driver.commit() {
                error!("Commit at controller {ctrlr} failed: {e}");
                failed.insert(ctrlr);
            }
        }
        failed
    }

    pub(crate) fn commit(&mut self) -> UpllResult<()> {
        let ctrlrs: BTreeSet<String> = self
            .ctrlrs_in(Datatype::Candidate)
            .into_iter()
            .chain(self.ctrlrs_in(Datatype::Running))
            .collect();

        let mut plans = BTreeMap::new();
        let mut skipped = BTreeMap::new();
        for ctrlr in &ctrlrs {
            if !self.drivers.contains(ctrlr) {
                return Err(UpllError::DriverNotPresent(ctrlr.clone()));
            }
            let new = self.share(Datatype::Candidate, ctrlr);
            let old = self.share(Datatype::Running, ctrlr);
            let requests = self.plan(ctrlr, &new, &old, false);
            if requests.is_empty() {
                continue;
            }
            if self.drivers.is_connected(ctrlr) {
                plans.insert(ctrlr.clone(), requests);
            } else {
                warn!("Controller {ctrlr} is disconnected: {} changes not applied", requests.len());
                skipped.insert(ctrlr.clone(), requests);
            }
        }

        if let Err((ctrlr, e)) = self.prepare_tx(&plans) {
            error!("Commit aborted: {e}");
            return Err(UpllError::CommitFailed {
                ctrlr,
                reason: e.to_string(),
            });
        }
        let failed = self.commit_tx(plans.keys().cloned());
        for ctrlr in &failed {
            if let Some(requests) = plans.remove(ctrlr) {
                skipped.insert(ctrlr.clone(), requests);
            }
        }

        self.update_commit_status(&plans, &skipped);
        self.drop_deleted_renames();
        self.db.copy(Datatype::Candidate, Datatype::Running);
        self.oper.prune(&self.db);
        info!(
            "Committed: {} controllers updated, {} not",
            plans.len(),
            skipped.len()
        );
        Ok(())
    }

    /// Forget the names at controllers of the VTNs and flow lists about to be deleted
    /// from RUNNING, so that a new object of the same name is sent under its own name
    fn drop_deleted_renames(&mut self) {
        let deleted: Vec<(KeyType, String)> = self
            .db
            .rows(Datatype::Running)
            .filter(|(key, _)| !self.db.exists(Datatype::Candidate, key))
            .filter_map(|(key, _)| match key.key_type() {
                KeyType::Vtn => key.vtn_name().map(|n| (KeyType::Vtn, n.to_owned())),
                KeyType::FlowList => key
                    .flowlist_name()
                    .map(|n| (KeyType::FlowList, n.to_owned())),
                _ => None,
            })
            .collect();
        for (kt, name) in deleted {
            debug!("Forgetting controller names of {kt} '{name}'");
            self.renames.remove(kt, &name);
        }
    }

    /// The objects touched by the plans of each controller, by their names here
    fn planned_keys(
        &self,
        plans: &BTreeMap<String, Vec<DriverRequest>>,
    ) -> BTreeSet<(String, ConfigKey)> {
        plans
            .iter()
            .flat_map(|(ctrlr, requests)| {
                requests.iter().map(|r| {
                    let key = self.renames.translate_ckv(ctrlr, &r.ckv, Towards::Unc).key;
                    (ctrlr.clone(), key)
                })
            })
            .collect()
    }

    /// Set the status of candidate rows before they become running: applied where the
    /// controller took them, not applied where their changes could not be sent, and
    /// as before for the rest.
    fn update_commit_status(
        &mut self,
        sent: &BTreeMap<String, Vec<DriverRequest>>,
        skipped: &BTreeMap<String, Vec<DriverRequest>>,
    ) {
        let sent = self.planned_keys(sent);
        let not_sent = self.planned_keys(skipped);
        let mut statuses: Vec<(ConfigKey, Vec<(String, ConfigStatus)>)> = vec![];
        for (key, record) in self.db.rows(Datatype::Candidate) {
            let prior = self.db.get(Datatype::Running, key);
            let per_ctrlr = self
                .mgrs
                .ctrlrs_of(&self.db, Datatype::Candidate, key, record)
                .into_keys()
                .map(|ctrlr| {
                    let planned = (ctrlr, key.clone());
                    let status = if not_sent.contains(&planned) {
                        ConfigStatus::NotApplied
                    } else if sent.contains(&planned) {
                        ConfigStatus::Applied
                    } else {
                        let reachable = self.drivers.is_connected(&planned.0);
                        prior
                            .and_then(|p| p.ctrlr_status.get(&planned.0).copied())
                            .unwrap_or(if reachable {
                                ConfigStatus::Applied
                            } else {
                                ConfigStatus::NotApplied
                            })
                    };
                    (planned.0, status)
                })
                .collect();
            statuses.push((key.clone(), per_ctrlr));
        }
        for (key, per_ctrlr) in statuses {
            let Ok(mgr) = self.mgrs.get(key.key_type()) else {
                continue;
            };
            let Some(record) = self.db.get_mut(Datatype::Candidate, &key) else {
                continue;
            };
            record.reset_status();
            for (ctrlr, status) in &per_ctrlr {
                mgr.update_config_status(record, ctrlr, *status);
            }
            if per_ctrlr.is_empty() {
                record.recompute_status();
            }
        }
    }

    /// Drop the candidate changes
    pub(crate) fn abort_candidate(&mut self) {
        info!("Restoring candidate configuration from running");
        self.db.copy(Datatype::Running, Datatype::Candidate);
    }

    pub(crate) fn is_candidate_dirty(&self) -> bool {
        !self.db.same_config(Datatype::Candidate, Datatype::Running)
    }
}
