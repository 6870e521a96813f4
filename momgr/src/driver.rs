// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Controller drivers.
//!
//! A [`Driver`] is the channel to one network controller. Configuration is pushed in
//! transactions: [`Driver::begin_tx`], any number of [`Driver::send`], then a
//! [`Driver::vote`] after which the driver either [`Driver::commit`]s or
//! [`Driver::abort`]s. [`MemoryDriver`] simulates a controller in memory.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use model::{ConfigKey, ConfigKeyVal, KeyType, Operation};

use crate::table::{DiffEntry, DiffOp};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("Controller '{0}' is disconnected")]
    Disconnected(String),
    #[error("Controller '{ctrlr}' rejected {key}: {reason}")]
    Rejected {
        ctrlr: String,
        key: ConfigKey,
        reason: String,
    },
    #[error("Controller '{0}' voted against the transaction")]
    VoteFailed(String),
    #[error("Controller '{0}' failed to commit")]
    CommitFailed(String),
    #[error("Controller '{0}' has no transaction in progress")]
    NoTransaction(String),
    #[error("Controller '{0}' already has a transaction in progress")]
    TxInProgress(String),
}

/// One configuration change for a controller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverRequest {
    pub op: Operation,
    pub ckv: ConfigKeyVal,
}
impl DriverRequest {
    #[must_use]
    pub fn from_diff(entry: &DiffEntry) -> Self {
        let op = match entry.op {
            DiffOp::Create => Operation::Create,
            DiffOp::Update => Operation::Update,
            DiffOp::Delete => Operation::Delete,
        };
        let mut ckv = ConfigKeyVal::new(entry.key.clone());
        ckv.val.clone_from(&entry.val);
        ckv.ctrlr_dom.clone_from(&entry.ctrlr_dom);
        Self { op, ckv }
    }
}

/// The channel to a network controller
pub trait Driver: Send {
    /// The name of the controller
    fn name(&self) -> &str;

    /// Tell if the controller can be reached
    fn is_connected(&self) -> bool;

    /// Start a transaction
    fn begin_tx(&mut self) -> Result<(), DriverError>;

    /// Stage one change in the current transaction
    fn send(&mut self, request: &DriverRequest) -> Result<(), DriverError>;

    /// Ask the controller whether the staged changes can be committed
    fn vote(&mut self) -> Result<(), DriverError>;

    /// Apply the staged changes. Only called after a successful vote.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// Drop the staged changes, if any
    fn abort(&mut self);

    /// Read the whole configuration of the controller
    fn read_config(&self) -> Result<Vec<ConfigKeyVal>, DriverError>;
}

/// Failures that a [`MemoryDriver`] can be told to produce
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailPoint {
    /// reject any request for objects of this key type
    Send(KeyType),
    Vote,
    Commit,
}

#[derive(Debug, Default)]
struct MemState {
    connected: bool,
    config: BTreeMap<ConfigKey, ConfigKeyVal>,
    staged: Option<BTreeMap<ConfigKey, ConfigKeyVal>>,
    fail: Option<FailPoint>,
    history: Vec<DriverRequest>,
    commits: usize,
}

/// A simulated controller. Clones share the same controller, so a test can keep a
/// handle on a driver given away to a config manager.
#[derive(Clone, Debug)]
pub struct MemoryDriver {
    name: String,
    state: Arc<Mutex<MemState>>,
}

impl MemoryDriver {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let state = MemState {
            connected: true,
            ..Default::default()
        };
        Self {
            name: name.to_owned(),
            state: Arc::new(Mutex::new(state)),
        }
    }
    pub fn connect(&self) {
        info!("Controller {} is up", self.name);
        self.state.lock().connected = true;
    }
    pub fn disconnect(&self) {
        info!("Controller {} is down", self.name);
        let mut state = self.state.lock();
        state.connected = false;
        state.staged = None;
    }
    /// Make the controller fail at some point of the next transactions
    pub fn fail_at(&self, fail: Option<FailPoint>) {
        self.state.lock().fail = fail;
    }
    /// Place an object in the controller configuration, bypassing transactions
    pub fn preload(&self, ckv: ConfigKeyVal) {
        self.state.lock().config.insert(ckv.key.clone(), ckv);
    }
    #[must_use]
    pub fn config(&self) -> BTreeMap<ConfigKey, ConfigKeyVal> {
        self.state.lock().config.clone()
    }
    #[must_use]
    pub fn contains(&self, key: &ConfigKey) -> bool {
        self.state.lock().config.contains_key(key)
    }
    /// Every request received, in order
    #[must_use]
    pub fn history(&self) -> Vec<DriverRequest> {
        self.state.lock().history.clone()
    }
    #[must_use]
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    fn rejected(&self, key: &ConfigKey, reason: &str) -> DriverError {
        DriverError::Rejected {
            ctrlr: self.name.clone(),
            key: key.clone(),
            reason: reason.to_owned(),
        }
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }
    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
    fn begin_tx(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(DriverError::Disconnected(self.name.clone()));
        }
        if state.staged.is_some() {
            return Err(DriverError::TxInProgress(self.name.clone()));
        }
        debug!("{}: begin transaction", self.name);
        state.staged = Some(state.config.clone());
        Ok(())
    }

    fn send(&mut self, request: &DriverRequest) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(DriverError::Disconnected(self.name.clone()));
        }
        state.history.push(request.clone());
        let key = &request.ckv.key;
        if state.fail == Some(FailPoint::Send(key.key_type())) {
            return Err(self.rejected(key, "injected failure"));
        }
        let Some(staged) = state.staged.as_mut() else {
            return Err(DriverError::NoTransaction(self.name.clone()));
        };
        debug!("{}: {} {key}", self.name, request.op);
        match request.op {
            Operation::Create => {
                if staged.contains_key(key) {
                    return Err(self.rejected(key, "already exists"));
                }
                if let Some(parent) = key.parent_key()
                    && parent != ConfigKey::Root
                    && !staged.contains_key(&parent)
                {
                    return Err(self.rejected(key, "parent does not exist"));
                }
                staged.insert(key.clone(), request.ckv.clone());
            }
            Operation::Update => {
                let Some(current) = staged.get_mut(key) else {
                    return Err(self.rejected(key, "does not exist"));
                };
                if let Some(update) = &request.ckv.val {
                    if let Some(cur) = current.val.as_mut() {
                        cur.merge_from(update)
                            .map_err(|e| self.rejected(key, &e.to_string()))?;
                    } else {
                        current.val = Some(update.clone());
                    }
                }
            }
            Operation::Delete => {
                if staged.remove(key).is_none() {
                    return Err(self.rejected(key, "does not exist"));
                }
                staged.retain(|k, _| !k.is_within(key));
            }
            _ => return Err(self.rejected(key, "unsupported operation")),
        }
        Ok(())
    }

    fn vote(&mut self) -> Result<(), DriverError> {
        let state = self.state.lock();
        if !state.connected {
            return Err(DriverError::Disconnected(self.name.clone()));
        }
        if state.staged.is_none() {
            return Err(DriverError::NoTransaction(self.name.clone()));
        }
        if state.fail == Some(FailPoint::Vote) {
            warn!("{}: voting against the transaction", self.name);
            return Err(DriverError::VoteFailed(self.name.clone()));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.fail == Some(FailPoint::Commit) {
            state.staged = None;
            return Err(DriverError::CommitFailed(self.name.clone()));
        }
        let Some(staged) = state.staged.take() else {
            return Err(DriverError::NoTransaction(self.name.clone()));
        };
        state.config = staged;
        state.commits += 1;
        debug!("{}: committed, {} objects", self.name, state.config.len());
        Ok(())
    }

    fn abort(&mut self) {
        if self.state.lock().staged.take().is_some() {
            debug!("{}: transaction aborted", self.name);
        }
    }

    fn read_config(&self) -> Result<Vec<ConfigKeyVal>, DriverError> {
        let state = self.state.lock();
        if !state.connected {
            return Err(DriverError::Disconnected(self.name.clone()));
        }
        Ok(state.config.values().cloned().collect())
    }
}

/// The drivers of all known controllers, with their reachability
#[derive(Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Box<dyn Driver>>,
    /// controllers reported down by controller events
    down: std::collections::BTreeSet<String>,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, driver: Box<dyn Driver>) {
        info!("Registering driver for controller {}", driver.name());
        self.drivers.insert(driver.name().to_owned(), driver);
    }
    #[must_use]
    pub fn contains(&self, ctrlr: &str) -> bool {
        self.drivers.contains_key(ctrlr)
    }
    pub fn get_mut(&mut self, ctrlr: &str) -> Option<&mut Box<dyn Driver>> {
        self.drivers.get_mut(ctrlr)
    }
    #[must_use]
    pub fn get(&self, ctrlr: &str) -> Option<&dyn Driver> {
        self.drivers.get(ctrlr).map(AsRef::as_ref)
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }
    /// Tell if a controller can be configured
    #[must_use]
    pub fn is_connected(&self, ctrlr: &str) -> bool {
        !self.down.contains(ctrlr) && self.drivers.get(ctrlr).is_some_and(|d| d.is_connected())
    }
    pub fn set_down(&mut self, ctrlr: &str, down: bool) {
        if down {
            self.down.insert(ctrlr.to_owned());
        } else {
            self.down.remove(ctrlr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ConfigVal;

    fn create(key: ConfigKey) -> DriverRequest {
        let val = ConfigVal::empty(key.key_type());
        let mut ckv = ConfigKeyVal::new(key);
        ckv.val = val;
        DriverRequest {
            op: Operation::Create,
            ckv,
        }
    }

    #[test]
    fn transaction() {
        let handle = MemoryDriver::new("c1");
        let mut driver = handle.clone();
        let vtn = ConfigKey::vtn("vtn1");
        let vbr = vtn.child_key(KeyType::Vbridge, "vbr1").unwrap();

        assert_eq!(
            driver.send(&create(vtn.clone())),
            Err(DriverError::NoTransaction("c1".to_owned()))
        );
        driver.begin_tx().unwrap();
        assert!(driver.send(&create(vbr.clone())).is_err());
        driver.send(&create(vtn.clone())).unwrap();
        driver.send(&create(vbr.clone())).unwrap();
        driver.vote().unwrap();
        assert!(!handle.contains(&vtn));
        driver.commit().unwrap();
        assert!(handle.contains(&vbr));
        assert_eq!(handle.commits(), 1);

        driver.begin_tx().unwrap();
        let delete = DriverRequest {
            op: Operation::Delete,
            ckv: ConfigKeyVal::new(vtn.clone()),
        };
        driver.send(&delete).unwrap();
        driver.abort();
        assert!(handle.contains(&vbr));
        assert_eq!(handle.history().len(), 5);
    }

    #[test]
    fn injected_failures() {
        let handle = MemoryDriver::new("c1");
        let mut driver = handle.clone();
        handle.fail_at(Some(FailPoint::Vote));
        driver.begin_tx().unwrap();
        driver.send(&create(ConfigKey::flowlist("fl1"))).unwrap();
        assert_eq!(driver.vote(), Err(DriverError::VoteFailed("c1".to_owned())));
        driver.abort();

        handle.fail_at(Some(FailPoint::Send(KeyType::FlowList)));
        driver.begin_tx().unwrap();
        assert!(matches!(
            driver.send(&create(ConfigKey::flowlist("fl1"))),
            Err(DriverError::Rejected { .. })
        ));
        driver.abort();

        handle.fail_at(None);
        handle.disconnect();
        assert_eq!(driver.begin_tx(), Err(DriverError::Disconnected("c1".to_owned())));
        assert!(driver.read_config().is_err());
    }

    #[test]
    fn registry_reachability() {
        let handle = MemoryDriver::new("c1");
        let mut registry = DriverRegistry::new();
        registry.add(Box::new(handle.clone()));
        assert!(registry.is_connected("c1"));
        assert!(!registry.is_connected("c2"));
        registry.set_down("c1", true);
        assert!(!registry.is_connected("c1"));
        registry.set_down("c1", false);
        handle.disconnect();
        assert!(!registry.is_connected("c1"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["c1"]);
    }
}
