// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Operational status of running objects, as reported by controllers

use std::collections::BTreeMap;
use tracing::debug;

use model::{ConfigKey, Datatype, KeyType, OperStatus};

use crate::table::ConfigDb;

/// Combine the statuses of the parts of an object
fn aggregate(statuses: impl IntoIterator<Item = OperStatus>) -> OperStatus {
    let mut count = 0;
    let mut all_up = true;
    for status in statuses {
        count += 1;
        match status {
            OperStatus::Down => return OperStatus::Down,
            OperStatus::Up => {}
            OperStatus::Unknown => all_up = false,
        }
    }
    if count > 0 && all_up {
        OperStatus::Up
    } else {
        OperStatus::Unknown
    }
}

#[derive(Debug, Default)]
pub struct StateDb {
    oper: BTreeMap<ConfigKey, OperStatus>,
}

impl StateDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: ConfigKey, status: OperStatus) {
        debug!("{key} is now {status}");
        self.oper.insert(key, status);
    }

    #[must_use]
    pub fn reported(&self, key: &ConfigKey) -> Option<OperStatus> {
        self.oper.get(key).copied()
    }

    /// The status of a running object. Vnodes without a report take the status of
    /// their interfaces, and VTNs the status of their vnodes.
    #[must_use]
    pub fn oper_status(&self, db: &ConfigDb, key: &ConfigKey) -> OperStatus {
        if let Some(status) = self.reported(key) {
            return status;
        }
        let kt = key.key_type();
        let parts: Vec<KeyType> = if kt == KeyType::Vtn {
            KeyType::config_types().filter(|k| k.is_vnode()).collect()
        } else if kt.is_vnode() {
            KeyType::config_types()
                .filter(|k| k.is_vnode_if() && k.parent() == Some(kt))
                .collect()
        } else {
            return OperStatus::Unknown;
        };
        aggregate(parts.into_iter().flat_map(|part| {
            db.children(Datatype::Running, key, part)
                .into_iter()
                .map(|(child, _)| self.oper_status(db, child))
        }))
    }

    /// Forget what a disconnected controller reported: its objects are unknown now
    pub fn ctrlr_disconnected(&mut self, db: &ConfigDb, ctrlr: &str) {
        for (key, record) in db.rows(Datatype::Running) {
            if record.ctrlr_dom.as_ref().is_some_and(|cd| cd.ctrlr == ctrlr) {
                self.oper.insert(key.clone(), OperStatus::Unknown);
            }
        }
        debug!("Statuses of controller {ctrlr} are now unknown");
    }

    /// Drop the reports of objects that are no longer running
    pub fn prune(&mut self, db: &ConfigDb) {
        self.oper.retain(|key, _| db.exists(Datatype::Running, key));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.oper.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.oper.is_empty()
    }
}
