// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Names of VTNs and flow lists at controllers.
//!
//! An object imported from a controller may be renamed before it is merged. The
//! controller keeps the original name, so keys and flow list references are translated
//! whenever configuration crosses the boundary with that controller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use model::{ConfigKey, ConfigKeyVal, KeyType};

/// One renamed object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEntry {
    pub ctrlr: String,
    pub kt: KeyType,
    pub unc_name: String,
    pub ctrlr_name: String,
}

/// Which side of the boundary a name is translated to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Towards {
    Ctrlr,
    Unc,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenameTable {
    /// (controller, key type, name) -> name at the controller
    to_ctrlr: BTreeMap<(String, KeyType, String), String>,
}

impl RenameTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the object of type `kt` named `unc_name` is `ctrlr_name` at `ctrlr`
    pub fn add(&mut self, ctrlr: &str, kt: KeyType, unc_name: &str, ctrlr_name: &str) {
        debug!("{kt} '{unc_name}' is '{ctrlr_name}' at controller {ctrlr}");
        if unc_name == ctrlr_name {
            self.to_ctrlr
                .remove(&(ctrlr.to_owned(), kt, unc_name.to_owned()));
        } else {
            self.to_ctrlr.insert(
                (ctrlr.to_owned(), kt, unc_name.to_owned()),
                ctrlr_name.to_owned(),
            );
        }
    }

    /// Forget the name mappings of an object at every controller
    pub fn remove(&mut self, kt: KeyType, unc_name: &str) {
        self.to_ctrlr
            .retain(|(_, k, name), _| !(*k == kt && name == unc_name));
    }

    /// Absorb the entries of another table
    pub fn extend(&mut self, other: RenameTable) {
        self.to_ctrlr.extend(other.to_ctrlr);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_ctrlr.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<RenameEntry> {
        self.to_ctrlr
            .iter()
            .map(|((ctrlr, kt, unc_name), ctrlr_name)| RenameEntry {
                ctrlr: ctrlr.clone(),
                kt: *kt,
                unc_name: unc_name.clone(),
                ctrlr_name: ctrlr_name.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn from_entries(entries: &[RenameEntry]) -> Self {
        let mut table = Self::new();
        for e in entries {
            table.add(&e.ctrlr, e.kt, &e.unc_name, &e.ctrlr_name);
        }
        table
    }

    /// Translate a name of type `kt` for controller `ctrlr`
    #[must_use]
    pub fn translate(&self, ctrlr: &str, kt: KeyType, name: &str, towards: Towards) -> String {
        match towards {
            Towards::Ctrlr => self
                .to_ctrlr
                .get(&(ctrlr.to_owned(), kt, name.to_owned()))
                .cloned()
                .unwrap_or_else(|| name.to_owned()),
            Towards::Unc => self
                .to_ctrlr
                .iter()
                .find(|((c, k, _), cname)| c == ctrlr && *k == kt && *cname == name)
                .map_or_else(|| name.to_owned(), |((_, _, unc), _)| unc.clone()),
        }
    }

    /// Tell if the VTN or flow list a key refers to is known by another name at `ctrlr`
    #[must_use]
    pub fn is_renamed(&self, ctrlr: &str, key: &ConfigKey) -> bool {
        let renamed = |kt, name: &str| self.translate(ctrlr, kt, name, Towards::Ctrlr) != name;
        key.vtn_name().is_some_and(|n| renamed(KeyType::Vtn, n))
            || key.flowlist_name().is_some_and(|n| renamed(KeyType::FlowList, n))
    }

    /// Translate the names in a configuration object for controller `ctrlr`: its VTN,
    /// the flow list it is and the flow list it refers to.
    #[must_use]
    pub fn translate_ckv(&self, ctrlr: &str, ckv: &ConfigKeyVal, towards: Towards) -> ConfigKeyVal {
        let mut out = ckv.clone();
        if let Some(vtn) = ckv.key.vtn_name() {
            let name = self.translate(ctrlr, KeyType::Vtn, vtn, towards);
            out.key = out.key.with_vtn_name(&name);
        }
        if let Some(fl) = ckv.key.flowlist_name() {
            let name = self.translate(ctrlr, KeyType::FlowList, fl, towards);
            out.key = out.key.with_flowlist_name(&name);
        }
        if let Some(val) = &mut out.val
            && let Some(fl) = val.flowlist_ref().map(str::to_owned)
        {
            val.set_flowlist_ref(&self.translate(ctrlr, KeyType::FlowList, &fl, towards));
        }
        out
    }
}
