// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory configuration tables.
//!
//! A [`ConfigDb`] keeps one [`Table`] per datatype and key type. Rows are [`Record`]s
//! keyed by [`ConfigKey`], so iterating a table yields objects in key order.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use strum::IntoEnumIterator;
use tracing::{debug, trace};

use model::{
    AttrVal, ConfigKey, ConfigKeyVal, ConfigStatus, ConfigVal, CtrlrDom, Datatype, KeyType,
    UpllError, UpllResult, ValidFlag, key_tree,
};

/// Markers of a row
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowFlags {
    /// the row was read from a controller by an import
    pub imported: bool,
    /// the row is known by another name at its controller
    pub renamed: bool,
}

impl Display for RowFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.imported, self.renamed) {
            (false, false) => write!(f, "-"),
            (true, false) => write!(f, "imported"),
            (false, true) => write!(f, "renamed"),
            (true, true) => write!(f, "imported,renamed"),
        }
    }
}

/// A row of a table
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub val: Option<ConfigVal>,
    pub ctrlr_dom: Option<CtrlrDom>,
    pub cs_row: ConfigStatus,
    pub cs_attr: Vec<ConfigStatus>,
    /// status of the row at each controller it is sent to
    pub ctrlr_status: BTreeMap<String, ConfigStatus>,
    pub flags: RowFlags,
}

impl Record {
    #[must_use]
    pub fn new(val: Option<ConfigVal>, ctrlr_dom: Option<CtrlrDom>) -> Self {
        Self {
            val,
            ctrlr_dom,
            ..Default::default()
        }
    }

    /// Record the status of this row at one controller and recompute the row status
    pub fn set_ctrlr_status(&mut self, ctrlr: &str, status: ConfigStatus) {
        self.ctrlr_status.insert(ctrlr.to_owned(), status);
        self.recompute_status();
    }

    /// Derive the row and attribute statuses from the per-controller statuses.
    /// Rows that no controller knows of are considered applied.
    pub fn recompute_status(&mut self) {
        self.cs_row = if self.ctrlr_status.is_empty() {
            ConfigStatus::Applied
        } else {
            self.ctrlr_status
                .values()
                .fold(ConfigStatus::Invalid, |acc, s| acc.merge(*s))
        };
        self.cs_attr = attr_statuses(self.val.as_ref(), self.cs_row);
    }

    /// Forget every status: rows of the candidate configuration before a commit
    pub fn reset_status(&mut self) {
        self.ctrlr_status.clear();
        self.cs_row = ConfigStatus::Invalid;
        self.cs_attr.clear();
    }

    #[must_use]
    pub fn to_ckv(&self, key: &ConfigKey) -> ConfigKeyVal {
        let mut ckv = ConfigKeyVal::new(key.clone());
        ckv.val.clone_from(&self.val);
        ckv.cs_row = self.cs_row;
        ckv.cs_attr.clone_from(&self.cs_attr);
        ckv.ctrlr_dom.clone_from(&self.ctrlr_dom);
        ckv
    }
}

/// Status of each attribute of `val` given the status of its row
#[must_use]
pub fn attr_statuses(val: Option<&ConfigVal>, row: ConfigStatus) -> Vec<ConfigStatus> {
    let Some(val) = val else {
        return vec![];
    };
    val.valid_flags()
        .into_iter()
        .map(|flag| match flag {
            ValidFlag::Valid | ValidFlag::ValueNotModified => row,
            ValidFlag::NotSupported => ConfigStatus::NotSupported,
            ValidFlag::Invalid | ValidFlag::ValidNoValue => ConfigStatus::Invalid,
        })
        .collect()
}

/// The rows of one key type
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    rows: BTreeMap<ConfigKey, Record>,
}
impl Table {
    #[must_use]
    pub fn get(&self, key: &ConfigKey) -> Option<&Record> {
        self.rows.get(key)
    }
    pub fn get_mut(&mut self, key: &ConfigKey) -> Option<&mut Record> {
        self.rows.get_mut(key)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &Record)> {
        self.rows.iter()
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ConfigKey, &mut Record)> {
        self.rows.iter_mut()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Kind of change between two views of the configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DiffOp {
    Create,
    Update,
    Delete,
}

/// One change between two views of the configuration
#[derive(Clone, Debug, PartialEq)]
pub struct DiffEntry {
    pub op: DiffOp,
    pub key: ConfigKey,
    /// new value; for updates only the attributes that changed
    pub val: Option<ConfigVal>,
    pub ctrlr_dom: Option<CtrlrDom>,
}

/// Compute the changes that turn `old` into `new`: deletes first (children before
/// parents), then creates (parents before children), then updates. With `audit`, the
/// attributes of updates that did not change are marked as not modified.
#[must_use]
pub fn diff_views(
    new: &BTreeMap<ConfigKey, ConfigKeyVal>,
    old: &BTreeMap<ConfigKey, ConfigKeyVal>,
    audit: bool,
) -> Vec<DiffEntry> {
    let mut deletes = vec![];
    let mut creates = vec![];
    let mut updates = vec![];
    let entry = |op, ckv: &ConfigKeyVal, val| DiffEntry {
        op,
        key: ckv.key.clone(),
        val,
        ctrlr_dom: ckv.ctrlr_dom.clone(),
    };
    for (key, ckv) in old {
        if !new.contains_key(key) {
            deletes.push(entry(DiffOp::Delete, ckv, None));
        }
    }
    for (key, ckv) in new {
        match old.get(key) {
            None => creates.push(entry(DiffOp::Create, ckv, ckv.val.clone())),
            Some(prior) => {
                if let (Some(val), Some(prior_val)) = (&ckv.val, &prior.val)
                    && val != prior_val
                {
                    let mut delta = val.clone();
                    if delta.compare_valid_value(prior_val, audit) {
                        updates.push(entry(DiffOp::Update, ckv, Some(delta)));
                    }
                }
            }
        }
    }
    let rank = key_type_ranks();
    let by_rank = |e: &DiffEntry| rank.get(&e.key.key_type()).copied().unwrap_or(usize::MAX);
    deletes.sort_by_key(|e| std::cmp::Reverse(by_rank(e)));
    creates.sort_by_key(by_rank);
    updates.sort_by_key(by_rank);
    deletes.into_iter().chain(creates).chain(updates).collect()
}

/// Position of each key type in the preorder of the key tree
fn key_type_ranks() -> BTreeMap<KeyType, usize> {
    key_tree()
        .preorder()
        .enumerate()
        .map(|(n, kt)| (kt, n))
        .collect()
}

/// All configuration tables, per datatype
#[derive(Clone, Debug, Default)]
pub struct ConfigDb {
    tables: BTreeMap<(Datatype, KeyType), Table>,
}

impl ConfigDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table(&self, dt: Datatype, kt: KeyType) -> Option<&Table> {
        self.tables.get(&(dt, kt))
    }
    fn table_mut(&mut self, dt: Datatype, kt: KeyType) -> &mut Table {
        self.tables.entry((dt, kt)).or_default()
    }

    #[must_use]
    pub fn get(&self, dt: Datatype, key: &ConfigKey) -> Option<&Record> {
        self.table(dt, key.key_type())?.get(key)
    }
    pub fn get_mut(&mut self, dt: Datatype, key: &ConfigKey) -> Option<&mut Record> {
        self.tables.get_mut(&(dt, key.key_type()))?.get_mut(key)
    }

    /// Tell if an object exists. The root always does.
    #[must_use]
    pub fn exists(&self, dt: Datatype, key: &ConfigKey) -> bool {
        *key == ConfigKey::Root || self.get(dt, key).is_some()
    }

    pub fn insert(&mut self, dt: Datatype, key: ConfigKey, record: Record) -> UpllResult<()> {
        let table = self.table_mut(dt, key.key_type());
        if table.rows.contains_key(&key) {
            return Err(UpllError::InstanceExists(key));
        }
        trace!("{dt}: inserting {key}");
        table.rows.insert(key, record);
        Ok(())
    }

    /// Insert or replace a row
    pub fn put(&mut self, dt: Datatype, key: ConfigKey, record: Record) {
        trace!("{dt}: storing {key}");
        self.table_mut(dt, key.key_type()).rows.insert(key, record);
    }

    pub fn remove(&mut self, dt: Datatype, key: &ConfigKey) -> Option<Record> {
        trace!("{dt}: removing {key}");
        self.tables.get_mut(&(dt, key.key_type()))?.rows.remove(key)
    }

    /// The direct children of `parent` of type `kt`, in key order
    #[must_use]
    pub fn children(
        &self,
        dt: Datatype,
        parent: &ConfigKey,
        kt: KeyType,
    ) -> Vec<(&ConfigKey, &Record)> {
        self.table(dt, kt)
            .map(|t| {
                t.iter()
                    .filter(|(k, _)| k.parent_key().as_ref() == Some(parent))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All the objects below `key`, parents before children
    #[must_use]
    pub fn descendants(&self, dt: Datatype, key: &ConfigKey) -> Vec<(&ConfigKey, &Record)> {
        let mut found = vec![];
        for kt in key_tree().preorder_from(key.key_type()).skip(1) {
            if let Some(table) = self.table(dt, kt) {
                found.extend(table.iter().filter(|(k, _)| k.is_within(key)));
            }
        }
        found
    }

    /// Remove an object and everything below it. Returns the removed keys, children
    /// before parents.
    pub fn remove_subtree(&mut self, dt: Datatype, key: &ConfigKey) -> Vec<ConfigKey> {
        let mut keys: Vec<ConfigKey> = self
            .descendants(dt, key)
            .into_iter()
            .map(|(k, _)| k.clone())
            .collect();
        keys.reverse();
        keys.push(key.clone());
        for k in &keys {
            self.remove(dt, k);
        }
        debug!("{dt}: removed {} objects under {key}", keys.len());
        keys
    }

    /// Iterate over all the rows of a datatype, in key tree order
    pub fn rows(&self, dt: Datatype) -> impl Iterator<Item = (&ConfigKey, &Record)> {
        key_tree()
            .preorder()
            .filter_map(move |kt| self.table(dt, kt))
            .flat_map(Table::iter)
    }

    /// Apply `f` to every row of a datatype
    pub fn for_each_mut(&mut self, dt: Datatype, mut f: impl FnMut(&ConfigKey, &mut Record)) {
        for kt in KeyType::iter() {
            if let Some(table) = self.tables.get_mut(&(dt, kt)) {
                for (key, record) in table.iter_mut() {
                    f(key, record);
                }
            }
        }
    }

    #[must_use]
    pub fn len(&self, dt: Datatype) -> usize {
        KeyType::iter()
            .filter_map(|kt| self.table(dt, kt))
            .map(Table::len)
            .sum()
    }
    #[must_use]
    pub fn is_empty(&self, dt: Datatype) -> bool {
        self.len(dt) == 0
    }

    pub fn clear(&mut self, dt: Datatype) {
        debug!("Clearing {dt} configuration");
        self.tables.retain(|(d, _), _| *d != dt);
    }

    /// Replace the contents of `to` by those of `from`
    pub fn copy(&mut self, from: Datatype, to: Datatype) {
        debug!("Copying {from} configuration to {to}");
        self.clear(to);
        let copies: Vec<((Datatype, KeyType), Table)> = self
            .tables
            .iter()
            .filter(|((dt, _), _)| *dt == from)
            .map(|((_, kt), table)| ((to, *kt), table.clone()))
            .collect();
        self.tables.extend(copies);
    }

    /// Tell if two datatypes hold the same objects with the same values
    #[must_use]
    pub fn same_config(&self, a: Datatype, b: Datatype) -> bool {
        KeyType::iter().all(|kt| {
            let rows = |dt| {
                self.table(dt, kt)
                    .map(|t| {
                        t.iter()
                            .map(|(k, r)| (k, r.val.as_ref()))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            };
            rows(a) == rows(b)
        })
    }

    /// The objects of a datatype as [`ConfigKeyVal`]s, keyed by their key
    #[must_use]
    pub fn view(&self, dt: Datatype) -> BTreeMap<ConfigKey, ConfigKeyVal> {
        self.rows(dt)
            .map(|(k, r)| (k.clone(), r.to_ckv(k)))
            .collect()
    }
}
