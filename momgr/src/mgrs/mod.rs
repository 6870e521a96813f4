// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Managed object managers.
//!
//! There is one [`MoMgr`] per key type. A manager knows how to validate requests for
//! its objects (syntax of keys and values, then semantics against the rest of the
//! configuration) and to which controllers its objects are sent. The generic request
//! processing that is common to all key types lives in [`crate::ops`].

mod flowfilter;
mod flowlist;
mod iproute;
mod unw;
mod vbr;
mod vrt;
mod vtn;
mod vterm;
mod vunknown;

pub use flowfilter::{
    IfFlowFilterEntryMoMgr, IfFlowFilterMoMgr, VbrIfFlowFilterEntryMoMgr, VbrIfFlowFilterMoMgr,
    VtermIfFlowFilterEntryMoMgr, VtermIfFlowFilterMoMgr,
};
pub use flowlist::FlowListMoMgr;
pub use iproute::IpRouteMoMgr;
pub use unw::{UNWSpineDomainMoMgr, UnifiedNetworkMoMgr};
pub use vbr::{VbrIfMoMgr, VbrMoMgr};
pub use vrt::{VrtIfMoMgr, VrtMoMgr};
pub use vtn::VtnMoMgr;
pub use vterm::{VtermIfMoMgr, VtermMoMgr};
pub use vunknown::{VunkIfMoMgr, VunknownMoMgr};

use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::debug;

use model::validate::{check_ctrlr_id, check_domain_id, check_name};
use model::{
    Attr, ConfigKey, ConfigKeyVal, ConfigStatus, ConfigVal, CtrlrDom, Datatype, KeyType,
    Operation, UpllError, UpllResult,
};

use crate::session::RequestHeader;
use crate::table::{ConfigDb, Record};

/// How the controllers an object is sent to are determined
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CtrlrScope {
    /// never sent to any controller
    None,
    /// the controller named in the value of the object
    Own,
    /// the controller of the closest ancestor that has one
    Inherit,
    /// every controller that any object of the VTN is at
    VtnMembers,
    /// every controller of the flow-filter entries that refer to the flow list
    FlowListRefs,
}

/// Operations specific to one key type
pub trait MoMgr: Send + Sync {
    fn key_type(&self) -> KeyType;
    fn ctrlr_scope(&self) -> CtrlrScope;

    /// Tell if an operation applies to this key type
    fn supports(&self, op: Operation) -> bool {
        op != Operation::Update || self.key_type().has_value()
    }

    /// Check the consistency of a request before looking at its contents
    fn validate_message(&self, header: &RequestHeader, ckv: &ConfigKeyVal) -> UpllResult<()> {
        let kt = self.key_type();
        let op = header.operation;
        if ckv.key_type() != kt {
            return Err(UpllError::BadRequest(format!(
                "{} request sent to the {kt} manager",
                ckv.key_type()
            )));
        }
        ckv.check_consistency()?;
        if !self.supports(op) {
            return Err(UpllError::NoSuchOperation(op, kt));
        }
        let dt = header.datatype;
        let dt_ok = if op.is_write() {
            dt == Datatype::Candidate
        } else {
            dt != Datatype::Audit
        };
        if !dt_ok {
            return Err(UpllError::NoSuchDatatype(dt, op));
        }
        if op.is_read() && op != Operation::Read && op != Operation::ReadSibling {
            // sibling-begin and count only need the parent part of the key
            return Ok(());
        }
        self.validate_key(&ckv.key)?;
        match op {
            Operation::Create => {
                let empty = ConfigVal::empty(kt);
                if let Some(val) = ckv.val.as_ref().or(empty.as_ref()) {
                    self.validate_value(val, op)?;
                }
            }
            Operation::Update => {
                let Some(val) = &ckv.val else {
                    return Err(UpllError::BadRequest(format!(
                        "update of {} without a value",
                        ckv.key
                    )));
                };
                self.validate_value(val, op)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Check the syntax of a key
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()>;

    /// Check the syntax of a value: the range of each attribute set and the presence
    /// of the attributes required by `op`
    fn validate_value(&self, _val: &ConfigVal, _op: Operation) -> UpllResult<()> {
        Ok(())
    }

    /// Check a request against the configuration in datatype `dt`
    fn validate_semantics(
        &self,
        _ckv: &ConfigKeyVal,
        _db: &ConfigDb,
        _dt: Datatype,
        _op: Operation,
    ) -> UpllResult<()> {
        Ok(())
    }

    fn get_child_config_key(&self, parent: &ConfigKey, leaf: &str) -> UpllResult<ConfigKey> {
        parent.child_key(self.key_type(), leaf)
    }

    fn get_parent_config_key(&self, key: &ConfigKey) -> Option<ConfigKey> {
        key.parent_key()
    }

    fn dup_config_key_val(&self, ckv: &ConfigKeyVal) -> ConfigKeyVal {
        ckv.dup()
    }

    /// Keep the attributes of `val` that differ from `prior`
    fn compare_valid_value(&self, val: &mut ConfigVal, prior: &ConfigVal, audit: bool) -> bool {
        val.compare_valid_value(prior, audit)
    }

    /// Record the outcome of applying a row at a controller
    fn update_config_status(&self, record: &mut Record, ctrlr: &str, status: ConfigStatus) {
        record.set_ctrlr_status(ctrlr, status);
    }
}

pub(crate) fn wrong_key(kt: KeyType, key: &ConfigKey) -> UpllError {
    UpllError::BadRequest(format!("{key} is not a {kt} key"))
}
pub(crate) fn wrong_val(kt: KeyType, val: &ConfigVal) -> UpllError {
    UpllError::BadRequest(format!("{} value given for a {kt}", val.key_type()))
}

/// Run a check on the value of an attribute, if it has one
pub(crate) fn check_attr<T>(
    attr: &Attr<T>,
    check: impl FnOnce(&T) -> UpllResult<()>,
) -> UpllResult<()> {
    attr.value().map_or(Ok(()), check)
}

/// An attribute that must be set on create and cannot be reset afterwards
pub(crate) fn mandatory<T>(name: &'static str, attr: &Attr<T>, op: Operation) -> UpllResult<()> {
    match op {
        Operation::Create if !attr.is_valid() => {
            Err(UpllError::syntax(name, "is mandatory"))
        }
        Operation::Update if matches!(attr, Attr::ValidNoValue) => {
            Err(UpllError::syntax(name, "cannot be reset"))
        }
        _ => Ok(()),
    }
}

/// An attribute that an update cannot change
pub(crate) fn immutable<T: PartialEq + Display>(
    name: &'static str,
    update: &Attr<T>,
    current: &Attr<T>,
) -> UpllResult<()> {
    if update.is_pending() && update != current {
        return Err(UpllError::CfgSemantic(format!(
            "{name} cannot be modified (currently {current})"
        )));
    }
    Ok(())
}

/// The value of an existing object, with `ckv` applied to it for updates
pub(crate) fn effective_val(
    ckv: &ConfigKeyVal,
    db: &ConfigDb,
    dt: Datatype,
    op: Operation,
) -> UpllResult<Option<ConfigVal>> {
    match op {
        Operation::Update => {
            let current = db
                .get(dt, &ckv.key)
                .ok_or_else(|| UpllError::NoSuchInstance(ckv.key.clone()))?;
            let mut val = current.val.clone();
            if let (Some(val), Some(update)) = (&mut val, &ckv.val) {
                val.merge_from(update)?;
            }
            Ok(val)
        }
        _ => Ok(ckv.val.clone()),
    }
}

/// The stored value of an object
pub(crate) fn current_val<'a>(
    db: &'a ConfigDb,
    dt: Datatype,
    key: &ConfigKey,
) -> Option<&'a ConfigVal> {
    db.get(dt, key).and_then(|r| r.val.as_ref())
}

/// Check the controller and domain attributes of a vnode value
pub(crate) fn check_ctrlr_dom_attrs(
    ctrlr: &Attr<String>,
    domain: &Attr<String>,
    op: Operation,
) -> UpllResult<()> {
    mandatory("controller_id", ctrlr, op)?;
    mandatory("domain_id", domain, op)?;
    check_attr(ctrlr, |c| check_ctrlr_id(c))?;
    check_attr(domain, |d| check_domain_id(d))
}

/// Check the name of a vnode and that no other vnode of the VTN uses it
pub(crate) fn check_vnode_name(
    key: &ConfigKey,
    db: &ConfigDb,
    dt: Datatype,
) -> UpllResult<()> {
    let (Some(vtn), Some((_, name))) = (key.parent_key(), key.columns().pop()) else {
        return Ok(());
    };
    for kt in KeyType::config_types().filter(|kt| kt.is_vnode() && *kt != key.key_type()) {
        let other = vtn.child_key(kt, &name)?;
        if db.exists(dt, &other) {
            return Err(UpllError::InstanceExists(other));
        }
    }
    Ok(())
}

pub(crate) fn check_vnode_leaf(what: &'static str, key: &ConfigKey) -> UpllResult<()> {
    if let Some(vtn) = key.vtn_name() {
        check_name("vtn_name", vtn)?;
    }
    let Some((_, leaf)) = key.columns().pop() else {
        return Ok(());
    };
    check_name(what, &leaf)
}

/// All managers, by key type
pub struct MoMgrRegistry {
    mgrs: BTreeMap<KeyType, Box<dyn MoMgr>>,
}

impl Default for MoMgrRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MoMgrRegistry {
    #[must_use]
    pub fn new() -> Self {
        let all: Vec<Box<dyn MoMgr>> = vec![
            Box::new(FlowListMoMgr),
            Box::new(UnifiedNetworkMoMgr),
            Box::new(UNWSpineDomainMoMgr),
            Box::new(VtnMoMgr),
            Box::new(VbrMoMgr),
            Box::new(VbrIfMoMgr),
            Box::new(VbrIfFlowFilterMoMgr::new()),
            Box::new(VbrIfFlowFilterEntryMoMgr::new()),
            Box::new(VrtMoMgr),
            Box::new(VrtIfMoMgr),
            Box::new(IpRouteMoMgr),
            Box::new(VtermMoMgr),
            Box::new(VtermIfMoMgr),
            Box::new(VtermIfFlowFilterMoMgr::new()),
            Box::new(VtermIfFlowFilterEntryMoMgr::new()),
            Box::new(VunknownMoMgr),
            Box::new(VunkIfMoMgr),
        ];
        let mgrs: BTreeMap<KeyType, Box<dyn MoMgr>> =
            all.into_iter().map(|m| (m.key_type(), m)).collect();
        debug!("Registered {} managers", mgrs.len());
        Self { mgrs }
    }

    pub fn get(&self, kt: KeyType) -> UpllResult<&dyn MoMgr> {
        self.mgrs
            .get(&kt)
            .map(AsRef::as_ref)
            .ok_or_else(|| UpllError::BadRequest(format!("no manager for key type {kt}")))
    }

    /// The controller an object is bound to when created: its own or its ancestor's
    #[must_use]
    pub fn resolve_ctrlr_dom(
        &self,
        db: &ConfigDb,
        dt: Datatype,
        key: &ConfigKey,
        val: Option<&ConfigVal>,
    ) -> Option<CtrlrDom> {
        match self.get(key.key_type()).ok()?.ctrlr_scope() {
            CtrlrScope::Own => val
                .and_then(ConfigVal::ctrlr_domain)
                .map(|(c, d)| CtrlrDom::new(c, d)),
            CtrlrScope::Inherit => std::iter::successors(key.parent_key(), ConfigKey::parent_key)
                .find_map(|k| db.get(dt, &k).and_then(|r| r.ctrlr_dom.clone())),
            CtrlrScope::None | CtrlrScope::VtnMembers | CtrlrScope::FlowListRefs => None,
        }
    }

    /// The controllers an object of datatype `dt` is sent to, by controller name
    #[must_use]
    pub fn ctrlrs_of(
        &self,
        db: &ConfigDb,
        dt: Datatype,
        key: &ConfigKey,
        record: &Record,
    ) -> BTreeMap<String, CtrlrDom> {
        let Ok(mgr) = self.get(key.key_type()) else {
            return BTreeMap::new();
        };
        let found: Vec<&CtrlrDom> = match mgr.ctrlr_scope() {
            CtrlrScope::None => vec![],
            CtrlrScope::Own | CtrlrScope::Inherit => record.ctrlr_dom.iter().collect(),
            CtrlrScope::VtnMembers => db
                .descendants(dt, key)
                .into_iter()
                .filter(|(k, _)| self.is_sent(k))
                .filter_map(|(_, r)| r.ctrlr_dom.as_ref())
                .collect(),
            CtrlrScope::FlowListRefs => {
                let name = key.flowlist_name();
                [KeyType::VbrIfFlowFilterEntry, KeyType::VtermIfFlowFilterEntry]
                    .into_iter()
                    .filter_map(|kt| db.table(dt, kt))
                    .flat_map(|t| t.iter())
                    .filter(|(_, r)| {
                        name.is_some() && r.val.as_ref().and_then(ConfigVal::flowlist_ref) == name
                    })
                    .filter_map(|(_, r)| r.ctrlr_dom.as_ref())
                    .collect()
            }
        };
        let mut ctrlrs = BTreeMap::new();
        for cd in found {
            ctrlrs.entry(cd.ctrlr.clone()).or_insert_with(|| cd.clone());
        }
        ctrlrs
    }

    /// Tell if objects of this key type are ever sent to controllers
    #[must_use]
    pub fn is_sent(&self, key: &ConfigKey) -> bool {
        self.get(key.key_type())
            .is_ok_and(|m| m.ctrlr_scope() != CtrlrScope::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RequestHeaderBuilder;
    use strum::IntoEnumIterator;

    #[test]
    fn every_key_type_has_a_manager() {
        let registry = MoMgrRegistry::new();
        for kt in KeyType::config_types() {
            assert_eq!(registry.get(kt).unwrap().key_type(), kt);
        }
        assert!(registry.get(KeyType::Root).is_err());
        assert_eq!(KeyType::iter().count(), registry.mgrs.len() + 1);
    }

    #[test]
    fn message_checks() {
        let registry = MoMgrRegistry::new();
        let mgr = registry.get(KeyType::VbrIfFlowFilter).unwrap();
        let key = ConfigKey::vtn("vtn1")
            .child_key(KeyType::Vbridge, "vbr1")
            .unwrap()
            .child_key(KeyType::VbrIf, "if1")
            .unwrap()
            .child_key(KeyType::VbrIfFlowFilter, "in")
            .unwrap();
        let header = |op, dt| {
            RequestHeaderBuilder::default()
                .operation(op)
                .datatype(dt)
                .build()
                .unwrap()
        };
        let ckv = ConfigKeyVal::new(key);
        let create = header(Operation::Create, Datatype::Candidate);
        assert!(mgr.validate_message(&create, &ckv).is_ok());
        assert_eq!(
            mgr.validate_message(&header(Operation::Update, Datatype::Candidate), &ckv),
            Err(UpllError::NoSuchOperation(Operation::Update, KeyType::VbrIfFlowFilter))
        );
        assert_eq!(
            mgr.validate_message(&header(Operation::Create, Datatype::Running), &ckv),
            Err(UpllError::NoSuchDatatype(Datatype::Running, Operation::Create))
        );
        assert!(mgr.validate_message(&header(Operation::Read, Datatype::Running), &ckv).is_ok());

        let vtn_mgr = registry.get(KeyType::Vtn).unwrap();
        assert!(vtn_mgr.validate_message(&create, &ckv).is_err());
    }

    #[test]
    fn attribute_helpers() {
        let set: Attr<String> = Attr::Valid("c1".to_owned());
        assert!(mandatory("controller_id", &set, Operation::Create).is_ok());
        assert!(mandatory("controller_id", &Attr::<String>::Invalid, Operation::Create).is_err());
        let reset = Attr::<String>::ValidNoValue;
        assert!(mandatory("controller_id", &reset, Operation::Update).is_err());
        assert!(mandatory("controller_id", &Attr::<String>::Invalid, Operation::Update).is_ok());
        assert!(immutable("controller_id", &set, &set).is_ok());
        assert!(immutable("controller_id", &Attr::Valid("c2".to_owned()), &set).is_err());
        assert!(immutable("controller_id", &Attr::Invalid, &set).is_ok());
    }
}
