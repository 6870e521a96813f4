// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow-filters of vBridge and vTerminal interfaces.
//!
//! A flow-filter is attached to an interface for one direction and holds entries
//! ordered by sequence number. Each entry matches the traffic described by a flow
//! list and applies an action to it. The same managers serve both interface kinds,
//! parameterized by the interface key.

use std::marker::PhantomData;
use tracing::debug;

use model::key::{FlowFilterIf, VbrIfKey, VtermIfKey};
use model::types::FlowAction;
use model::validate::{check_name, check_range, check_unicast_mac};
use model::val::FlowFilterEntryVal;
use model::{
    ConfigKey, ConfigKeyVal, ConfigVal, Datatype, KeyType, Operation, UpllError, UpllResult,
};

use super::{CtrlrScope, MoMgr, check_attr, effective_val, mandatory, wrong_key, wrong_val};
use crate::table::ConfigDb;

fn check_if_key<I: FlowFilterIf>(if_key: &I) -> UpllResult<()> {
    let key = if_key.clone().into_key();
    for (name, value) in key.columns() {
        check_name(name, &value)?;
    }
    Ok(())
}

/// The flow-filter of an interface in one direction. It has no value of its own.
pub struct IfFlowFilterMoMgr<I> {
    _if: PhantomData<fn() -> I>,
}

impl<I: FlowFilterIf> IfFlowFilterMoMgr<I> {
    #[must_use]
    pub fn new() -> Self {
        Self { _if: PhantomData }
    }
}

impl<I: FlowFilterIf> Default for IfFlowFilterMoMgr<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: FlowFilterIf> MoMgr for IfFlowFilterMoMgr<I> {
    fn key_type(&self) -> KeyType {
        I::FF_KT
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Inherit
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let Some(ff) = I::ff_of(key) else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_if_key(&ff.if_key)
    }
}

/// The entries of a flow-filter
pub struct IfFlowFilterEntryMoMgr<I> {
    _if: PhantomData<fn() -> I>,
}

impl<I: FlowFilterIf> IfFlowFilterEntryMoMgr<I> {
    #[must_use]
    pub fn new() -> Self {
        Self { _if: PhantomData }
    }

    fn entry_val<'a>(&self, val: &'a ConfigVal) -> UpllResult<&'a FlowFilterEntryVal> {
        match val {
            ConfigVal::VbrIfFlowFilterEntry(v) | ConfigVal::VtermIfFlowFilterEntry(v)
                if val.key_type() == I::ENTRY_KT =>
            {
                Ok(v)
            }
            _ => Err(wrong_val(self.key_type(), val)),
        }
    }
}

impl<I: FlowFilterIf> Default for IfFlowFilterEntryMoMgr<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: FlowFilterIf> MoMgr for IfFlowFilterEntryMoMgr<I> {
    fn key_type(&self) -> KeyType {
        I::ENTRY_KT
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Inherit
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let Some(entry) = I::entry_of(key) else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_if_key(&entry.ff.if_key)?;
        check_range("sequence_num", entry.sequence_num, 1, u16::MAX)
    }
    fn validate_value(&self, val: &ConfigVal, op: Operation) -> UpllResult<()> {
        let v = self.entry_val(val)?;
        mandatory("flowlist_name", &v.flowlist_name, op)?;
        mandatory("action", &v.action, op)?;
        check_attr(&v.flowlist_name, |n| check_name("flowlist_name", n))?;
        check_attr(&v.redirect_node, |n| check_name("redirect_node", n))?;
        check_attr(&v.redirect_port, |p| check_name("redirect_port", p))?;
        check_attr(&v.modify_dst_mac, |m| check_unicast_mac("modify_dst_mac", *m))?;
        check_attr(&v.modify_src_mac, |m| check_unicast_mac("modify_src_mac", *m))?;
        check_attr(&v.nwm_name, |n| check_name("nwm_name", n))?;
        check_attr(&v.dscp, |d| check_range("dscp", *d, 0, 63))?;
        check_attr(&v.priority, |p| check_range("priority", *p, 0, 7))
    }

    /// The flow list must exist, and redirection targets go with the redirect action
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        let Some(val) = effective_val(ckv, db, dt, op)? else {
            return Ok(());
        };
        let v = self.entry_val(&val)?;
        if let Some(name) = v.flowlist_name.value() {
            let flowlist = ConfigKey::flowlist(name);
            if !db.exists(dt, &flowlist) {
                debug!("{} refers to missing {flowlist}", ckv.key);
                return Err(UpllError::CfgSemantic(format!(
                    "flow list '{name}' does not exist"
                )));
            }
        }
        let has_target = v.redirect_node.is_valid() || v.redirect_port.is_valid();
        match v.action.value() {
            Some(FlowAction::Redirect)
                if !(v.redirect_node.is_valid() && v.redirect_port.is_valid()) =>
            {
                Err(UpllError::CfgSemantic(
                    "redirect needs redirect_node and redirect_port".to_owned(),
                ))
            }
            Some(action @ (FlowAction::Pass | FlowAction::Drop)) if has_target => {
                Err(UpllError::CfgSemantic(format!(
                    "action {action} does not take a redirection target"
                )))
            }
            _ => Ok(()),
        }
    }
}

pub type VbrIfFlowFilterMoMgr = IfFlowFilterMoMgr<VbrIfKey>;
pub type VbrIfFlowFilterEntryMoMgr = IfFlowFilterEntryMoMgr<VbrIfKey>;
pub type VtermIfFlowFilterMoMgr = IfFlowFilterMoMgr<VtermIfKey>;
pub type VtermIfFlowFilterEntryMoMgr = IfFlowFilterEntryMoMgr<VtermIfKey>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Record;
    use model::Attr;

    fn entry_key() -> ConfigKey {
        ConfigKey::vtn("vtn1")
            .child_key(KeyType::Vterminal, "vt")
            .unwrap()
            .child_key(KeyType::VtermIf, "if1")
            .unwrap()
            .child_key(KeyType::VtermIfFlowFilter, "out")
            .unwrap()
            .child_key(KeyType::VtermIfFlowFilterEntry, "10")
            .unwrap()
    }

    fn entry(action: FlowAction, node: Option<&str>) -> ConfigKeyVal {
        ConfigKeyVal::with_val(
            entry_key(),
            ConfigVal::VtermIfFlowFilterEntry(FlowFilterEntryVal {
                flowlist_name: "fl1".to_owned().into(),
                action: action.into(),
                redirect_node: node.map(str::to_owned).map_or(Attr::Invalid, Attr::Valid),
                redirect_port: node.map(|_| "port1".to_owned()).map_or(Attr::Invalid, Attr::Valid),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn filter_keys() {
        let vbr_ff = VbrIfFlowFilterMoMgr::new();
        let vterm_ff = VtermIfFlowFilterMoMgr::new();
        let ff_key = entry_key().parent_key().unwrap();
        assert!(vterm_ff.validate_key(&ff_key).is_ok());
        assert!(vbr_ff.validate_key(&ff_key).is_err());
        assert!(!vterm_ff.supports(Operation::Update));
        assert_eq!(
            vterm_ff.get_child_config_key(&ff_key.parent_key().unwrap(), "out").unwrap(),
            ff_key
        );

        let mgr = VtermIfFlowFilterEntryMoMgr::new();
        assert!(mgr.validate_key(&entry_key()).is_ok());
        let zero = ff_key.child_key(KeyType::VtermIfFlowFilterEntry, "0").unwrap();
        assert!(matches!(
            mgr.validate_key(&zero),
            Err(UpllError::CfgSyntax("sequence_num", _))
        ));
    }

    #[test]
    fn entry_values() {
        let mgr = VtermIfFlowFilterEntryMoMgr::new();
        let ok = entry(FlowAction::Pass, None);
        assert!(mgr.validate_value(ok.val.as_ref().unwrap(), Operation::Create).is_ok());
        let no_action = ConfigVal::VtermIfFlowFilterEntry(FlowFilterEntryVal {
            flowlist_name: "fl1".to_owned().into(),
            ..Default::default()
        });
        assert!(mgr.validate_value(&no_action, Operation::Create).is_err());
        let dscp = ConfigVal::VtermIfFlowFilterEntry(FlowFilterEntryVal {
            dscp: Attr::Valid(64),
            ..Default::default()
        });
        assert!(mgr.validate_value(&dscp, Operation::Update).is_err());
        let vbr_val = ConfigVal::VbrIfFlowFilterEntry(FlowFilterEntryVal::default());
        assert!(mgr.validate_value(&vbr_val, Operation::Update).is_err());
    }

    #[test]
    fn entry_semantics() {
        let mgr = VtermIfFlowFilterEntryMoMgr::new();
        let dt = Datatype::Candidate;
        let mut db = ConfigDb::new();
        let pass = entry(FlowAction::Pass, None);
        assert!(matches!(
            mgr.validate_semantics(&pass, &db, dt, Operation::Create),
            Err(UpllError::CfgSemantic(_))
        ));
        db.put(dt, ConfigKey::flowlist("fl1"), Record::default());
        assert!(mgr.validate_semantics(&pass, &db, dt, Operation::Create).is_ok());
        let redirect = entry(FlowAction::Redirect, Some("node1"));
        assert!(mgr.validate_semantics(&redirect, &db, dt, Operation::Create).is_ok());
        let lost = entry(FlowAction::Redirect, None);
        assert!(mgr.validate_semantics(&lost, &db, dt, Operation::Create).is_err());
        let drop_to = entry(FlowAction::Drop, Some("node1"));
        assert!(mgr.validate_semantics(&drop_to, &db, dt, Operation::Create).is_err());
    }
}
