// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! vTerminals and their interface

use model::validate::{check_description, check_name};
use model::{
    ConfigKey, ConfigKeyVal, ConfigVal, Datatype, KeyType, Operation, UpllError, UpllResult,
};

use super::vbr::check_portmap;
use super::{
    CtrlrScope, MoMgr, check_attr, check_ctrlr_dom_attrs, check_vnode_leaf, check_vnode_name,
    current_val, immutable, wrong_key, wrong_val,
};
use crate::table::ConfigDb;

pub struct VtermMoMgr;

impl MoMgr for VtermMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::Vterminal
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Own
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        if !matches!(key, ConfigKey::Vterminal(_)) {
            return Err(wrong_key(self.key_type(), key));
        }
        check_vnode_leaf("vterminal_name", key)
    }
    fn validate_value(&self, val: &ConfigVal, op: Operation) -> UpllResult<()> {
        let ConfigVal::Vterminal(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_ctrlr_dom_attrs(&v.controller_id, &v.domain_id, op)?;
        check_attr(&v.description, |d| check_description("description", d))
    }
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        match (op, &ckv.val, current_val(db, dt, &ckv.key)) {
            (Operation::Create, _, _) => check_vnode_name(&ckv.key, db, dt),
            (Operation::Update, Some(ConfigVal::Vterminal(u)), Some(ConfigVal::Vterminal(c))) => {
                immutable("controller_id", &u.controller_id, &c.controller_id)?;
                immutable("domain_id", &u.domain_id, &c.domain_id)
            }
            _ => Ok(()),
        }
    }
}

/// A vTerminal has a single interface
pub struct VtermIfMoMgr;

impl MoMgr for VtermIfMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::VtermIf
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Inherit
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::VtermIf(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("vtn_name", &k.vterm.vtn.vtn_name)?;
        check_name("vterminal_name", &k.vterm.vterminal_name)?;
        check_name("if_name", &k.if_name)
    }
    fn validate_value(&self, val: &ConfigVal, _op: Operation) -> UpllResult<()> {
        let ConfigVal::VtermIf(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_attr(&v.description, |d| check_description("description", d))?;
        check_attr(&v.portmap, check_portmap)
    }
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        if op != Operation::Create {
            return Ok(());
        }
        let Some(vterm) = ckv.key.parent_key() else {
            return Ok(());
        };
        if let Some((existing, _)) = db.children(dt, &vterm, KeyType::VtermIf).first() {
            return Err(UpllError::CfgSemantic(format!(
                "{vterm} already has interface {existing}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Record;

    #[test]
    fn single_interface() {
        let mgr = VtermIfMoMgr;
        let dt = Datatype::Candidate;
        let vterm = ConfigKey::vtn("vtn1").child_key(KeyType::Vterminal, "vt").unwrap();
        let if1 = vterm.child_key(KeyType::VtermIf, "if1").unwrap();
        let if2 = vterm.child_key(KeyType::VtermIf, "if2").unwrap();
        let mut db = ConfigDb::new();
        let first = ConfigKeyVal::new(if1.clone());
        assert!(mgr.validate_semantics(&first, &db, dt, Operation::Create).is_ok());
        db.put(dt, if1.clone(), Record::default());
        let second = ConfigKeyVal::new(if2);
        assert!(matches!(
            mgr.validate_semantics(&second, &db, dt, Operation::Create),
            Err(UpllError::CfgSemantic(_))
        ));
        // the other vterminal is unaffected
        let other = ConfigKey::vtn("vtn1")
            .child_key(KeyType::Vterminal, "vt2")
            .unwrap()
            .child_key(KeyType::VtermIf, "if1")
            .unwrap();
        let other = ConfigKeyVal::new(other);
        assert!(mgr.validate_semantics(&other, &db, dt, Operation::Create).is_ok());
        assert!(mgr.validate_semantics(&first, &db, dt, Operation::Update).is_ok());
    }
}
