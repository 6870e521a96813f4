// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Unknown vnodes: placeholders for equipment that no controller manages. They are
//! kept in the configuration but never sent to a controller.

use model::validate::{check_description, check_domain_id, check_name};
use model::{ConfigKey, ConfigKeyVal, ConfigVal, Datatype, KeyType, Operation, UpllResult};

use super::{
    CtrlrScope, MoMgr, check_attr, check_vnode_leaf, check_vnode_name, mandatory, wrong_key,
    wrong_val,
};
use crate::table::ConfigDb;

pub struct VunknownMoMgr;

impl MoMgr for VunknownMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::Vunknown
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::None
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        if !matches!(key, ConfigKey::Vunknown(_)) {
            return Err(wrong_key(self.key_type(), key));
        }
        check_vnode_leaf("vunknown_name", key)
    }
    fn validate_value(&self, val: &ConfigVal, op: Operation) -> UpllResult<()> {
        let ConfigVal::Vunknown(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        mandatory("vunknown_type", &v.vunknown_type, op)?;
        check_attr(&v.description, |d| check_description("description", d))?;
        check_attr(&v.domain_id, |d| check_domain_id(d))
    }
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        if op == Operation::Create {
            check_vnode_name(&ckv.key, db, dt)?;
        }
        Ok(())
    }
}

pub struct VunkIfMoMgr;

impl MoMgr for VunkIfMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::VunkIf
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::None
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::VunkIf(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("vtn_name", &k.vunk.vtn.vtn_name)?;
        check_name("vunknown_name", &k.vunk.vunknown_name)?;
        check_name("if_name", &k.if_name)
    }
    fn validate_value(&self, val: &ConfigVal, _op: Operation) -> UpllResult<()> {
        let ConfigVal::VunkIf(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_attr(&v.description, |d| check_description("description", d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::types::VunknownType;
    use model::val::{VunkIfVal, VunknownVal};

    #[test]
    fn vunknown_value() {
        let mgr = VunknownMoMgr;
        let typed = ConfigVal::Vunknown(VunknownVal {
            vunknown_type: VunknownType::Bridge.into(),
            domain_id: "dom1".to_owned().into(),
            ..Default::default()
        });
        assert!(mgr.validate_value(&typed, Operation::Create).is_ok());
        let untyped = ConfigVal::Vunknown(VunknownVal::default());
        assert!(mgr.validate_value(&untyped, Operation::Create).is_err());
        assert!(mgr.validate_value(&untyped, Operation::Update).is_ok());
        assert_eq!(mgr.ctrlr_scope(), CtrlrScope::None);
    }

    #[test]
    fn vunk_if_key_and_value() {
        let mgr = VunkIfMoMgr;
        let vunk = ConfigKey::vtn("vtn1").child_key(KeyType::Vunknown, "sw").unwrap();
        let key = mgr.get_child_config_key(&vunk, "port1").unwrap();
        assert!(mgr.validate_key(&key).is_ok());
        assert_eq!(mgr.get_parent_config_key(&key), Some(vunk.clone()));
        assert!(mgr.validate_key(&vunk).is_err());
        assert!(mgr.validate_key(&vunk.child_key(KeyType::VunkIf, "port-1").unwrap()).is_err());
        let val = ConfigVal::VunkIf(VunkIfVal {
            description: "uplink".to_owned().into(),
            ..Default::default()
        });
        assert!(mgr.validate_value(&val, Operation::Create).is_ok());
        let dup = mgr.dup_config_key_val(&ConfigKeyVal::with_val(key.clone(), val.clone()));
        assert_eq!(dup.val, Some(val));
    }
}
