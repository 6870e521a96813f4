// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! vBridges and their interfaces

use model::types::PortMap;
use model::validate::{
    MAX_LEN_LOGICAL_PORT_ID, check_description, check_host_ipv4, check_name, check_range,
};
use model::{
    ConfigKey, ConfigKeyVal, ConfigVal, Datatype, KeyType, Operation, UpllError, UpllResult,
};

use super::{
    CtrlrScope, MoMgr, check_attr, check_ctrlr_dom_attrs, check_vnode_leaf, check_vnode_name,
    current_val, effective_val, immutable, wrong_key, wrong_val,
};
use crate::table::ConfigDb;

pub struct VbrMoMgr;

impl MoMgr for VbrMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::Vbridge
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Own
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        if !matches!(key, ConfigKey::Vbridge(_)) {
            return Err(wrong_key(self.key_type(), key));
        }
        check_vnode_leaf("vbridge_name", key)
    }
    fn validate_value(&self, val: &ConfigVal, op: Operation) -> UpllResult<()> {
        let ConfigVal::Vbridge(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_ctrlr_dom_attrs(&v.controller_id, &v.domain_id, op)?;
        check_attr(&v.description, |d| check_description("description", d))?;
        check_attr(&v.host_addr, |a| check_host_ipv4("host_addr", *a))?;
        check_attr(&v.host_addr_prefixlen, |p| {
            check_range("host_addr_prefixlen", *p, 1, 30)
        })
    }
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        match op {
            Operation::Create => check_vnode_name(&ckv.key, db, dt)?,
            Operation::Update => {
                if let (Some(ConfigVal::Vbridge(u)), Some(ConfigVal::Vbridge(c))) =
                    (&ckv.val, current_val(db, dt, &ckv.key))
                {
                    immutable("controller_id", &u.controller_id, &c.controller_id)?;
                    immutable("domain_id", &u.domain_id, &c.domain_id)?;
                }
            }
            _ => return Ok(()),
        }
        // the host address and its prefix length go together
        if let Some(ConfigVal::Vbridge(v)) = effective_val(ckv, db, dt, op)?
            && v.host_addr.is_valid() != v.host_addr_prefixlen.is_valid()
        {
            return Err(UpllError::CfgSemantic(
                "host_addr and host_addr_prefixlen must be set together".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Check a port map: a logical port, and a VLAN when tagged
pub(crate) fn check_portmap(pm: &PortMap) -> UpllResult<()> {
    if pm.logical_port_id.is_empty() || pm.logical_port_id.len() > MAX_LEN_LOGICAL_PORT_ID {
        return Err(UpllError::syntax(
            "logical_port_id",
            format!("must have 1 to {MAX_LEN_LOGICAL_PORT_ID} characters"),
        ));
    }
    match pm.vlan_id {
        Some(vlan) => check_range("vlan_id", vlan, 1, 4095),
        None if pm.tagged => Err(UpllError::syntax("tagged", "needs a vlan_id")),
        None => Ok(()),
    }
}

pub struct VbrIfMoMgr;

impl MoMgr for VbrIfMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::VbrIf
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Inherit
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::VbrIf(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("vtn_name", &k.vbr.vtn.vtn_name)?;
        check_name("vbridge_name", &k.vbr.vbridge_name)?;
        check_name("if_name", &k.if_name)
    }
    fn validate_value(&self, val: &ConfigVal, _op: Operation) -> UpllResult<()> {
        let ConfigVal::VbrIf(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_attr(&v.description, |d| check_description("description", d))?;
        check_attr(&v.portmap, check_portmap)
    }
}
