// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use model::validate::{check_description, check_name};
use model::{ConfigKey, ConfigVal, KeyType, Operation, UpllResult};

use super::{CtrlrScope, MoMgr, check_attr, wrong_key, wrong_val};

/// VTNs. A VTN exists at every controller any of its vnodes is at.
pub struct VtnMoMgr;

impl MoMgr for VtnMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::Vtn
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::VtnMembers
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::Vtn(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("vtn_name", &k.vtn_name)
    }
    fn validate_value(&self, val: &ConfigVal, _op: Operation) -> UpllResult<()> {
        let ConfigVal::Vtn(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_attr(&v.description, |d| check_description("description", d))
    }
}
