// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The unit of configuration exchanged with clients, tables and drivers

use serde::{Deserialize, Serialize};

use crate::errors::{UpllError, UpllResult};
use crate::key::ConfigKey;
use crate::keytype::KeyType;
use crate::types::{ConfigStatus, OperStatus};
use crate::val::ConfigVal;

/// The controller (and domain in it) an object is instantiated at
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CtrlrDom {
    pub ctrlr: String,
    pub domain: String,
}
impl CtrlrDom {
    pub fn new(ctrlr: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            ctrlr: ctrlr.into(),
            domain: domain.into(),
        }
    }
}

/// A configuration object: its key, its value and where and how it is applied
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigKeyVal {
    pub key: ConfigKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<ConfigVal>,
    #[serde(default, skip_serializing_if = "is_invalid_status")]
    pub cs_row: ConfigStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cs_attr: Vec<ConfigStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrlr_dom: Option<CtrlrDom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oper_status: Option<OperStatus>,
}

fn is_invalid_status(status: &ConfigStatus) -> bool {
    *status == ConfigStatus::Invalid
}

impl ConfigKeyVal {
    #[must_use]
    pub fn new(key: ConfigKey) -> Self {
        Self {
            key,
            val: None,
            cs_row: ConfigStatus::Invalid,
            cs_attr: vec![],
            ctrlr_dom: None,
            oper_status: None,
        }
    }
    #[must_use]
    pub fn with_val(key: ConfigKey, val: ConfigVal) -> Self {
        let mut ckv = Self::new(key);
        ckv.val = Some(val);
        ckv
    }
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key.key_type()
    }

    /// A copy of this object with its status information reset
    #[must_use]
    pub fn dup(&self) -> Self {
        let mut dup = Self::new(self.key.clone());
        dup.val.clone_from(&self.val);
        dup
    }

    /// Check that the value, if any, belongs to the same key type as the key
    pub fn check_consistency(&self) -> UpllResult<()> {
        let kt = self.key_type();
        if kt == KeyType::Root {
            return Err(UpllError::BadRequest("the root is not configurable".to_owned()));
        }
        match &self.val {
            Some(val) if val.key_type() != kt => Err(UpllError::BadRequest(format!(
                "{} value in a {kt} request",
                val.key_type()
            ))),
            Some(_) if !kt.has_value() => Err(UpllError::BadRequest(format!(
                "{kt} objects have no value"
            ))),
            _ => Ok(()),
        }
    }
}
