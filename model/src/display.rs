// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Human-readable rendering of keys, values and configuration objects

use std::fmt::Display;

use crate::ckv::{ConfigKeyVal, CtrlrDom};
use crate::key::ConfigKey;
use crate::types::ConfigStatus;
use crate::val::ConfigVal;

impl Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{", self.key_type())?;
        for (n, (col, value)) in self.columns().iter().enumerate() {
            if n > 0 {
                write!(f, ",")?;
            }
            write!(f, "{col}={value}")?;
        }
        write!(f, "}}")
    }
}

impl Display for ConfigVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for ((name, flag), value) in self
            .attr_names()
            .iter()
            .zip(self.valid_flags())
            .zip(self.attr_strings())
        {
            if flag == crate::types::ValidFlag::Invalid {
                continue;
            }
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

impl Display for CtrlrDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.ctrlr, self.domain)
    }
}

impl Display for ConfigKeyVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)?;
        if let Some(val) = &self.val {
            write!(f, " val{val}")?;
        }
        if self.cs_row != ConfigStatus::Invalid {
            write!(f, " cs={}", self.cs_row)?;
        }
        if let Some(cd) = &self.ctrlr_dom {
            write!(f, " at={cd}")?;
        }
        if let Some(oper) = &self.oper_status {
            write!(f, " oper={oper}")?;
        }
        Ok(())
    }
}
