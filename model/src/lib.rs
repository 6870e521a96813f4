// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration object model of the UPLL coordinator.
//!
//! Every configuration object is identified by a [`ConfigKey`] and may carry a
//! [`ConfigVal`]. Keys embed the key of their parent, so the object hierarchy
//! (VTN, vnodes, interfaces, flow-filters, ...) is implicit in the keys and explicit
//! in the static [`key_tree`] of [`KeyType`]s. The pair of both, plus status
//! information, travels as a [`ConfigKeyVal`].

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod attr;
pub mod ckv;
pub mod display;
pub mod errors;
pub mod key;
pub mod keytype;
pub mod types;
pub mod val;
pub mod validate;

pub use attr::{Attr, AttrVal}; // re-export
pub use ckv::{ConfigKeyVal, CtrlrDom}; // re-export
pub use errors::{ResultCode, UpllError, UpllResult}; // re-export
pub use key::ConfigKey; // re-export
pub use keytype::{KeyType, key_tree}; // re-export
pub use types::{ConfigStatus, Datatype, Operation, OperStatus, ValidFlag}; // re-export
pub use val::ConfigVal; // re-export

use tracectl::trace_target;
trace_target!("model", LevelFilter::INFO, &["momgr"]);
