// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Managed object managers and the configuration service built on them.
//!
//! Each key type has a [`mgrs::MoMgr`] that validates requests on its objects and
//! knows which controllers they are sent to. The [`UpllConfigMgr`] keeps the
//! configuration tables of every datatype and processes requests one at a time:
//! edits of the candidate configuration, commits to the controllers through their
//! [`driver::Driver`]s, audits, imports and startup handling.

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

mod audit;
pub mod bindinfo;
mod configmgr;
pub mod driver;
mod import;
pub mod mgrs;
mod ops;
pub mod rename;
pub mod session;
pub mod startup;
pub mod state;
pub mod table;
mod tx;

pub use configmgr::UpllConfigMgr; // re-export
pub use driver::{Driver, DriverError, DriverRegistry, FailPoint, MemoryDriver}; // re-export
pub use session::{RequestHeader, RequestHeaderBuilder, UpllRequest, UpllResponse}; // re-export

use tracectl::trace_target;
trace_target!("momgr", LevelFilter::INFO, &["momgr"]);
