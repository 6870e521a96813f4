// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control of tracing for the UPLL crates.
//!
//! Every crate declares its tracing target(s) with [`trace_target!`]. Targets are
//! collected at link time and can then be re-leveled individually or by tag with
//! [`TracingControl::setup_from_string`], e.g. `default=info,momgr=debug,tx=trace`.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod control;
pub mod display;
pub mod targets;

// re-exports
pub use control::{TraceCtlError, TracingControl, get_trace_ctl};
pub use tracing_subscriber::filter::LevelFilter;

trace_target!("tracectl", LevelFilter::INFO, &[]);
