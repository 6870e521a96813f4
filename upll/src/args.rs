// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::path::PathBuf;

pub(crate) use clap::Parser;

#[derive(Parser)]
#[command(name = "upll")]
#[command(version = "0.1")]
#[command(
    about = "Runs configuration requests against simulated network controllers",
    long_about = None
)]
pub(crate) struct CmdArgs {
    #[arg(
        long,
        value_name = "NAME",
        help = "Simulate a controller with this name. May be repeated."
    )]
    controller: Vec<String>,

    #[arg(
        long,
        value_name = "FILE",
        help = "File the startup configuration is saved to and loaded from"
    )]
    startup: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "YAML list of requests to process, in order"
    )]
    script: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = false,
        help = "Show the available tracing tags and exit"
    )]
    show_tracing_tags: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Show configurable tracing targets and exit"
    )]
    show_tracing_targets: bool,

    #[arg(
        long,
        value_name = "tracing configuration",
        help = "Tracing config string as comma-separated sequence of tag=level, with level one in [off,error,warn,info,debug,trace].
Passing default=level sets the default log-level.
Passing all=level allows setting the log-level of all targets to level.
E.g. default=error,all=info,momgr=debug"
    )]
    tracing: Option<String>,
}

impl CmdArgs {
    pub fn controllers(&self) -> &[String] {
        &self.controller
    }
    pub fn startup(&self) -> Option<&PathBuf> {
        self.startup.as_ref()
    }
    pub fn script(&self) -> Option<&PathBuf> {
        self.script.as_ref()
    }
    pub fn show_tracing_tags(&self) -> bool {
        self.show_tracing_tags
    }
    pub fn show_tracing_targets(&self) -> bool {
        self.show_tracing_targets
    }
    pub fn tracing(&self) -> Option<&String> {
        self.tracing.as_ref()
    }
}
