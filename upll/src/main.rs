// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

mod args;

use crate::args::{CmdArgs, Parser};

use model::ResultCode;
use momgr::{DriverRegistry, MemoryDriver, UpllConfigMgr, UpllRequest, UpllResponse};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracectl::{get_trace_ctl, trace_target};
use tracing::{error, info, level_filters::LevelFilter};

trace_target!("upll", LevelFilter::INFO, &[]);

#[derive(Debug, Error)]
enum ScriptError {
    #[error("Can't read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed script: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// One processed request, as printed
#[derive(Serialize)]
struct Exchange<'a> {
    request: String,
    response: &'a UpllResponse,
}

fn read_script(path: &Path) -> Result<Vec<UpllRequest>, ScriptError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_yaml_ng::from_str(&text)?)
}

/// Process the requests in order and print every response. Returns the number of
/// requests that failed.
fn run(mgr: &UpllConfigMgr, requests: Vec<UpllRequest>) -> Result<usize, ScriptError> {
    let mut failed = 0;
    for request in requests {
        let name = request.name();
        let response = mgr.handle(request);
        if response.result_code != ResultCode::Success {
            failed += 1;
        }
        let exchange = Exchange {
            request: name,
            response: &response,
        };
        println!("---\n{}", serde_yaml_ng::to_string(&exchange)?);
    }
    Ok(failed)
}

fn main() {
    let args = CmdArgs::parse();
    if let Some(tracing) = args.tracing()
        && let Err(e) = get_trace_ctl().setup_from_string(tracing)
    {
        eprintln!("Invalid tracing configuration: {e}");
        std::process::exit(2);
    }
    if args.show_tracing_tags() {
        get_trace_ctl().dump_targets_by_tag();
        std::process::exit(0);
    }
    if args.show_tracing_targets() {
        get_trace_ctl().dump();
        std::process::exit(0);
    }

    let mut drivers = DriverRegistry::new();
    for ctrlr in args.controllers() {
        drivers.add(Box::new(MemoryDriver::new(ctrlr)));
    }
    let mgr = UpllConfigMgr::new(drivers, args.startup().cloned());
    let loaded = mgr.startup();
    if !loaded.is_success() {
        error!("Failed to load startup configuration: {}", loaded.message);
    }

    let Some(script) = args.script() else {
        info!("No script given, nothing to do");
        return;
    };
    let requests = match read_script(script) {
        Ok(requests) => requests,
        Err(e) => {
            error!("{e}");
            eprintln!("{}: {e}", script.display());
            std::process::exit(2);
        }
    };
    info!("Running {} requests from {}", requests.len(), script.display());
    match run(&mgr, requests) {
        Ok(0) => {}
        Ok(failed) => {
            info!("{failed} requests failed");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    }
}
