// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing targets declared by the linked crates, gathered at link time

use crate::LevelFilter;
use linkme::distributed_slice;

/// The declaration of a target: the target string, its short name, the level it
/// starts at and the tags it can be set by
pub type TargetDecl = (
    &'static str,
    &'static str,
    LevelFilter,
    &'static [&'static str],
);

#[allow(unsafe_code)] // linkme places the slice in a dedicated link section
#[distributed_slice]
pub static DECLARED_TARGETS: [TargetDecl];

/// Declare a tracing target. With a short name only, the target is the module path
/// of the caller; `"target" => "name"` names a target explicitly.
///
/// ```ignore
/// trace_target!("momgr", LevelFilter::INFO, &["momgr"]);
/// ```
#[macro_export]
macro_rules! trace_target {
    ($name:expr, $level:expr, $tags:expr) => {
        $crate::trace_target!(module_path!() => $name, $level, $tags);
    };
    ($target:expr => $name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::LevelFilter;
            use linkme::distributed_slice;

            #[allow(unsafe_code)] // linkme places the entry in a dedicated link section
            #[distributed_slice($crate::targets::DECLARED_TARGETS)]
            static DECL: $crate::targets::TargetDecl = ($target, $name, $level, $tags);
        };
    };
}
