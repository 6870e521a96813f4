// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Key types and the static key tree

use keytree::KeyTree;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use strum::IntoEnumIterator;
use tracing::error;

/// The kinds of configuration objects. Declaration order is the order in which
/// siblings are processed: flow lists come before the VTNs whose flow-filters use them.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyType {
    Root,
    FlowList,
    UnifiedNetwork,
    UnwSpineDomain,
    Vtn,
    Vbridge,
    VbrIf,
    VbrIfFlowFilter,
    VbrIfFlowFilterEntry,
    Vrouter,
    VrtIf,
    StaticIpRoute,
    Vterminal,
    VtermIf,
    VtermIfFlowFilter,
    VtermIfFlowFilterEntry,
    Vunknown,
    VunkIf,
}

impl KeyType {
    /// The key type of the parent object. Only the root has none.
    #[must_use]
    pub fn parent(self) -> Option<KeyType> {
        let parent = match self {
            KeyType::Root => return None,
            KeyType::FlowList | KeyType::UnifiedNetwork | KeyType::Vtn => KeyType::Root,
            KeyType::UnwSpineDomain => KeyType::UnifiedNetwork,
            KeyType::Vbridge | KeyType::Vrouter | KeyType::Vterminal | KeyType::Vunknown => {
                KeyType::Vtn
            }
            KeyType::VbrIf => KeyType::Vbridge,
            KeyType::VbrIfFlowFilter => KeyType::VbrIf,
            KeyType::VbrIfFlowFilterEntry => KeyType::VbrIfFlowFilter,
            KeyType::VrtIf | KeyType::StaticIpRoute => KeyType::Vrouter,
            KeyType::VtermIf => KeyType::Vterminal,
            KeyType::VtermIfFlowFilter => KeyType::VtermIf,
            KeyType::VtermIfFlowFilterEntry => KeyType::VtermIfFlowFilter,
            KeyType::VunkIf => KeyType::Vunknown,
        };
        Some(parent)
    }

    /// Tell if objects of this type carry a value
    #[must_use]
    pub fn has_value(self) -> bool {
        !matches!(
            self,
            KeyType::Root | KeyType::VbrIfFlowFilter | KeyType::VtermIfFlowFilter
        )
    }

    /// Tell if this is a virtual node (a direct child of a VTN)
    #[must_use]
    pub fn is_vnode(self) -> bool {
        self.parent() == Some(KeyType::Vtn)
    }

    /// Tell if this is a vnode interface
    #[must_use]
    pub fn is_vnode_if(self) -> bool {
        self.parent().is_some_and(KeyType::is_vnode)
            && matches!(
                self,
                KeyType::VbrIf | KeyType::VrtIf | KeyType::VtermIf | KeyType::VunkIf
            )
    }

    /// Names of the key columns of this key type, outermost first
    #[must_use]
    pub fn key_columns(self) -> Vec<&'static str> {
        let mut cols = self.parent().map(KeyType::key_columns).unwrap_or_default();
        match self {
            KeyType::Root => {}
            KeyType::FlowList => cols.push("flowlist_name"),
            KeyType::UnifiedNetwork => cols.push("unified_nw_id"),
            KeyType::UnwSpineDomain => cols.push("spine_id"),
            KeyType::Vtn => cols.push("vtn_name"),
            KeyType::Vbridge => cols.push("vbridge_name"),
            KeyType::Vrouter => cols.push("vrouter_name"),
            KeyType::Vterminal => cols.push("vterminal_name"),
            KeyType::Vunknown => cols.push("vunknown_name"),
            KeyType::VbrIf | KeyType::VrtIf | KeyType::VtermIf | KeyType::VunkIf => {
                cols.push("if_name");
            }
            KeyType::StaticIpRoute => {
                cols.extend(["dst_addr", "dst_prefixlen", "next_hop_addr", "nwm_name"]);
            }
            KeyType::VbrIfFlowFilter | KeyType::VtermIfFlowFilter => cols.push("direction"),
            KeyType::VbrIfFlowFilterEntry | KeyType::VtermIfFlowFilterEntry => {
                cols.push("sequence_num");
            }
        }
        cols
    }

    /// Iterate over all configuration key types (all but the root)
    pub fn config_types() -> impl Iterator<Item = KeyType> {
        KeyType::iter().filter(|kt| *kt != KeyType::Root)
    }
}

fn build_key_tree() -> KeyTree<KeyType> {
    let mut tree = KeyTree::new(KeyType::Root);
    // parents are declared before their children
    for kt in KeyType::config_types() {
        if let Some(parent) = kt.parent()
            && let Err(e) = tree.add_node(parent, kt)
        {
            error!("Failed to add {kt} to the key tree: {e}");
        }
    }
    tree
}

static KEY_TREE: LazyLock<KeyTree<KeyType>> = LazyLock::new(build_key_tree);

/// The hierarchy of all key types
#[must_use]
pub fn key_tree() -> &'static KeyTree<KeyType> {
    &KEY_TREE
}
