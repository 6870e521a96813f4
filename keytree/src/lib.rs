// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A static hierarchy of key types.
//!
//! Configuration objects form a tree of key types (a vBridge lives in a VTN, an
//! interface lives in a vBridge, and so on). [`KeyTree`] records that hierarchy and
//! offers the traversals needed to process tables in dependency order: parents
//! before children when creating ([`KeyTree::preorder`]) and children before parents
//! when deleting ([`KeyTree::reverse_preorder`]).

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

use ordermap::OrderMap;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;
use tracectl::trace_target;
use tracing::debug;

trace_target!("keytree", LevelFilter::INFO, &["momgr"]);

#[derive(Debug, Error, PartialEq)]
pub enum KeyTreeError<K: Debug> {
    #[error("Parent node {0:?} does not exist")]
    NoSuchParent(K),
    #[error("Node {0:?} does not exist")]
    NoSuchNode(K),
    #[error("Node {0:?} already exists")]
    DuplicateNode(K),
    #[error("The root node cannot be removed")]
    RootRemoval,
}

#[derive(Clone, Debug)]
struct Node<K> {
    parent: Option<K>,
    children: Vec<K>,
}
impl<K> Node<K> {
    fn new(parent: Option<K>) -> Self {
        Self {
            parent,
            children: vec![],
        }
    }
}

/// A tree of keys. Siblings keep their insertion order.
#[derive(Clone, Debug)]
pub struct KeyTree<K> {
    root: K,
    nodes: OrderMap<K, Node<K>>,
}

impl<K> KeyTree<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Create a tree with a single `root` node
    #[must_use]
    pub fn new(root: K) -> Self {
        let mut nodes = OrderMap::new();
        nodes.insert(root, Node::new(None));
        Self { root, nodes }
    }

    /// Append `child` as the last child of `parent`
    pub fn add_node(&mut self, parent: K, child: K) -> Result<(), KeyTreeError<K>> {
        if self.nodes.contains_key(&child) {
            return Err(KeyTreeError::DuplicateNode(child));
        }
        let Some(pnode) = self.nodes.get_mut(&parent) else {
            return Err(KeyTreeError::NoSuchParent(parent));
        };
        pnode.children.push(child);
        self.nodes.insert(child, Node::new(Some(parent)));
        debug!("Added key {child:?} under {parent:?}");
        Ok(())
    }

    /// Remove `key` and its whole subtree. Returns the removed keys in preorder.
    pub fn remove(&mut self, key: K) -> Result<Vec<K>, KeyTreeError<K>> {
        if key == self.root {
            return Err(KeyTreeError::RootRemoval);
        }
        let Some(parent) = self.parent(key) else {
            return Err(KeyTreeError::NoSuchNode(key));
        };
        let removed: Vec<K> = self.preorder_from(key).collect();
        if let Some(pnode) = self.nodes.get_mut(&parent) {
            pnode.children.retain(|c| *c != key);
        }
        for k in &removed {
            self.nodes.remove(k);
        }
        Ok(removed)
    }

    #[must_use]
    pub fn root(&self) -> K {
        self.root
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.nodes.contains_key(&key)
    }
    #[must_use]
    pub fn parent(&self, key: K) -> Option<K> {
        self.nodes.get(&key).and_then(|n| n.parent)
    }
    /// The children of `key`, in insertion order. Empty if the key is unknown.
    #[must_use]
    pub fn children(&self, key: K) -> &[K] {
        self.nodes.get(&key).map_or(&[], |n| n.children.as_slice())
    }
    #[must_use]
    pub fn first_child(&self, key: K) -> Option<K> {
        self.children(key).first().copied()
    }
    /// The sibling that follows `key` under the same parent
    #[must_use]
    pub fn next_sibling(&self, key: K) -> Option<K> {
        let siblings = self.children(self.parent(key)?);
        let pos = siblings.iter().position(|k| *k == key)?;
        siblings.get(pos + 1).copied()
    }
    /// Distance to the root. The root has depth 0.
    #[must_use]
    pub fn depth(&self, key: K) -> Option<usize> {
        self.contains(key).then(|| self.ancestors(key).count())
    }
    /// Iterate over the ancestors of `key`, nearest first, root last
    pub fn ancestors(&self, key: K) -> impl Iterator<Item = K> + '_ {
        std::iter::successors(self.parent(key), move |k| self.parent(*k))
    }
    /// Tell if `ancestor` is a (strict) ancestor of `key`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: K, key: K) -> bool {
        self.ancestors(key).any(|k| k == ancestor)
    }

    /// Preorder iteration over the whole tree, root included
    #[must_use]
    pub fn preorder(&self) -> PreOrder<'_, K> {
        self.preorder_from(self.root)
    }
    /// Preorder iteration over the subtree rooted at `key`. Empty if the key is unknown.
    #[must_use]
    pub fn preorder_from(&self, key: K) -> PreOrder<'_, K> {
        PreOrder {
            tree: self,
            start: key,
            next: self.contains(key).then_some(key),
        }
    }
    /// The exact reverse of [`KeyTree::preorder`]: every node comes before its parent
    #[must_use]
    pub fn reverse_preorder(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.preorder().collect();
        keys.reverse();
        keys
    }
}

/// Preorder iterator over a (sub)tree. It keeps no stack: the successor of a node is
/// its first child or, failing that, the next sibling of the nearest node on the way
/// back up to the start of the walk.
pub struct PreOrder<'a, K> {
    tree: &'a KeyTree<K>,
    start: K,
    next: Option<K>,
}

impl<K> PreOrder<'_, K>
where
    K: Copy + Eq + Hash + Debug,
{
    fn successor(&self, key: K) -> Option<K> {
        if let Some(child) = self.tree.first_child(key) {
            return Some(child);
        }
        let mut cursor = key;
        while cursor != self.start {
            if let Some(sibling) = self.tree.next_sibling(cursor) {
                return Some(sibling);
            }
            cursor = self.tree.parent(cursor)?;
        }
        None
    }
}

impl<K> Iterator for PreOrder<'_, K>
where
    K: Copy + Eq + Hash + Debug,
{
    type Item = K;
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.successor(current);
        Some(current)
    }
}
