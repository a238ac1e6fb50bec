//! Hierarchical view over flat object keys.
//!
//! Object storage has no directories; `/`-delimited keys only simulate
//! them. This module folds a flat listing into a forest of nodes, one
//! root per bucket, so the namespace can be browsed like a filesystem.
//!
//! Nodes live in an arena (`Vec<Node>` addressed by `NodeId`) with integer
//! parent back-references, so ancestry walks need no reference cycles.
//! The forest is rebuilt wholesale on every refresh rather than diffed.

use std::collections::HashMap;

use crate::error::SkiffError;
use crate::store::ObjectStore;

/// Index of a node within the forest arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Forest of per-bucket namespace trees.
pub struct KeyForest {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    /// Sibling lookup: (parent arena index, child name) -> child.
    index: HashMap<(usize, String), NodeId>,
}

impl KeyForest {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a forest from everything the store lists.
    ///
    /// Buckets and keys appear in the order the listing reports them.
    /// A listing failure aborts the build; no partial forest is returned.
    pub fn from_store(store: &dyn ObjectStore) -> Result<Self, SkiffError> {
        let mut forest = Self::new();
        for bucket in store.list_buckets()? {
            let root = forest.add_bucket(&bucket.name);
            for object in store.list_objects(&bucket.name)? {
                forest.insert_key(root, &object.key);
            }
        }
        Ok(forest)
    }

    /// Find-or-create the root node for a bucket.
    pub fn add_bucket(&mut self, name: &str) -> NodeId {
        if let Some(&existing) = self
            .roots
            .iter()
            .find(|&&id| self.nodes[id.0].name == name)
        {
            return existing;
        }
        let id = self.alloc(name, NodeKind::Directory, None);
        self.roots.push(id);
        id
    }

    /// Insert one key under a bucket root.
    ///
    /// Every segment but the last becomes (or reuses) a directory node;
    /// the last becomes a file leaf. A key ending in the delimiter is a
    /// directory-only marker: its empty final segment creates no leaf.
    /// When a name is both an object and a prefix, the prefix wins and
    /// the node is a directory.
    pub fn insert_key(&mut self, bucket: NodeId, key: &str) {
        let segments: Vec<&str> = key.split('/').collect();
        let last = segments.len() - 1;

        let mut current = bucket;
        for (i, segment) in segments.into_iter().enumerate() {
            if segment.is_empty() {
                continue;
            }
            let kind = if i == last {
                NodeKind::File
            } else {
                NodeKind::Directory
            };
            current = self.find_or_create_child(current, segment, kind);
        }
    }

    fn find_or_create_child(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> NodeId {
        if let Some(&child) = self.index.get(&(parent.0, name.to_string())) {
            // A key can name both an object and a prefix ("a" next to
            // "a/b.txt"). The prefix wins: the node becomes a directory,
            // so file nodes never carry children.
            if kind == NodeKind::Directory {
                self.nodes[child.0].kind = NodeKind::Directory;
            }
            return child;
        }
        let child = self.alloc(name, kind, Some(parent));
        self.nodes[parent.0].children.push(child);
        self.index.insert((parent.0, name.to_string()), child);
        child
    }

    fn alloc(&mut self, name: &str, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Bucket roots, in listing order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of a node, in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Look up a direct child by name.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.index.get(&(parent.0, name.to_string())).copied()
    }

    /// Reconstruct the canonical `bucket/key` path of a node by walking
    /// the parent chain to its bucket root.
    pub fn full_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            segments.push(node.name.as_str());
            current = node.parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Flat list of every file path under a node, in tree order.
    ///
    /// This is what recursive folder selection feeds into a SelectionSet.
    pub fn leaf_paths_under(&self, id: NodeId) -> Vec<String> {
        let mut leaves = Vec::new();
        self.collect_leaves(id, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<String>) {
        match self.nodes[id.0].kind {
            NodeKind::File => out.push(self.full_path(id)),
            NodeKind::Directory => {
                for &child in &self.nodes[id.0].children {
                    self.collect_leaves(child, out);
                }
            }
        }
    }
}

impl Default for KeyForest {
    fn default() -> Self {
        Self::new()
    }
}
