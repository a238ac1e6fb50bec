//! Ordered, deduplicated set of remote paths chosen for transfer.

use crate::tree::{KeyForest, NodeId};

/// User selection of full `bucket/key` paths, in pick order.
#[derive(Debug, Default)]
pub struct Selection {
    paths: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path. Adding a path that is already present is a no-op.
    pub fn add(&mut self, path: &str) {
        if !self.paths.iter().any(|p| p == path) {
            self.paths.push(path.to_string());
        }
    }

    /// Add every file under `node` (the node itself if it is a file).
    pub fn add_subtree(&mut self, forest: &KeyForest, node: NodeId) {
        for path in forest.leaf_paths_under(node) {
            self.add(&path);
        }
    }

    /// Remove the path at `index`, returning it. Out-of-range is a no-op.
    pub fn remove_at(&mut self, index: usize) -> Option<String> {
        if index < self.paths.len() {
            Some(self.paths.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::KeyForest;

    #[test]
    fn add_is_idempotent() {
        let mut sel = Selection::new();
        sel.add("bucket1/a/file.txt");
        sel.add("bucket1/a/file.txt");
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn order_follows_pick_order() {
        let mut sel = Selection::new();
        sel.add("b/z.txt");
        sel.add("b/a.txt");
        sel.add("b/m.txt");
        assert_eq!(sel.paths(), &["b/z.txt", "b/a.txt", "b/m.txt"]);
    }

    #[test]
    fn remove_at_keeps_remaining_order() {
        let mut sel = Selection::new();
        sel.add("b/one");
        sel.add("b/two");
        sel.add("b/three");
        assert_eq!(sel.remove_at(1).as_deref(), Some("b/two"));
        assert_eq!(sel.paths(), &["b/one", "b/three"]);
        assert_eq!(sel.remove_at(10), None);
    }

    #[test]
    fn clear_empties_selection() {
        let mut sel = Selection::new();
        sel.add("b/one");
        sel.clear();
        assert!(sel.is_empty());
    }

    #[test]
    fn add_subtree_selects_all_leaves_once() {
        let mut forest = KeyForest::new();
        let root = forest.add_bucket("bucket1");
        forest.insert_key(root, "a/b/file1.txt");
        forest.insert_key(root, "a/file2.txt");
        forest.insert_key(root, "c/file3.txt");

        let mut sel = Selection::new();
        // Pre-select one leaf, then select the whole "a" directory
        sel.add("bucket1/a/file2.txt");
        let a = forest.child(root, "a").unwrap();
        sel.add_subtree(&forest, a);

        assert_eq!(
            sel.paths(),
            &["bucket1/a/file2.txt", "bucket1/a/b/file1.txt"]
        );
    }
}
