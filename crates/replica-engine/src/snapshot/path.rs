//! Structural paths

use std::fmt;

use smallvec::SmallVec;

use crate::host::NodeRef;

/// Position of a node relative to its graph root
///
/// Holds the sibling index taken at each level on the way down from the
/// root, so the root is the empty path. Two nodes at the same position of
/// two graphs with the same topology share a path, which is how clone nodes
/// are matched with the source nodes they were copied from. Distinct
/// positions always have distinct paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StructuralPath(SmallVec<[u32; 8]>);

impl StructuralPath {
    /// Path of the root node
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the `index`th child of the node at this path
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index as u32);
        Self(indices)
    }

    /// Path of `node` below `root`
    ///
    /// Looks up the sibling index of every ancestor; prefer [`walk`] when
    /// visiting a whole subtree. A node outside of `root`'s subtree gets the
    /// path of its whole ancestry.
    ///
    /// [`walk`]: StructuralPath::walk
    pub fn of(node: &NodeRef, root: &NodeRef) -> Self {
        let mut indices = SmallVec::new();
        let mut current = Some(node.clone());
        while let Some(cursor) = current {
            if cursor.ptr_eq(root) {
                break;
            }
            indices.push(cursor.sibling_index() as u32);
            current = cursor.parent();
        }
        indices.reverse();
        Self(indices)
    }

    /// Append `root` and its descendants to `out` with their paths
    ///
    /// Depth-first in sibling order. Paths are derived from the parent's path
    /// while walking, so no sibling lookups happen.
    pub fn walk(root: &NodeRef, out: &mut Vec<(NodeRef, StructuralPath)>) {
        let mut stack = vec![(root.clone(), Self::root())];
        while let Some((node, path)) = stack.pop() {
            let children = node.children();
            for (index, child) in children.into_iter().enumerate().rev() {
                stack.push((child, path.child(index)));
            }
            out.push((node, path));
        }
    }

    /// Levels below the root
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Sibling indices from the root down
    pub fn indices(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}
