/// Rooted tree navigation used by the bipartition and CSV exporters.
///
/// Parsing is delegated to the `newick` crate; the parsed tree is copied into
/// a small arena with every internal node given a stable `Node_<k>` name.
use crate::{Result, SupertreeError};
use newick::{Newick, NewickTree, NodeID};
use std::collections::BTreeSet;
use std::io::Write;

/// Parent/child navigation and leaf enumeration over a rooted tree
pub trait TreeTopology {
    fn root(&self) -> usize;
    fn children(&self, node: usize) -> &[usize];
    fn parent(&self, node: usize) -> Option<usize>;
    fn label(&self, node: usize) -> &str;

    fn is_leaf(&self, node: usize) -> bool {
        self.children(node).is_empty()
    }

    fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        order
    }

    fn postorder(&self) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).iter());
        }
        order.reverse();
        order
    }

    /// Leaves in left-to-right order
    fn leaves(&self) -> Vec<usize> {
        self.preorder()
            .into_iter()
            .filter(|&n| self.is_leaf(n))
            .collect()
    }

    fn leaf_labels_under(&self, node: usize) -> BTreeSet<String> {
        let mut labels = BTreeSet::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if self.is_leaf(n) {
                labels.insert(self.label(n).to_string());
            } else {
                stack.extend(self.children(n).iter());
            }
        }
        labels
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct LabelledTree {
    nodes: Vec<TreeNode>,
    root: usize,
}

impl LabelledTree {
    pub fn with_root(label: impl Into<String>) -> Self {
        Self {
            nodes: vec![TreeNode {
                label: label.into(),
                parent: None,
                children: Vec::new(),
            }],
            root: 0,
        }
    }

    pub fn add_child(&mut self, parent: usize, label: impl Into<String>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            label: label.into(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parse one Newick tree and name its internal nodes
    pub fn from_newick(text: &str) -> Result<Self> {
        let parsed: NewickTree = newick::one_from_string(text.trim())
            .map_err(|e| SupertreeError::Parse(format!("invalid Newick tree: {}", e)))?;

        let mut tree = Self::with_root(String::new());
        let mut stack: Vec<(NodeID, usize)> = parsed[parsed.root()]
            .children()
            .iter()
            .rev()
            .map(|&c| (c, tree.root))
            .collect();

        while let Some((source, parent)) = stack.pop() {
            let label = if parsed[source].is_leaf() {
                parsed
                    .name(source)
                    .map(|name| name.trim().replace(' ', "_"))
                    .unwrap_or_default()
            } else {
                String::new()
            };
            let id = tree.add_child(parent, label);
            stack.extend(parsed[source].children().iter().rev().map(|&c| (c, id)));
        }

        tree.name_internal_nodes();
        Ok(tree)
    }

    /// Internal nodes become `Node_1`, `Node_2`, ... in post-order, i.e. in
    /// the order their closing parentheses appear in the Newick text.
    fn name_internal_nodes(&mut self) {
        let mut count = 0;
        for node in self.postorder() {
            if !self.is_leaf(node) {
                count += 1;
                self.nodes[node].label = format!("Node_{}", count);
            }
        }
    }

    /// `name,parent` table in pre-order; the root has no parent column
    pub fn write_parent_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "name,parent")?;
        for node in self.preorder() {
            match self.parent(node) {
                Some(parent) => writeln!(writer, "{},{}", self.label(node), self.label(parent))?,
                None => writeln!(writer, "{}", self.label(node))?,
            }
        }
        Ok(())
    }
}

impl TreeTopology for LabelledTree {
    fn root(&self) -> usize {
        self.root
    }

    fn children(&self, node: usize) -> &[usize] {
        &self.nodes[node].children
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }

    fn label(&self, node: usize) -> &str {
        &self.nodes[node].label
    }
}
