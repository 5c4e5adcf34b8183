//! Neutral labeled tree for diagnostic output.
//!
//! Segments describe themselves as plain `TreeNode` values; presentation layers
//! (a GUI tree, JSON, plain text) walk the tree however they like.

use std::fmt;

/// Value of a tree node: a rendered scalar or a list of children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Scalar(String),
    Children(Vec<TreeNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub value: NodeValue,
}

impl TreeNode {
    pub fn scalar(label: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            label: label.into(),
            value: NodeValue::Scalar(value.to_string()),
        }
    }

    pub fn branch(label: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            value: NodeValue::Children(children),
        }
    }

    /// Children of a branch node, empty for scalars.
    pub fn children(&self) -> &[TreeNode] {
        match &self.value {
            NodeValue::Children(children) => children,
            NodeValue::Scalar(_) => &[],
        }
    }

    /// Scalar value of a leaf node.
    pub fn as_scalar(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Scalar(value) => Some(value),
            NodeValue::Children(_) => None,
        }
    }

    /// First direct child with the given label.
    pub fn child(&self, label: &str) -> Option<&TreeNode> {
        self.children().iter().find(|c| c.label == label)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        match &self.value {
            NodeValue::Scalar(value) => writeln!(f, "{:indent$}{}: {}", "", self.label, value, indent = indent),
            NodeValue::Children(children) => {
                writeln!(f, "{:indent$}{}", "", self.label, indent = indent)?;
                for child in children {
                    child.write_indented(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Types that can describe themselves as a labeled tree.
pub trait Describe {
    fn describe(&self) -> TreeNode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_rendering() {
        let tree = TreeNode::branch(
            "segment",
            vec![
                TreeNode::scalar("page_id", 1),
                TreeNode::branch("regions", vec![TreeNode::scalar("region_id", 7)]),
            ],
        );
        assert_eq!(tree.to_string(), "segment\n  page_id: 1\n  regions\n    region_id: 7\n");
    }

    #[test]
    fn test_lookup() {
        let tree = TreeNode::branch("root", vec![TreeNode::scalar("a", "x")]);
        assert_eq!(tree.child("a").and_then(|n| n.as_scalar()), Some("x"));
        assert!(tree.child("b").is_none());
        assert!(tree.child("a").unwrap().children().is_empty());
    }
}
