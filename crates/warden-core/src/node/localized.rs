use super::Node;
use std::fmt;

/// A node paired with the name of the holder it was collected from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalizedNode {
    node: Node,
    location: String,
}

impl LocalizedNode {
    /// Tag `node` with the object name of the holder it came from.
    pub fn new(node: Node, location: impl Into<String>) -> Self {
        Self {
            node,
            location: location.into(),
        }
    }

    /// The node.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Object name of the holder the node belongs to.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Drop the location.
    pub fn into_node(self) -> Node {
        self.node
    }
}

impl AsRef<Node> for LocalizedNode {
    fn as_ref(&self) -> &Node {
        &self.node
    }
}

impl fmt::Display for LocalizedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.node, self.location)
    }
}
