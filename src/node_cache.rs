use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use kuchikiki::{Node, NodeRef};

/// Wraps a `NodeRef` so it can key a `HashMap` by node identity (pointer
/// equality) rather than structural equality.
struct HashableNodeRef(NodeRef);

impl PartialEq for HashableNodeRef {
    fn eq(&self, other: &Self) -> bool {
        let self_ptr: *const Node = &*(self.0).0;
        let other_ptr: *const Node = &*(other.0).0;
        self_ptr == other_ptr
    }
}

impl Eq for HashableNodeRef {}

impl Hash for HashableNodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let ptr: *const Node = &*(self.0).0;
        state.write_usize(ptr as usize);
    }
}

/// `NodeRef` has no structural `PartialEq` impl (and a derived one would be
/// both expensive and the wrong notion of equality for a shared, mutable
/// tree). Two handles refer to the same node iff they point at the same
/// `Node` allocation.
pub fn same_node(a: &NodeRef, b: &NodeRef) -> bool {
    let a_ptr: *const Node = &*a.0;
    let b_ptr: *const Node = &*b.0;
    a_ptr == b_ptr
}

/// Out-of-band score annotations, keyed by node identity.
///
/// Presence in the map is itself the "is readable" marker (§4.3 of the
/// design doc): a node only appears here once `initialize_node` has
/// explicitly inserted it, so `is_annotated` is a plain lookup rather
/// than a get-or-create.
pub struct NodeCache<T>(HashMap<HashableNodeRef, T>);

impl<T> NodeCache<T> {
    pub fn new() -> NodeCache<T> {
        NodeCache(HashMap::new())
    }

    pub fn is_annotated(&self, node: &NodeRef) -> bool {
        self.0.contains_key(&HashableNodeRef(node.clone()))
    }

    pub fn get(&self, node: &NodeRef) -> Option<&T> {
        self.0.get(&HashableNodeRef(node.clone()))
    }

    pub fn get_mut(&mut self, node: &NodeRef) -> Option<&mut T> {
        self.0.get_mut(&HashableNodeRef(node.clone()))
    }

    pub fn insert(&mut self, node: &NodeRef, value: T) {
        self.0.insert(HashableNodeRef(node.clone()), value);
    }
}

impl<T> Default for NodeCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
