//! Call-scoped arena of variant nodes.
//!
//! A [`VariantPool`] owns every node built during one bridge call. Nodes are
//! addressed through [`VariantRef`], an index that borrows the pool, so a
//! reference cannot outlive the pool that allocated it and cannot be resolved
//! against any other pool.

use std::cell::RefCell;
use std::fmt::{self, Debug, Display, Formatter};
use std::mem;

use tracing::debug;

use crate::error::{OtamaError, OtamaResult};
use crate::feature::OpaqueHandle;

/// Tag of a variant node. Fixed once the node has been assigned.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Null = 0,
    Int = 1,
    Float = 2,
    String = 3,
    Binary = 4,
    Array = 5,
    Hash = 6,
    /// Foreign handle, passed through without inspection.
    Opaque = 7,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Null => "null",
            VariantKind::Int => "int",
            VariantKind::Float => "float",
            VariantKind::String => "string",
            VariantKind::Binary => "binary",
            VariantKind::Array => "array",
            VariantKind::Hash => "hash",
            VariantKind::Opaque => "opaque",
        }
    }
}

impl Display for VariantKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Node {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<usize>),
    Hash(Vec<(String, usize)>),
    Opaque(OpaqueHandle),
}

impl Node {
    fn kind(&self) -> VariantKind {
        match self {
            Node::Null => VariantKind::Null,
            Node::Int(_) => VariantKind::Int,
            Node::Float(_) => VariantKind::Float,
            Node::String(_) => VariantKind::String,
            Node::Binary(_) => VariantKind::Binary,
            Node::Array(_) => VariantKind::Array,
            Node::Hash(_) => VariantKind::Hash,
            Node::Opaque(_) => VariantKind::Opaque,
        }
    }
}

/// Arena owning all variant nodes of one call.
///
/// Closing (or dropping) the pool frees every node at once, whether or not
/// construction finished.
pub struct VariantPool {
    nodes: RefCell<Vec<Node>>,
}

impl VariantPool {
    pub fn open() -> Self {
        debug!("variant pool opened");
        Self {
            nodes: RefCell::new(Vec::new()),
        }
    }

    /// Allocate a fresh `Null` root in this pool.
    pub fn new_variant(&self) -> VariantRef<'_> {
        let index = self.alloc(Node::Null);
        VariantRef { pool: self, index }
    }

    /// Number of nodes allocated so far, including orphaned ones.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release the pool. Outstanding references make this a compile error.
    pub fn close(self) {}

    pub(crate) fn node(&self, index: usize) -> VariantRef<'_> {
        VariantRef { pool: self, index }
    }

    fn alloc(&self, node: Node) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        nodes.len() - 1
    }
}

impl Default for VariantPool {
    fn default() -> Self {
        Self::open()
    }
}

impl Drop for VariantPool {
    fn drop(&mut self) {
        debug!(nodes = self.nodes.get_mut().len(), "variant pool closed");
    }
}

impl Debug for VariantPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantPool")
            .field("nodes", &self.len())
            .finish()
    }
}

/// Borrowed handle to one node of a [`VariantPool`].
#[derive(Clone, Copy)]
pub struct VariantRef<'p> {
    pool: &'p VariantPool,
    index: usize,
}

impl<'p> VariantRef<'p> {
    pub fn kind(&self) -> VariantKind {
        self.pool.nodes.borrow()[self.index].kind()
    }

    pub fn is_null(&self) -> bool {
        self.kind() == VariantKind::Null
    }

    pub fn set_null(&self) -> OtamaResult<()> {
        self.assign(Node::Null)
    }

    pub fn set_int(&self, value: i64) -> OtamaResult<()> {
        self.assign(Node::Int(value))
    }

    pub fn set_float(&self, value: f64) -> OtamaResult<()> {
        self.assign(Node::Float(value))
    }

    pub fn set_string(&self, value: impl Into<String>) -> OtamaResult<()> {
        self.assign(Node::String(value.into()))
    }

    pub fn set_binary(&self, value: impl Into<Vec<u8>>) -> OtamaResult<()> {
        self.assign(Node::Binary(value.into()))
    }

    pub fn set_array(&self) -> OtamaResult<()> {
        self.assign(Node::Array(Vec::new()))
    }

    pub fn set_hash(&self) -> OtamaResult<()> {
        self.assign(Node::Hash(Vec::new()))
    }

    pub fn set_opaque(&self, handle: OpaqueHandle) -> OtamaResult<()> {
        self.assign(Node::Opaque(handle))
    }

    /// Element `index` of an array, growing the array with `Null` slots as needed.
    pub fn array_at(&self, index: usize) -> OtamaResult<VariantRef<'p>> {
        let mut nodes = self.pool.nodes.borrow_mut();
        let mut items = match mem::replace(&mut nodes[self.index], Node::Null) {
            Node::Array(items) => items,
            other => {
                let found = other.kind();
                nodes[self.index] = other;
                return Err(kind_mismatch(VariantKind::Array, found));
            }
        };
        while items.len() <= index {
            nodes.push(Node::Null);
            items.push(nodes.len() - 1);
        }
        let child = items[index];
        nodes[self.index] = Node::Array(items);
        Ok(self.at(child))
    }

    /// Append a `Null` slot to an array.
    pub fn array_push(&self) -> OtamaResult<VariantRef<'p>> {
        let len = self.array_len().unwrap_or(0);
        self.array_at(len)
    }

    /// Fresh `Null` slot bound to `key` in a hash.
    ///
    /// Rebinding an existing key keeps its position but replaces its value.
    pub fn hash_at(&self, key: &str) -> OtamaResult<VariantRef<'p>> {
        let mut nodes = self.pool.nodes.borrow_mut();
        let mut entries = match mem::replace(&mut nodes[self.index], Node::Null) {
            Node::Hash(entries) => entries,
            other => {
                let found = other.kind();
                nodes[self.index] = other;
                return Err(kind_mismatch(VariantKind::Hash, found));
            }
        };
        nodes.push(Node::Null);
        let child = nodes.len() - 1;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = child,
            None => entries.push((key.to_string(), child)),
        }
        nodes[self.index] = Node::Hash(entries);
        Ok(self.at(child))
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<Vec<u8>> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::Binary(b) => Some(b.clone()),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<OpaqueHandle> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::Opaque(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn array_len(&self) -> Option<usize> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::Array(items) => Some(items.len()),
            _ => None,
        }
    }

    pub fn array_get(&self, index: usize) -> Option<VariantRef<'p>> {
        let child = match &self.pool.nodes.borrow()[self.index] {
            Node::Array(items) => items.get(index).copied(),
            _ => None,
        };
        child.map(|child| self.at(child))
    }

    /// Array elements in index order. Empty for non-arrays.
    pub fn array_items(&self) -> Vec<VariantRef<'p>> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::Array(items) => items.iter().map(|child| self.at(*child)).collect(),
            _ => Vec::new(),
        }
    }

    /// Hash keys in stored order. Empty for non-hashes.
    pub fn hash_keys(&self) -> Vec<String> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::Hash(entries) => entries.iter().map(|(k, _)| k.clone()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn hash_get(&self, key: &str) -> Option<VariantRef<'p>> {
        let child = match &self.pool.nodes.borrow()[self.index] {
            Node::Hash(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, c)| *c),
            _ => None,
        };
        child.map(|child| self.at(child))
    }

    /// Hash entries in stored order. Empty for non-hashes.
    pub fn hash_entries(&self) -> Vec<(String, VariantRef<'p>)> {
        match &self.pool.nodes.borrow()[self.index] {
            Node::Hash(entries) => entries
                .iter()
                .map(|(k, child)| (k.clone(), self.at(*child)))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    fn at(&self, index: usize) -> VariantRef<'p> {
        VariantRef {
            pool: self.pool,
            index,
        }
    }

    fn assign(&self, node: Node) -> OtamaResult<()> {
        let mut nodes = self.pool.nodes.borrow_mut();
        let slot = &mut nodes[self.index];
        if !matches!(slot, Node::Null) {
            return Err(OtamaError::argument(format!(
                "variant already holds {}",
                slot.kind()
            )));
        }
        *slot = node;
        Ok(())
    }
}

impl Debug for VariantRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "VariantRef({}#{})", self.kind(), self.index)
    }
}

fn kind_mismatch(expected: VariantKind, found: VariantKind) -> OtamaError {
    OtamaError::argument(format!("expected {expected} variant, found {found}"))
}
