use crate::error::{Error, Result};
use crate::node::{Node, NodeKind, SrcPos};
use indexmap::IndexMap;

/// Give every node the running address, starting at `base`.
///
/// `.bss` nodes advance the address like any other node even though they are
/// never written to the image. Fails if the running address leaves `i64`.
pub fn place(mut nodes: Vec<Node>, base: i64) -> Result<Vec<Node>> {
    let mut addr = base;
    for node in &mut nodes {
        node.addr = Some(addr);
        addr = node
            .try_size()
            .and_then(|size| addr.checked_add(size))
            .ok_or_else(|| Error::AddressOverflow(node.to_string()).at(node.pos.as_ref()))?;
    }
    Ok(nodes)
}

// ----------------------------------------------------------------------------
// Label table

// name -> (address, where it was defined)
#[derive(Debug, Clone, Default)]
pub struct Labels {
    labels: IndexMap<String, (i64, Option<SrcPos>)>,
}

impl Labels {
    pub fn new() -> Self {
        Labels {
            labels: IndexMap::new(),
        }
    }

    /// Record every label of a placed sequence. A name defined twice is an
    /// error rather than a silent override.
    pub fn collect(nodes: &[Node]) -> Result<Self> {
        let mut labels = Labels::new();
        for node in nodes {
            if let NodeKind::Label(name) = &node.kind {
                let addr = node
                    .addr
                    .ok_or_else(|| Error::UnplacedNode(node.to_string()).at(node.pos.as_ref()))?;
                labels.insert(name, addr, node.pos.clone())?;
            }
        }
        Ok(labels)
    }

    pub fn insert(&mut self, name: &str, addr: i64, pos: Option<SrcPos>) -> Result<()> {
        if self.labels.contains_key(name) {
            return Err(Error::AmbiguousSymbol(name.to_string()).at(pos.as_ref()));
        }
        self.labels.insert(name.to_string(), (addr, pos));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.labels.get(name).map(|(addr, _)| *addr)
    }

    /// Address of `name`, or `UndefinedLabel`.
    pub fn resolve(&self, name: &str) -> Result<i64> {
        self.get(name)
            .ok_or_else(|| Error::UndefinedLabel(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.labels.iter().map(|(name, (addr, _))| (name.as_str(), *addr))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
