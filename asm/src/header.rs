use crate::config::Config;
use crate::error::Result;
use crate::layout::Labels;
use crate::node::Node;
use arch::exe::{Header, MAGIC};

pub const ENTRY: &str = "main";

/// Bytes the loader reserves for `.bss`.
pub fn bss_size(nodes: &[Node]) -> u64 {
    nodes
        .iter()
        .filter(|n| n.is_bss())
        .map(|n| n.size() as u64)
        .sum()
}

pub fn build(labels: &Labels, nodes: &[Node], config: &Config) -> Result<Header> {
    let entry = labels.resolve(ENTRY)?;
    Ok(Header {
        magic: MAGIC,
        version: config.version,
        entry_point: entry as u64,
        stack_size: config.stack_size,
        bss_size: bss_size(nodes),
    })
}
