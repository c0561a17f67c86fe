use crate::node::{Node, NodeKind, BSS, DATA, TEXT};

/// Tag every node with its enclosing section. Nodes before the first section
/// directive belong to `.text`.
pub fn classify(mut nodes: Vec<Node>) -> Vec<Node> {
    let mut current = TEXT.to_string();
    for node in &mut nodes {
        if let NodeKind::Section(name) = &node.kind {
            current = name.clone();
        }
        node.section = current.clone();
    }
    nodes
}

/// `.text`, `.data`, custom sections by first appearance, `.bss` last.
pub fn section_order(nodes: &[Node]) -> Vec<String> {
    let mut sections = vec![TEXT.to_string(), DATA.to_string()];
    for node in nodes {
        if node.section == BSS {
            continue;
        }
        if !sections.contains(&node.section) {
            sections.push(node.section.clone());
        }
    }
    sections.push(BSS.to_string());
    sections
}

/// Stable partition of the sequence into canonical section order.
pub fn order(nodes: Vec<Node>) -> Vec<Node> {
    let sections = section_order(&nodes);
    let mut buckets: Vec<Vec<Node>> = vec![Vec::new(); sections.len()];
    for node in nodes {
        // every section is in the list by construction
        let idx = sections
            .iter()
            .position(|s| *s == node.section)
            .unwrap_or(sections.len() - 1);
        buckets[idx].push(node);
    }
    buckets.into_iter().flatten().collect()
}
