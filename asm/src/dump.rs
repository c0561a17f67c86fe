use crate::compiler::Image;
use crate::node::NodeKind;
use arch::exe::{Header, WORD_SIZE};
use arch::inst::InstTable;
use arch::op::Opcode;
use color_print::cformat;

const RULE: usize = 53;

/// Listing of the final layout: one line per node, a rule at every section
/// change.
pub fn listing(image: &Image, isa: &InstTable) -> Vec<String> {
    let mut out = vec![];
    let mut section = None;
    let mut cursor = 0;

    for node in &image.nodes {
        if section != Some(&node.section) {
            section = Some(&node.section);
            out.push(format!(
                "{}+------[{}]{}",
                "-".repeat(19),
                node.section,
                "-".repeat(RULE.saturating_sub(node.section.len() + 8))
            ));
        }

        let addr = node
            .addr
            .map(|a| format!("{:04X}", a))
            .unwrap_or_else(|| "????".to_string());

        let bytes = match node.is_bss() {
            true => &[][..],
            false => {
                let size = node.size() as usize;
                let bin = image.body.get(cursor..cursor + size).unwrap_or(&[]);
                cursor += size;
                bin
            }
        };

        let line = match &node.kind {
            NodeKind::Inst { .. } => {
                let text = match <[u8; WORD_SIZE as usize]>::try_from(bytes) {
                    Ok(word) => {
                        let op = Opcode::from_bin(u32::from_le_bytes(word));
                        op.cformat(isa.name_of(op.cmd).unwrap_or("??"))
                    }
                    Err(_) => cformat!("<r,s>!! !! !! !!</>"),
                };
                format!("[{}] {} | {}  ; {}", addr, binprint(bytes), text, node)
            }
            NodeKind::Label(name) => {
                format!("[{}] {:12} | {}", addr, "", cformat!("<g>{}:</>", name))
            }
            NodeKind::Data { .. } => {
                format!("[{}] {} | {}", addr, binprint(bytes), cformat!("<c>{}</>", node))
            }
            NodeKind::Section(_) | NodeKind::Pseudo { .. } => {
                format!("[{}] {:12} | {}", addr, "", node)
            }
        };
        out.push(line);
    }
    out.push(format!("{}+{}", "-".repeat(19), "-".repeat(RULE)));
    out
}

pub fn label_table(image: &Image) -> Vec<String> {
    image
        .labels
        .iter()
        .map(|(name, addr)| cformat!("  <g>{:<16}</> 0x{:04X}", name, addr))
        .collect()
}

pub fn header_summary(header: &Header) -> Vec<String> {
    vec![
        format!("  magic       {}", String::from_utf8_lossy(&header.magic)),
        format!("  version     {}", header.version),
        format!("  entry_point 0x{:04X}", header.entry_point),
        format!("  stack_size  {}", header.stack_size),
        format!("  bss_size    {}", header.bss_size),
    ]
}

/// Up to four bytes in hex, `..` when there are more.
fn binprint(bytes: &[u8]) -> String {
    let mut s: Vec<String> = bytes.iter().take(4).map(|b| format!("{:02X}", b)).collect();
    if bytes.len() > 4 {
        s.push("..".to_string());
    }
    format!("{:12}", s.join(" "))
}
