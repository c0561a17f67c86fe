use arch::exe::WORD_SIZE;
use std::fmt;

pub const TEXT: &str = ".text";
pub const DATA: &str = ".data";
pub const BSS: &str = ".bss";

// ----------------------------------------------------------------------------
// Operand

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(String),
    Imm(i64),
    Label(String),
    /// String literal. The front end accepts it anywhere, but no instruction
    /// can encode it.
    Str(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(name) => write!(f, "${}", name),
            Operand::Imm(v) => write!(f, "{}", v),
            Operand::Label(name) => write!(f, "{}", name),
            Operand::Str(s) => write!(f, "{:?}", s),
        }
    }
}

// ----------------------------------------------------------------------------
// Raw data

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    Int(i64),
    Bytes(Vec<u8>),
    /// Address of a label, known only once labels are collected.
    Label(String),
}

impl Data {
    /// Exactly `width` bytes, little-endian. Integers are truncated or
    /// sign-extended, byte strings truncated or zero-padded. A label encodes
    /// as zeros; the code generator writes its address instead.
    pub fn encode(&self, width: usize) -> Vec<u8> {
        match self {
            Data::Int(v) => {
                let fill = if *v < 0 { 0xFF } else { 0x00 };
                let mut bin = v.to_le_bytes().to_vec();
                bin.resize(width.max(bin.len()), fill);
                bin.truncate(width);
                bin
            }
            Data::Bytes(bytes) => {
                let mut bin = bytes.clone();
                bin.resize(width, 0);
                bin
            }
            Data::Label(_) => vec![0; width],
        }
    }
}

// ----------------------------------------------------------------------------
// Source position

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcPos {
    pub file: String,
    /// 0-based line index.
    pub line: usize,
    /// Byte offset of the line start in the concatenated input.
    pub offset: usize,
}

impl fmt::Display for SrcPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line + 1)
    }
}

// ----------------------------------------------------------------------------
// Node

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Inst {
        mnemonic: String,
        operands: Vec<Operand>,
    },
    Pseudo {
        mnemonic: String,
        operands: Vec<Operand>,
    },
    Label(String),
    Section(String),
    Data {
        data: Data,
        width: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Enclosing section, set by the classifier.
    pub section: String,
    /// Load address, set by the address pass.
    pub addr: Option<i64>,
    pub pos: Option<SrcPos>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            section: TEXT.to_string(),
            addr: None,
            pos: None,
        }
    }

    pub fn inst(mnemonic: &str, operands: Vec<Operand>) -> Self {
        Node::new(NodeKind::Inst {
            mnemonic: mnemonic.to_string(),
            operands,
        })
    }

    pub fn pseudo(mnemonic: &str, operands: Vec<Operand>) -> Self {
        Node::new(NodeKind::Pseudo {
            mnemonic: mnemonic.to_string(),
            operands,
        })
    }

    pub fn label(name: &str) -> Self {
        Node::new(NodeKind::Label(name.to_string()))
    }

    pub fn section(name: &str) -> Self {
        Node::new(NodeKind::Section(name.to_string()))
    }

    pub fn data(data: Data, width: usize) -> Self {
        Node::new(NodeKind::Data { data, width })
    }

    /// `width` zero bytes.
    pub fn space(width: usize) -> Self {
        Node::data(Data::Int(0), width)
    }

    pub fn at(mut self, pos: Option<SrcPos>) -> Self {
        self.pos = pos;
        self
    }

    /// Size in bytes once laid out, `None` if it does not fit an address.
    pub fn try_size(&self) -> Option<i64> {
        match &self.kind {
            NodeKind::Inst { .. } | NodeKind::Pseudo { .. } => Some(WORD_SIZE),
            NodeKind::Label(_) | NodeKind::Section(_) => Some(0),
            NodeKind::Data { width, .. } => i64::try_from(*width).ok(),
        }
    }

    /// Size in bytes once laid out. Saturates where [`Node::try_size`] fails.
    pub fn size(&self) -> i64 {
        self.try_size().unwrap_or(i64::MAX)
    }

    pub fn is_bss(&self) -> bool {
        self.section == BSS
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops = |ops: &[Operand]| {
            ops.iter()
                .map(|o| o.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match &self.kind {
            NodeKind::Inst { mnemonic, operands } | NodeKind::Pseudo { mnemonic, operands } => {
                match operands.is_empty() {
                    true => write!(f, "{}", mnemonic),
                    false => write!(f, "{} {}", mnemonic, ops(operands)),
                }
            }
            NodeKind::Label(name) => write!(f, "{}:", name),
            NodeKind::Section(name) => write!(f, ".section {}", name),
            NodeKind::Data { data, width } => match data {
                Data::Int(v) => write!(f, "data[{}] {}", width, v),
                Data::Bytes(b) => write!(f, "data[{}] {:?}", width, String::from_utf8_lossy(b)),
                Data::Label(name) => write!(f, "data[{}] &{}", width, name),
            },
        }
    }
}
