use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Operand kind accepted at one position of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    /// `r`: a register.
    Reg,
    /// `i`: an immediate or a label reference.
    Imm,
}

impl Arg {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(Arg::Reg),
            'i' => Some(Arg::Imm),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Arg::Reg => 'r',
            Arg::Imm => 'i',
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Reg => write!(f, "register"),
            Arg::Imm => write!(f, "immediate or label"),
        }
    }
}

/// Ordered operand template, written as a string of `r` and `i` (`"rri"`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template(Vec<Arg>);

impl Template {
    pub fn parse(s: &str) -> Result<Self, TableError> {
        s.chars()
            .map(|c| Arg::from_char(c).ok_or_else(|| TableError::InvalidTemplate(s.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Template)
    }

    pub fn args(&self) -> &[Arg] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn count(&self, kind: Arg) -> usize {
        self.0.iter().filter(|a| **a == kind).count()
    }
}

impl TryFrom<String> for Template {
    type Error = TableError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Template::parse(&s)
    }
}

impl From<Template> for String {
    fn from(t: Template) -> String {
        t.0.iter().map(|a| a.as_char()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstSpec {
    pub opcode: u8,
    #[serde(default)]
    pub args: Template,
    /// Label operands are encoded as a displacement from the next instruction.
    #[serde(default)]
    pub relative: bool,
    /// Label operands are encoded in words instead of bytes.
    #[serde(default)]
    pub scaled: bool,
}

impl InstSpec {
    pub fn new(opcode: u8, args: &str, relative: bool, scaled: bool) -> Result<Self, TableError> {
        Ok(InstSpec {
            opcode,
            args: Template::parse(args)?,
            relative,
            scaled,
        })
    }
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Invalid operand template: `{0}` (only `r` and `i` are allowed)")]
    InvalidTemplate(String),

    #[error("Instruction `{0}` takes more than 2 register operands")]
    TooManyRegisters(String),

    #[error("Instruction `{0}` takes more than 1 immediate operand")]
    TooManyImmediates(String),

    #[error("Opcode 0x{0:02X} is used by both `{1}` and `{2}`")]
    DuplicateOpcode(u8, String, String),

    #[error("Failed to read instruction table: {0}")]
    Io(String, #[source] std::io::Error),

    #[error("Failed to parse instruction table")]
    Yaml(#[from] serde_yaml::Error),
}

/// Mnemonic -> encoding spec.
///
/// Every spec is checked on construction: an opcode word has two register
/// slots and one immediate field, so a template with more of either could
/// never be encoded.
#[derive(Debug, Clone)]
pub struct InstTable(HashMap<String, InstSpec>);

#[rustfmt::skip]
const DEFAULT_SET: &[(&str, u8, &str, bool, bool)] = &[
    // name     opcode args   rel    scaled
    ("nop",     0x00,  "",    false, false),
    ("add",     0x01,  "rr",  false, false),
    ("addi",    0x02,  "ri",  false, false),
    ("sub",     0x03,  "rr",  false, false),
    ("subi",    0x04,  "ri",  false, false),
    ("mul",     0x05,  "rr",  false, false),
    ("div",     0x06,  "rr",  false, false),
    ("mod",     0x07,  "rr",  false, false),
    ("and",     0x08,  "rr",  false, false),
    ("andi",    0x09,  "ri",  false, false),
    ("or",      0x0A,  "rr",  false, false),
    ("ori",     0x0B,  "ri",  false, false),
    ("xor",     0x0C,  "rr",  false, false),
    ("xori",    0x0D,  "ri",  false, false),
    ("not",     0x0E,  "r",   false, false),
    ("shl",     0x0F,  "ri",  false, false),
    ("shr",     0x10,  "ri",  false, false),
    ("slt",     0x11,  "rr",  false, false),
    ("mov",     0x12,  "rr",  false, false),
    ("li",      0x13,  "ri",  false, false),
    ("la",      0x14,  "ri",  false, false),
    ("lw",      0x15,  "rri", false, false),
    ("sw",      0x16,  "rri", false, false),
    ("lb",      0x17,  "rri", false, false),
    ("sb",      0x18,  "rri", false, false),
    ("push",    0x19,  "r",   false, false),
    ("pop",     0x1A,  "r",   false, false),
    ("beq",     0x1B,  "rri", true,  true),
    ("bne",     0x1C,  "rri", true,  true),
    ("jmp",     0x1D,  "i",   true,  false),
    ("jr",      0x1E,  "r",   false, false),
    ("call",    0x1F,  "i",   false, false),
    ("ret",     0x20,  "",    false, false),
    ("syscall", 0x21,  "i",   false, false),
    ("halt",    0x22,  "",    false, false),
];

pub static DEFAULT_ISA: Lazy<InstTable> = Lazy::new(|| {
    let specs = DEFAULT_SET.iter().map(|&(name, opcode, args, rel, scaled)| {
        let spec = InstSpec::new(opcode, args, rel, scaled).expect("builtin template");
        (name.to_string(), spec)
    });
    InstTable::new(specs).expect("builtin instruction set")
});

impl InstTable {
    pub fn new<I>(specs: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (String, InstSpec)>,
    {
        let mut table = HashMap::new();
        let mut opcodes: HashMap<u8, String> = HashMap::new();
        for (name, spec) in specs {
            if spec.args.count(Arg::Reg) > 2 {
                return Err(TableError::TooManyRegisters(name));
            }
            if spec.args.count(Arg::Imm) > 1 {
                return Err(TableError::TooManyImmediates(name));
            }
            if let Some(prev) = opcodes.insert(spec.opcode, name.clone()) {
                if prev != name {
                    return Err(TableError::DuplicateOpcode(spec.opcode, prev, name));
                }
            }
            table.insert(name, spec);
        }
        Ok(InstTable(table))
    }

    /// Load a YAML map of `mnemonic: { opcode, args, relative, scaled }`.
    pub fn from_yaml(src: &str) -> Result<Self, TableError> {
        let specs: BTreeMap<String, InstSpec> = serde_yaml::from_str(src)?;
        InstTable::new(specs)
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| TableError::Io(path.display().to_string(), e))?;
        InstTable::from_yaml(&src)
    }

    pub fn get(&self, mnemonic: &str) -> Option<&InstSpec> {
        self.0.get(mnemonic)
    }

    /// Mnemonic of an opcode id, for listings.
    pub fn name_of(&self, opcode: u8) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, spec)| spec.opcode == opcode)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstSpec)> {
        self.0.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for InstTable {
    fn default() -> Self {
        DEFAULT_ISA.clone()
    }
}
