use crate::node::SrcPos;
use arch::inst::{Arg, TableError};
use color_print::cprintln;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Verification
    #[error("Unknown instruction: `{0}`")]
    UnknownInstruction(String),

    #[error("`{0}` takes {1} operand(s), got {2}")]
    ArityMismatch(String, usize, usize),

    #[error("`{0}`: operand {1} must be a {2}")]
    OperandKindMismatch(String, usize, Arg),

    // Pseudo expansion
    #[error("Unknown pseudo instruction: `{0}`")]
    UnknownPseudo(String),

    #[error("`{0}` takes {1} operand(s), got {2}")]
    PseudoArityMismatch(String, usize, usize),

    #[error("Pseudo instruction left after expansion: `{0}`")]
    UnexpandedPseudo(String),

    // Symbols
    #[error("Undefined label: `{0}`")]
    UndefinedLabel(String),

    #[error("Re-defined label: `{0}`")]
    AmbiguousSymbol(String),

    // Code generation
    #[error("Invalid register name: `{0}`")]
    InvalidRegisterName(String),

    #[error("Register `{0}` resolves to {1}, which does not fit a register slot")]
    RegisterOutOfRange(String, u64),

    #[error("`{0}`: operand {1} ({2}) cannot be encoded")]
    InvalidOperandKind(String, usize, String),

    #[error("`{0}`: immediate {1} does not fit 16 bits")]
    ImmediateOutOfRange(String, i64),

    #[error("Node has no address: `{0}`")]
    UnplacedNode(String),

    #[error("Address space exhausted at `{0}`")]
    AddressOverflow(String),

    // Front end
    #[error("Syntax Error: {0}")]
    Syntax(String),

    // Environment
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Failed to parse config: {0}")]
    Config(String, #[source] serde_yaml::Error),

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to read file: {0}")]
    FileRead(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),

    #[error("{source}")]
    At {
        pos: SrcPos,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach the position of the node the error was raised for, if known.
    pub fn at(self, pos: Option<&SrcPos>) -> Self {
        match pos {
            Some(pos) => Error::At {
                pos: pos.clone(),
                source: Box::new(self),
            },
            None => self,
        }
    }

    /// The error without position decoration.
    pub fn root(&self) -> &Error {
        match self {
            Error::At { source, .. } => source.root(),
            e => e,
        }
    }

    pub fn pos(&self) -> Option<&SrcPos> {
        match self {
            Error::At { pos, .. } => Some(pos),
            _ => None,
        }
    }

    /// Print error with diagnostic information showing file location and line content
    pub fn print_diag(&self, files: &IndexMap<String, Vec<String>>) {
        cprintln!("<red,bold>error</>: {}", self.root());

        let Some(pos) = self.pos() else {
            return;
        };

        // line is 0-based, display as 1-based
        let line_num = pos.line + 1;
        cprintln!("     <blue>--></> <underline>{}</>", pos);
        cprintln!("      <blue>|</>");

        let line_content = files
            .get(&pos.file)
            .and_then(|lines| lines.get(pos.line))
            .map(|s| s.as_str())
            .unwrap_or("");

        cprintln!(" <blue>{:>4} |</> {}", line_num, line_content);
        cprintln!("      <blue>|</>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> SrcPos {
        SrcPos {
            file: "main.s".to_string(),
            line: 2,
            offset: 20,
        }
    }

    #[test]
    fn at_wraps_only_with_position() {
        let e = Error::UndefinedLabel("x".into()).at(None);
        assert!(matches!(e, Error::UndefinedLabel(_)));

        let e = Error::UndefinedLabel("x".into()).at(Some(&pos()));
        assert_eq!(e.pos(), Some(&pos()));
        assert!(matches!(e.root(), Error::UndefinedLabel(name) if name == "x"));
        assert_eq!(e.to_string(), "Undefined label: `x`");
    }

    #[test]
    fn messages() {
        assert_eq!(
            Error::ArityMismatch("mov".into(), 2, 1).to_string(),
            "`mov` takes 2 operand(s), got 1"
        );
        assert_eq!(
            Error::OperandKindMismatch("jr".into(), 0, Arg::Reg).to_string(),
            "`jr`: operand 0 must be a register"
        );
    }
}
