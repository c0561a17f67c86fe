pub mod codegen;
pub mod compiler;
pub mod config;
pub mod dump;
pub mod error;
pub mod header;
pub mod layout;
pub mod location;
pub mod node;
pub mod parser;
pub mod pseudo;
pub mod section;
pub mod verify;

pub use compiler::{CompilationContext, Compiler, Image, Parse};
pub use config::Config;
pub use error::{Error, Result};
pub use node::{Data, Node, NodeKind, Operand, SrcPos};
pub use pseudo::{Expand, Pseudo};
