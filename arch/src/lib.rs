pub mod exe;
pub mod inst;
pub mod op;
pub mod reg;
