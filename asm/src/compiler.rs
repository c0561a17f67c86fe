use crate::codegen::Codegen;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::header;
use crate::layout::{self, Labels};
use crate::node::Node;
use crate::pseudo::{self, Expand};
use crate::section;
use crate::verify::verify;
use arch::exe::Header;
use arch::inst::InstTable;
use arch::reg::RegTable;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Front end: produces the node sequence of one program.
pub trait Parse {
    fn parse(&mut self) -> Result<Vec<Node>>;
}

// ----------------------------------------------------------------------------
// Output image

#[derive(Debug, Clone)]
pub struct Image {
    pub header: Header,
    pub body: Vec<u8>,
    pub labels: Labels,
    /// Final ordered and placed sequence, kept for listings.
    pub nodes: Vec<Node>,
}

impl Image {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bin = self.header.to_bytes().to_vec();
        bin.extend_from_slice(&self.body);
        bin
    }

    /// Write to `<path>.tmp` and rename over `path`, so a failed write never
    /// leaves a truncated image behind.
    pub fn write(&self, path: &Path) -> Result<()> {
        let name = path.display().to_string();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let res = std::fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(&self.to_bytes())?;
                file.sync_all()
            })
            .and_then(|_| std::fs::rename(&tmp, path));
        if let Err(e) = res {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::FileWrite(name, e));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Pipeline

/// Tables and settings shared by every compilation.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    pub isa: InstTable,
    pub regs: RegTable,
    pub config: Config,
}

impl Compiler {
    /// Builtin tables, or the instruction table named by `config.isa`.
    pub fn new(config: Config) -> Result<Self> {
        let isa = match &config.isa {
            Some(path) => InstTable::load(path)?,
            None => InstTable::default(),
        };
        Ok(Compiler {
            isa,
            regs: RegTable::default(),
            config,
        })
    }

    pub fn with_tables(config: Config, isa: InstTable, regs: RegTable) -> Self {
        Compiler { isa, regs, config }
    }

    pub fn compile(&self, nodes: Vec<Node>, expander: &dyn Expand) -> Result<Image> {
        CompilationContext::new(self, nodes).run(expander)
    }

    pub fn compile_from(&self, parser: &mut dyn Parse, expander: &dyn Expand) -> Result<Image> {
        let nodes = parser.parse()?;
        self.compile(nodes, expander)
    }
}

/// State of one compilation. Built when it starts, consumed when it ends.
pub struct CompilationContext<'a> {
    compiler: &'a Compiler,
    nodes: Vec<Node>,
}

impl<'a> CompilationContext<'a> {
    pub fn new(compiler: &'a Compiler, nodes: Vec<Node>) -> Self {
        CompilationContext { compiler, nodes }
    }

    pub fn run(self, expander: &dyn Expand) -> Result<Image> {
        let Compiler { isa, regs, config } = self.compiler;

        verify(&self.nodes, isa)?;
        let nodes = pseudo::unwind(self.nodes, expander)?;
        verify(&nodes, isa)?;

        let nodes = section::classify(nodes);
        let nodes = section::order(nodes);
        let nodes = layout::place(nodes, config.base_address as i64)?;
        let labels = Labels::collect(&nodes)?;

        let header = header::build(&labels, &nodes, config)?;
        let body = Codegen::new(isa, regs, &labels).emit(&nodes)?;

        Ok(Image {
            header,
            body,
            labels,
            nodes,
        })
    }
}
