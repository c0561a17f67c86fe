use color_print::cprintln;
use std::path::PathBuf;
use vmasm::dump;
use vmasm::parser::Parser;
use vmasm::{Compiler, Config, Error, Pseudo};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {author}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input files, assembled as one program in the given order
    #[clap(default_value = "main.s")]
    input: Vec<String>,

    /// Output file [default: a.vmx]
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Config file (YAML)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Instruction table (YAML) replacing the builtin one
    #[clap(long)]
    isa: Option<PathBuf>,

    /// Stack bytes reserved by the loader
    #[clap(long)]
    stack_size: Option<u64>,

    /// Load address of the body
    #[clap(long)]
    base: Option<u32>,

    /// Dump the final layout
    #[clap(short, long)]
    dump: bool,
}

impl Args {
    fn config(&self) -> Result<Config, Error> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(isa) = &self.isa {
            config.isa = Some(isa.clone());
        }
        if let Some(stack_size) = self.stack_size {
            config.stack_size = stack_size;
        }
        if let Some(base) = self.base {
            config.base_address = base;
        }
        Ok(config)
    }
}

fn main() {
    use clap::Parser as _;

    let args: Args = Args::parse();
    println!("VM Assembler");

    let expander = Pseudo;
    let mut parser = Parser::new(&expander);

    let result = run(&args, &mut parser);
    if let Err(err) = result {
        err.print_diag(&parser.lines());
        std::process::exit(1);
    }
}

fn run(args: &Args, parser: &mut Parser) -> Result<(), Error> {
    let config = args.config()?;
    let compiler = Compiler::new(config)?;

    println!("1. Read Files and Parse Lines");
    for path in &args.input {
        println!("  < {}", path);
        parser.read(path)?;
    }

    println!("2. Expand, Layout & Generate Binary");
    let image = compiler.compile_from(parser, &Pseudo)?;

    let output = &compiler.config.output;
    println!("3. Write Image");
    println!("  > {}", output.display());
    image.write(output)?;

    cprintln!(
        "  <g>ok</>: {} bytes, entry 0x{:04X}, bss {} bytes",
        image.to_bytes().len(),
        image.header.entry_point,
        image.header.bss_size
    );

    if args.dump {
        for line in dump::listing(&image, &compiler.isa) {
            println!("{}", line);
        }
        println!("Labels");
        for line in dump::label_table(&image) {
            println!("{}", line);
        }
        println!("Header");
        for line in dump::header_summary(&image.header) {
            println!("{}", line);
        }
    }
    Ok(())
}
