use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vmlang_rs::operand::parse_address;
use vmlang_rs::{AsmConfig, Assembler, InstructionSet};

#[derive(Parser, Debug)]
#[command(author, version, about = "Two-pass assembler for VMLANG")]
struct Opts {
    /// Log debug output (labels, directives, every encoding)
    #[arg(short, long)]
    debug: bool,
    /// Object file to write (default: SOURCE with a .o extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// JSON instruction-set table
    #[arg(short, long = "instruction-set", value_name = "FILE", default_value = "instruction_set.json")]
    instruction_set: PathBuf,
    /// JSON assembler config (comment character, register names, origin)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Address of the first instruction (overrides the config)
    #[arg(long, value_parser = parse_address)]
    origin: Option<u32>,
    /// Print an address/bytes/source listing to stdout
    #[arg(long)]
    listing: bool,
    /// Write the label map as JSON
    #[arg(long, value_name = "FILE")]
    symbols: Option<PathBuf>,
    /// Assembly source (.s)
    #[arg(value_name = "SOURCE")]
    source: PathBuf,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let default_level = if opts.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let table = fs::read_to_string(&opts.instruction_set)
        .with_context(|| format!("reading {}", opts.instruction_set.display()))?;
    let isa = InstructionSet::from_json(&table)
        .with_context(|| format!("loading {}", opts.instruction_set.display()))?;
    anyhow::ensure!(
        !isa.is_empty(),
        "{} defines no instructions",
        opts.instruction_set.display()
    );
    debug!(instructions = isa.len(), "loaded instruction set");

    let mut config = match &opts.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            AsmConfig::from_json(&text).with_context(|| format!("loading {}", path.display()))?
        }
        None => AsmConfig::default(),
    };
    if let Some(origin) = opts.origin {
        config.origin = origin;
    }

    let source = fs::read_to_string(&opts.source)
        .with_context(|| format!("reading {}", opts.source.display()))?;
    let program = Assembler::from_config(&isa, &config)?
        .assemble(&source)
        .with_context(|| format!("assembling {}", opts.source.display()))?;

    if opts.listing {
        print!("{}", program.listing(&source));
    }
    if let Some(path) = &opts.symbols {
        let json = serde_json::to_string_pretty(&program.symbols)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| opts.source.with_extension("o"));
    let bytes = program.bytes();
    fs::write(&output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    info!(output = %output.display(), bytes = bytes.len(), "wrote object file");
    Ok(())
}
