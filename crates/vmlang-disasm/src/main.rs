use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use vmlang_disasm::{disassemble, load_raw_bin, render_text};
use vmlang_rs::operand::parse_address;
use vmlang_rs::{AsmConfig, InstructionSet, SymbolTable};

#[derive(Parser, Debug)]
#[command(author, version, about = "VMLANG object disassembler", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long)]
    debug: bool,
    /// JSON instruction-set table the object was assembled with
    #[arg(short, long = "instruction-set", value_name = "FILE", default_value = "instruction_set.json")]
    instruction_set: PathBuf,
    /// JSON assembler config, for custom register names
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Load address of the first byte
    #[arg(long, default_value = "0", value_parser = parse_address)]
    base: u32,
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Label map written by `vsam --symbols`
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Show instruction bytes (text format only)
    #[arg(long)]
    show_bytes: bool,
    /// Write output to file instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// Object file
    #[arg(value_name = "BINFILE")]
    input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let isa = InstructionSet::from_json(&read(&cli.instruction_set)?)
        .with_context(|| format!("loading {}", cli.instruction_set.display()))?;
    anyhow::ensure!(
        !isa.is_empty(),
        "{} defines no instructions",
        cli.instruction_set.display()
    );
    debug!(instructions = isa.len(), "loaded instruction set");
    let config = match &cli.config {
        Some(path) => AsmConfig::from_json(&read(path)?)?,
        None => AsmConfig::default(),
    };
    let regs = config.register_set()?;
    let symbols: Option<SymbolTable> = match &cli.labels {
        Some(path) => Some(serde_json::from_str(&read(path)?)?),
        None => None,
    };

    let img = load_raw_bin(&cli.input, cli.base, cli.skip, cli.len)?;
    let rows = disassemble(&img, &isa, &regs, symbols.as_ref())?;

    let buf = match cli.format {
        OutputFormat::Text => render_text(&rows, cli.show_bytes),
        OutputFormat::Json => serde_json::to_string_pretty(&rows)?,
    };
    if let Some(path) = cli.out {
        std::fs::write(&path, buf).with_context(|| format!("writing {}", path.display()))?;
    } else {
        print!("{buf}");
    }
    Ok(())
}
