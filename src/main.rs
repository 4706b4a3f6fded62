use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Parser;

use myc::bytecode::disasm::{bc_stats, print_bc};
use myc::bytecode::{ProgramBc, image};
use myc::frontend::Lexer;
use myc::frontend::token_dumper::TokenDumper;
use myc::runtime::{VmBc, VmConfig};
use myc::session::Session;

/// Compiler and virtual machine for the my_c scripting language
#[derive(Parser, Debug)]
#[command(name = "myc", author, version, about)]
struct Cli {
    /// Source file (.myc) or compiled image (any other name, checked by magic)
    file: PathBuf,

    /// Show tokens only
    #[arg(long)]
    tokens: bool,

    /// Plain token dump without ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Print the syntax tree
    #[arg(long)]
    ast: bool,

    /// Print the symbol table
    #[arg(long)]
    symbols: bool,

    /// Print the numbered intermediate code
    #[arg(long)]
    ir: bool,

    /// Print the bytecode disassembly
    #[arg(long)]
    bc: bool,

    /// Print instruction and cell counts
    #[arg(long)]
    stats: bool,

    /// Write a bytecode image to PATH instead of running
    #[arg(long, value_name = "PATH")]
    emit: Option<PathBuf>,

    /// Stop after compiling
    #[arg(long)]
    no_run: bool,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.trace, cli.verbose) {
        (true, _) | (_, 2..) => "trace",
        (_, 1) => "debug",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let bytes = fs::read(&cli.file).with_context(|| format!("Reading {}", cli.file.display()))?;

    let program = if !has_extension(&cli.file, "myc") {
        if !image::is_image(&bytes) {
            bail!(
                "{} is neither a .myc source file nor a bytecode image",
                cli.file.display()
            );
        }
        image::decode(&bytes).with_context(|| format!("Loading {}", cli.file.display()))?
    } else {
        let source = String::from_utf8(bytes)
            .with_context(|| format!("Reading {}", cli.file.display()))?;

        if cli.tokens {
            dump_tokens(&source, cli.no_color)?;
            return Ok(ExitCode::SUCCESS);
        }

        match compile(cli, &source)? {
            Some(program) => program,
            None => return Ok(ExitCode::FAILURE),
        }
    };

    if cli.bc {
        print_bc(&program);
    }
    if cli.stats {
        print!("{}", bc_stats(&program));
    }

    if let Some(path) = &cli.emit {
        let bytes = image::encode(&program).context("Encoding bytecode image")?;
        fs::write(path, bytes).with_context(|| format!("Writing {}", path.display()))?;
        log::info!("wrote {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    if cli.no_run {
        return Ok(ExitCode::SUCCESS);
    }

    let config = VmConfig {
        trace: cli.trace,
        ..VmConfig::default()
    };
    // flush the dumps before the program starts writing
    std::io::stdout().flush().context("Flushing stdout")?;
    VmBc::with_config(config)
        .run_compiled(&program)
        .context("Running program")?;

    Ok(ExitCode::SUCCESS)
}

/// Returns `None` after reporting diagnostics.
fn compile(cli: &Cli, source: &str) -> anyhow::Result<Option<ProgramBc>> {
    let mut session = Session::parse(source)
        .with_context(|| format!("Lexing {}", cli.file.display()))?;

    if cli.ast {
        print!("{}", session.tree.display(session.root, &session.symbols));
    }

    if !session.diagnostics.is_empty() {
        for diagnostic in session.diagnostics.iter() {
            eprintln!("{}", diagnostic);
        }
        eprintln!("{}", session.diagnostics.summary());
        return Ok(None);
    }
    log::info!("{}", session.diagnostics.summary());

    let ir = session.generate()?;
    let program = session.compile_ir(&ir).context("Compiling to bytecode")?;

    // slots are only known after compiling
    if cli.symbols {
        print!("{}", session.symbols);
    }
    if cli.ir {
        print!("{}", ir.display(&session.symbols));
    }

    Ok(Some(program))
}

fn dump_tokens(source: &str, no_color: bool) -> anyhow::Result<()> {
    let tokens = Lexer::new(source).tokenize().context("Lexing source")?;

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    dumper.dump(&tokens);
    Ok(())
}
