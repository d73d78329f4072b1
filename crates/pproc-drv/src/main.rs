//! pproc CLI - runs the preprocessor over one translation unit.
//!
//! Cooked tokens are printed to stdout in textual form, one space
//! between tokens and a newline wherever the stream carries an EOL
//! token. Diagnostics collected along the way are dumped to stderr
//! after the stream drains; any error- or fatal-level entry makes the
//! exit status non-zero.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pproc_pp::Preprocessor;
use pproc_util::ErrorList;

/// pproc - a C11 preprocessor
#[derive(Parser, Debug)]
#[command(name = "pproc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "C11 preprocessor: macro expansion and directive execution", long_about = None)]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Directory to add to the include search path (searched first;
    /// may be repeated)
    #[arg(short = 'I', value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, env = "PPROC_VERBOSE")]
    verbose: bool,

    /// Disable color output
    #[arg(long, env = "PPROC_NO_COLOR")]
    no_color: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.no_color)?;
    run(cli)
}

/// Initialize the logging system.
fn init_logging(verbose: bool, no_color: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    let layer = fmt::layer()
        .with_ansi(!no_color)
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let errlist = Rc::new(ErrorList::new());
    let mut pp = Preprocessor::new(Rc::clone(&errlist));

    for dir in cli.include_dirs {
        pp.add_include_dir(dir);
    }

    pp.open(&cli.input)
        .with_context(|| format!("cannot open input file '{}'", cli.input.display()))?;

    let mut out = String::new();
    let mut first_on_line = true;
    loop {
        let token = pp.next();
        if token.is_eof() {
            break;
        }
        if token.is_eol() {
            out.push('\n');
            first_on_line = true;
            continue;
        }
        if !first_on_line {
            out.push(' ');
        }
        out.push_str(&token.to_string());
        first_on_line = false;
    }
    println!("{}", out);

    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    errlist.dump(&mut handle)?;
    handle.flush()?;

    Ok(if errlist.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_input_and_include_dirs() {
        let cli = Cli::parse_from(["pproc", "-I", "/usr/local/include", "-I", ".", "main.c"]);
        assert_eq!(cli.input, PathBuf::from("main.c"));
        assert_eq!(
            cli.include_dirs,
            vec![PathBuf::from("/usr/local/include"), PathBuf::from(".")]
        );
        assert!(!cli.verbose);
    }

    #[test]
    fn cli_requires_input() {
        assert!(Cli::try_parse_from(["pproc"]).is_err());
    }

    #[test]
    fn cli_verbose_flag() {
        let cli = Cli::parse_from(["pproc", "--verbose", "main.c"]);
        assert!(cli.verbose);
    }
}
