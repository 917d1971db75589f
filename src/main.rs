use camino::Utf8PathBuf;
use owo_colors::OwoColorize;

use tapir::{Driver, LanguageVersion, Options};

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Accept the legacy language revision, resolving names without regard
    /// to declaration order.
    #[arg(long, global = true)]
    v1: bool,

    /// Report declarations that hide declarations of enclosing scopes.
    #[arg(long, global = true)]
    check_shadowing: bool,

    /// Suppress the named warnings everywhere, e.g. `--nowarn shadow`.
    #[arg(long, global = true)]
    nowarn: Vec<String>,

    /// The source file locations in the program tree refer to, for
    /// rendering diagnostics with context.
    #[arg(long, global = true)]
    source: Option<Utf8PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Cmd {
    /// Resolve every reference in a serialized program tree.
    Resolve { path: Utf8PathBuf },
    /// Print a serialized program tree in a readable form.
    Dump { path: Utf8PathBuf },
}

fn main() -> std::process::ExitCode {
    env_logger::init();

    let cli: Cli = clap::Parser::parse();
    let options = Options {
        version: if cli.v1 {
            LanguageVersion::V1
        } else {
            LanguageVersion::V1_6
        },
        check_shadowing: cli.check_shadowing,
        force_clone: false,
        nowarn: cli.nowarn,
    };

    let mut driver = Driver::new(options);
    if let Some(source) = &cli.source {
        match std::fs::read_to_string(source) {
            Ok(text) => {
                driver.context.sources.add(source.to_string(), text);
            }
            Err(error) => eprintln!("cannot read '{source}': {error}"),
        }
    }

    match cli.command {
        Cmd::Resolve { path } => {
            if let Some(root) = driver.load_program(&path) {
                if let Some(refs) = driver.resolve(&root) {
                    println!(
                        "{} {} references bound",
                        "ok:".bold().bright_green(),
                        refs.len()
                    );
                }
            }
        }
        Cmd::Dump { path } => {
            if let Some(root) = driver.load_program(&path) {
                print!("{}", tapir::ir::dump(&root));
            }
        }
    }

    let _ = driver.context.report.eprint(&driver.context.sources);
    if driver.had_errors() {
        std::process::ExitCode::FAILURE
    } else {
        std::process::ExitCode::SUCCESS
    }
}
