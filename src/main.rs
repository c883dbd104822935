//! `jayc`: the command-line entry point (§6.1).
//!
//! Mirrors the original `main()`'s argument handling (`-e`, a bare file
//! argument, and the `init`/`start`/`test`/`run` project verbs scanned out
//! of `jeem.json`) as a `clap` derive CLI instead of hand-rolled `argv`
//! parsing.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use jay::manifest::Manifest;
use jay::{run_source, JayError};

#[derive(Parser)]
#[command(name = "jayc", version, about = "Run jay scripts", disable_version_flag = true)]
struct Cli {
    /// Print the version and exit.
    #[arg(short = 'v', long = "version")]
    print_version: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Script file to run, when no subcommand is given.
    file: Option<PathBuf>,

    /// Evaluate a snippet of source directly instead of reading a file.
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Extra arguments forwarded to the script as `ARGS`.
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Scaffold a new project directory with a `jay.json` manifest.
    Init { name: Option<String> },
    /// Run the manifest's `start` script.
    Start,
    /// Run the manifest's `test` script.
    Test,
    /// Run an arbitrary manifest script by name.
    Run { name: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_version {
        println!("jayc {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let result = match &cli.command {
        Some(Command::Init { name }) => run_init(name.clone()),
        Some(Command::Start) => run_manifest_script("start"),
        Some(Command::Test) => run_manifest_script("test"),
        Some(Command::Run { name }) => run_manifest_script(name),
        None => run_direct(&cli),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_direct(cli: &Cli) -> Result<(), JayError> {
    if let Some(src) = &cli.eval {
        return run_source(src, "<eval>", cli.args.clone());
    }
    let file = cli.file.clone().unwrap_or_else(|| PathBuf::from("main.jay"));
    let source = std::fs::read_to_string(&file).map_err(|e| {
        JayError::new(file.display().to_string(), 0, jay::ErrorKind::Other(format!("cannot read file: {e}")))
    })?;
    run_source(&source, file.display().to_string(), cli.args.clone())
}

fn run_init(name: Option<String>) -> Result<(), JayError> {
    let cwd = std::env::current_dir().expect("current directory is accessible");
    let project_name = name.clone().unwrap_or_else(|| {
        cwd.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "jay-project".to_string())
    });
    let dir = match &name {
        Some(n) => cwd.join(n),
        None => cwd,
    };
    Manifest::init(&dir, &project_name)?;
    println!("initialized jay project '{project_name}' in {}", dir.display());
    Ok(())
}

fn run_manifest_script(script_name: &str) -> Result<(), JayError> {
    let cwd = std::env::current_dir().expect("current directory is accessible");
    let manifest = Manifest::load(&cwd)?;
    let script = manifest.script(script_name).ok_or_else(|| {
        JayError::new(
            jay::manifest::MANIFEST_FILE.to_string(),
            0,
            jay::ErrorKind::Other(format!("no '{script_name}' script in manifest")),
        )
    })?;
    let path = cwd.join(script);
    let source = std::fs::read_to_string(&path)
        .map_err(|e| JayError::new(path.display().to_string(), 0, jay::ErrorKind::Other(format!("cannot read file: {e}"))))?;
    run_source(&source, path.display().to_string(), Vec::new())
}
