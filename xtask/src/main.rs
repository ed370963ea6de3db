use anyhow::{
    Context,
    Result,
    ensure,
};
use clap::{
    Parser,
    Subcommand,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    process::Command,
};

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Cheddar Maze helper tasks (fmt, clippy, tests)",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check formatting for the whole workspace
    Fmt {
        /// Rewrite files instead of only checking them
        #[arg(long)]
        fix: bool,
    },
    /// Run clippy for the entire workspace with warnings-as-errors
    Clippy,
    /// Run the test suites (unit tests plus the fake-backend integration tests)
    Test {
        /// Only run the integration-tests crate
        #[arg(long)]
        integration_only: bool,
    },
    /// Formatting check, clippy and tests, in that order
    Ci,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = repo_root()?;

    match cli.command {
        Commands::Fmt { fix } => run_fmt(&root, fix)?,
        Commands::Clippy => run_clippy(&root)?,
        Commands::Test { integration_only } => run_tests(&root, integration_only)?,
        Commands::Ci => {
            run_fmt(&root, false)?;
            run_clippy(&root)?;
            run_tests(&root, false)?;
        }
    }

    Ok(())
}

fn repo_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask has no parent directory")
}

fn run_fmt(root: &Path, fix: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("fmt").arg("--all").current_dir(root);
    if !fix {
        cmd.arg("--").arg("--check");
    }
    run_command(cmd, "cargo fmt")
}

fn run_clippy(root: &Path) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("clippy")
        .arg("--workspace")
        .arg("--all-targets")
        .arg("--all-features")
        .arg("--")
        .arg("-D")
        .arg("warnings")
        .current_dir(root);
    run_command(cmd, "cargo clippy")
}

fn run_tests(root: &Path, integration_only: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("test").current_dir(root);
    if integration_only {
        cmd.arg("-p").arg("integration-tests");
    } else {
        cmd.arg("--workspace").arg("--features").arg("cheddar-maze/test-helpers");
    }
    let label = if integration_only {
        "cargo test -p integration-tests"
    } else {
        "cargo test --workspace"
    };
    run_command(cmd, label)
}

fn run_command(mut cmd: Command, label: &str) -> Result<()> {
    println!("Running: {}", label);
    let status = cmd
        .status()
        .with_context(|| format!("failed to run {label}"))?;
    ensure!(status.success(), "{label} failed with status {status}");
    Ok(())
}
