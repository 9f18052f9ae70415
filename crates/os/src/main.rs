use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filesys::{Console, FileSystem, HostFileSystem, MemFileSystem};
use kernel::{ExitStatus, Kernel};
use tracing_subscriber::EnvFilter;
use types::Config;
use vm::MachineConfig;

mod demo;

/// Runs user programs on a simulated RV32IM machine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tracing filter such as `kernel=debug`; falls back to RUST_LOG
    #[arg(short, long, global = true)]
    debug: Option<String>,

    /// Physical memory size in pages
    #[arg(long, global = true, default_value_t = Config::DEFAULT_PHYS_PAGES)]
    phys_pages: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Boot an executable as the root process
    Run {
        /// Host directory the guest file system is rooted at
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Executable to boot, relative to the root directory
        program: String,

        /// Arguments after the program name
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Boot the built-in demo programs from an in-memory file system
    Demo {
        /// Write the demo executables to this directory instead of running them
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug.as_deref());

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // Guest output owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    let machine = MachineConfig {
        num_phys_pages: args.phys_pages,
    };
    match args.command {
        Command::Run { root, program, args } => {
            anyhow::ensure!(root.is_dir(), "root directory does not exist: {:?}", root);
            tracing::info!(target: "os", root = %root.display(), "using host file system");
            let fs = Arc::new(HostFileSystem::new(root));
            boot(machine, fs, &program, args)
        }
        Command::Demo { export: Some(dir) } => {
            fs::create_dir_all(&dir).with_context(|| format!("cannot create {:?}", dir))?;
            for (name, bytes) in demo::programs()? {
                let path = dir.join(name);
                fs::write(&path, bytes).with_context(|| format!("cannot write {:?}", path))?;
                println!("wrote {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Demo { export: None } => {
            let fs = Arc::new(MemFileSystem::new());
            for (name, bytes) in demo::programs()? {
                tracing::debug!(target: "os", program = name, bytes = bytes.len(), "installing demo program");
                fs.insert(name, bytes);
            }
            let code = boot(machine, Arc::clone(&fs) as Arc<dyn FileSystem>, demo::INIT, Vec::new())?;
            for name in fs.names() {
                if !name.ends_with(Config::EXECUTABLE_SUFFIX) {
                    let contents = fs.contents(&name).unwrap_or_default();
                    println!("[{}] {}", name, String::from_utf8_lossy(&contents).trim_end());
                }
            }
            Ok(code)
        }
    }
}

/// Boots `program` with `argv = [program, args...]` and turns its exit
/// status into the host exit code.
fn boot(machine: MachineConfig, fs: Arc<dyn FileSystem>, program: &str, args: Vec<String>) -> Result<ExitCode> {
    let kernel = Kernel::new(machine, fs, Console::stdio());
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(program.to_string());
    argv.extend(args);

    let status = kernel
        .run(program, &argv)
        .with_context(|| format!("cannot boot `{}`", program))?;
    eprintln!("{}: {}", program, status);
    Ok(match status {
        ExitStatus::Exited(code) => ExitCode::from(code as u8),
        ExitStatus::Killed(_) => ExitCode::FAILURE,
    })
}
