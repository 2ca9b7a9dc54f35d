use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "swe1r-patcher")]
#[command(about = "Patcher for Star Wars Episode I Racer")]
#[command(version)]
struct Args {
    /// Log every cave and mapping
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Patch an executable on disk
    Patch {
        /// Path to swep1rcr.exe
        exe: PathBuf,

        #[arg(short, long, default_value = "patcher.toml")]
        config: PathBuf,

        /// Build offset table (JSON), built-in table if omitted
        #[arg(short, long)]
        builds: Option<PathBuf>,

        /// Write a JSON report of the run
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Start the game suspended and patch it in memory (Windows only)
    Launch {
        #[arg(short, long, default_value = "swep1rcr.exe")]
        exe: PathBuf,

        #[arg(short, long, default_value = "patcher.toml")]
        config: PathBuf,

        #[arg(short, long)]
        builds: Option<PathBuf>,

        /// Arguments passed to the game
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Show headers, sections and build of an executable
    Info {
        exe: PathBuf,

        #[arg(short, long)]
        builds: Option<PathBuf>,
    },
    /// Dump bytes of an executable at a virtual address
    Hexdump {
        exe: PathBuf,

        /// Virtual address (hex, with or without 0x)
        address: String,

        #[arg(short, long, default_value = "256")]
        size: usize,

        /// Show the ASCII column
        #[arg(short, long)]
        ascii: bool,
    },
    /// Print or save the built-in build table
    Builds {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "swe1r=debug" } else { "swe1r=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.parse()?))
        .init();

    match args.command {
        Command::Patch {
            exe,
            config,
            builds,
            report,
        } => commands::patch::run(&exe, &config, builds.as_deref(), report.as_deref()),
        Command::Launch {
            exe,
            config,
            builds,
            args,
        } => commands::launch::run(&exe, &config, builds.as_deref(), &args),
        Command::Info { exe, builds } => commands::info::run(&exe, builds.as_deref()),
        Command::Hexdump {
            exe,
            address,
            size,
            ascii,
        } => commands::hexdump::run(&exe, &address, size, ascii),
        Command::Builds { output } => commands::builds::run(output.as_deref()),
    }
}
