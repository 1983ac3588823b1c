mod binder;
mod classfile;
mod classpath;
mod commands;
mod config;
mod declarations;
mod diagnostics;
mod error;
mod extractor;
mod grammar;
mod javadoc;
mod logging;
mod parser;
mod pom;
mod project;
mod repository;
mod resolver;
mod sink;
mod symbols;
mod tree;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::sink::Format;

#[derive(Parser)]
#[command(name = "refgraph", about = "Member-level reference graphs for Maven Java projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve dependencies and list source roots and artifacts
    Deps {
        /// Project root holding pom.xml
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Parse every source file and dump its resolved tree
    Tree {
        /// Project root holding pom.xml
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Extract member-to-member reference edges
    Scan {
        /// Project root holding pom.xml
        #[arg(default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    let result = match &cli.command {
        Commands::Deps { root } => commands::deps(root, cli.format),
        Commands::Tree { root } => commands::tree(root, cli.format),
        Commands::Scan { root } => commands::scan(root, cli.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    }
}
