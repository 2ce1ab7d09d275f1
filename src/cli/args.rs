//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Self-verifying binary tree engine: build, verify, copy, render, and
/// round-trip trees through a parenthesized text format
#[derive(Parser, Debug)]
#[command(name = "treeguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-d, -dd, -ddd)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory for Graphviz dumps (overrides config)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a sample tree, dump it, write it out, and read it back
    Demo {
        /// Output directory for the serialized trees
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Read a serialized tree and verify its structure
    Verify {
        /// Serialized tree file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Re-derive cached counts instead of failing on a mismatch
        #[arg(long)]
        repair: bool,
    },

    /// Read a serialized tree and display it in the terminal
    Show {
        /// Serialized tree file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Read a serialized tree and render it with Graphviz
    Render {
        /// Serialized tree file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Read a serialized tree, deep-copy it, and write the copy
    Copy {
        /// Serialized tree file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Destination for the serialized copy
        #[arg(value_hint = ValueHint::FilePath)]
        out: PathBuf,
    },

    /// Split a file into tokens, sort them, and print them
    Sort {
        /// Input file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Compare tokens from end to start (rhyme order)
        #[arg(short, long)]
        reverse: bool,

        /// Token terminator character
        #[arg(short, long, default_value = "\n")]
        terminator: char,

        /// Print the raw text instead of sorted tokens
        #[arg(long)]
        raw: bool,
    },

    /// Show the effective configuration
    Config,

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
