use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tarn")]
#[command(about = "Tarn VM", long_about = None)]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program image
    Run {
        /// Path to the image (.trnb)
        path: String,
        /// Argument for the entry function: `42` is an Int, `42b` a Byte
        #[arg(long = "arg", value_name = "VALUE", allow_hyphen_values = true)]
        args: Vec<String>,
        /// TOML file with a [vm] table
        #[arg(long)]
        config: Option<String>,
        /// Override the maximum call depth
        #[arg(long)]
        max_call_depth: Option<usize>,
        /// Abort after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,
    },
    /// Print the function table and instruction listing
    Disassemble {
        /// Path to the image
        path: String,
    },
    /// Print the function table only
    Inspect {
        /// Path to the image
        path: String,
    },
}
