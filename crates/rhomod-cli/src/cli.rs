use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rhomod",
    about = "rhomod: canonical Rholang terms and a content-addressed module registry",
    version
)]
pub struct Cli {
    /// TOML configuration file (registry and loader sections)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert JSON data to its canonical Rholang term and bytes
    Encode {
        /// JSON data file
        datafile: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the content hash of module source files
    Hash {
        /// Module source files
        #[arg(required = true)]
        files: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a module and show the deploy it would produce
    Module {
        /// Module source file
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the module registry
    Registry {
        /// Registry JSONL file (overrides config)
        #[arg(long)]
        registry: Option<String>,

        #[command(subcommand)]
        command: RegistryCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum RegistryCommands {
    /// List every registered module
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up the handle registered for a module source file
    Lookup {
        /// Module source file
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
