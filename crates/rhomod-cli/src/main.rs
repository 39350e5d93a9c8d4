//! rhomod CLI: the `rhomod` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands, RegistryCommands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing(cli.verbose);
    let config = support::load_config_or_exit(cli.config.as_deref());

    match cli.command {
        Commands::Encode { datafile, json } => commands::encode::run(datafile, json),

        Commands::Hash { files, json } => commands::hash::run(files, json),

        Commands::Module { file, json } => commands::module::run(file, &config.loader, json),

        Commands::Registry { registry, command } => {
            let registry_config = config.registry_with_override(registry);
            match command {
                RegistryCommands::List { json } => {
                    commands::registry::run_list(registry_config, json)
                }
                RegistryCommands::Lookup { file, json } => {
                    commands::registry::run_lookup(registry_config, file, json)
                }
            }
        }
    }
}
