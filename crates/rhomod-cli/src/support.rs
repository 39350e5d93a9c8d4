use rhomod_ledger::LoaderConfig;
use rhomod_registry::RegistryConfig;
use serde::Deserialize;
use std::fs;
use std::future::Future;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Contents of the `--config` TOML file. Missing sections take defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub registry: RegistryConfig,
    pub loader: LoaderConfig,
}

impl CliConfig {
    pub fn registry_with_override(&self, path: Option<String>) -> RegistryConfig {
        match path {
            Some(path) => RegistryConfig {
                path: path.into(),
                ..self.registry.clone()
            },
            None => self.registry.clone(),
        }
    }
}

pub fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}

pub fn load_config_or_exit(path: Option<&str>) -> CliConfig {
    let Some(path) = path else {
        return CliConfig::default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read config {path}: {e}");
        std::process::exit(2);
    });
    toml::from_str(&text).unwrap_or_else(|e| {
        eprintln!("error: invalid config {path}: {e}");
        std::process::exit(2);
    })
}

pub fn read_text_or_exit(path: &str) -> String {
    fs::read_to_string(Path::new(path)).unwrap_or_else(|e| {
        eprintln!("error: failed to read {path}: {e}");
        std::process::exit(1);
    })
}

pub fn print_json_or_exit<T: serde::Serialize>(value: &T, what: &str) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("error: failed to render {what} output: {e}");
        std::process::exit(1);
    });
    println!("{rendered}");
}

pub fn block_on_or_exit<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(1);
        });
    runtime.block_on(future)
}
