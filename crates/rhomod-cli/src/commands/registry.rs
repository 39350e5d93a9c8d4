use crate::support::{block_on_or_exit, print_json_or_exit, read_text_or_exit};
use rhomod_registry::{ContentHash, JsonlFileStore, ModuleHandle, Registry, RegistryConfig};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryOutput {
    content_hash: ContentHash,
    #[serde(flatten)]
    handle: ModuleHandle,
}

fn open_or_exit(config: RegistryConfig) -> Registry<JsonlFileStore> {
    let path = config.path.display().to_string();
    let registry =
        block_on_or_exit(Registry::open(JsonlFileStore::new(config))).unwrap_or_else(|e| {
            eprintln!("error: failed to load {path}: {e}");
            std::process::exit(1);
        });
    tracing::debug!(path = %path, entries = registry.len(), "registry opened");
    registry
}

pub fn run_list(config: RegistryConfig, json_output: bool) {
    let registry = open_or_exit(config);
    let entries: Vec<EntryOutput> = registry
        .entries()
        .into_iter()
        .map(|(content_hash, handle)| EntryOutput {
            content_hash,
            handle,
        })
        .collect();

    if json_output {
        print_json_or_exit(&entries, "registry list");
        return;
    }

    println!("rhomod registry list");
    println!("  Entries: {}", entries.len());
    for entry in &entries {
        match &entry.handle.name {
            Some(name) => println!("  {} {} ({name})", entry.content_hash, entry.handle.uri),
            None => println!("  {} {}", entry.content_hash, entry.handle.uri),
        }
    }
}

pub fn run_lookup(config: RegistryConfig, file: String, json_output: bool) {
    let source = read_text_or_exit(&file);
    let content_hash = ContentHash::of_source(&source);
    tracing::debug!(file = %file, content_hash = %content_hash, "looking up module");
    let registry = open_or_exit(config);

    let Some(handle) = registry.lookup(&content_hash) else {
        eprintln!("error: {file} ({content_hash}) is not registered");
        std::process::exit(1);
    };

    if json_output {
        print_json_or_exit(
            &EntryOutput {
                content_hash,
                handle,
            },
            "registry lookup",
        );
        return;
    }

    println!("{}", handle.uri);
}
