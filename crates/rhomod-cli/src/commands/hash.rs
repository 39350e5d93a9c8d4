use crate::support::{print_json_or_exit, read_text_or_exit};
use rhomod_registry::ContentHash;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashOutput {
    file: String,
    content_hash: ContentHash,
}

pub fn run(files: Vec<String>, json_output: bool) {
    let outputs: Vec<HashOutput> = files
        .into_iter()
        .map(|file| {
            let source = read_text_or_exit(&file);
            tracing::debug!(file = %file, bytes = source.len(), "hashing module source");
            HashOutput {
                content_hash: ContentHash::of_source(&source),
                file,
            }
        })
        .collect();

    if json_output {
        print_json_or_exit(&outputs, "hash");
        return;
    }

    for output in &outputs {
        println!("{}  {}", output.content_hash, output.file);
    }
}
