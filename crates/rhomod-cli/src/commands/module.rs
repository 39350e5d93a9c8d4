use crate::support::{print_json_or_exit, read_text_or_exit};
use rhomod_ledger::{DeployerId, LoaderConfig, PaymentInfo, parse_module};
use rhomod_registry::ContentHash;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleOutput {
    name: String,
    title: String,
    export: String,
    content_hash: ContentHash,
    deployer: String,
    payment: PaymentInfo,
    term: String,
}

pub fn run(file: String, loader: &LoaderConfig, json_output: bool) {
    let source = read_text_or_exit(&file);
    let module = parse_module(&source).unwrap_or_else(|e| {
        eprintln!("error: {file}: {e}");
        std::process::exit(1);
    });
    tracing::debug!(file = %file, name = %module.name, "parsed module");
    let deployer = DeployerId::from_hex(&loader.deployer).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(2);
    });

    let output = ModuleOutput {
        name: module.name,
        title: module.title,
        export: module.export,
        content_hash: ContentHash::of_source(&source),
        deployer: deployer.to_hex(),
        payment: loader.payment.clone(),
        term: module.term,
    };

    if json_output {
        print_json_or_exit(&output, "module");
        return;
    }

    println!("rhomod module");
    println!("  Name: {}", output.name);
    println!("  Title: {}", output.title);
    println!("  Export: {}", output.export);
    println!("  Content hash: {}", output.content_hash);
    println!("  Deployer: {}", output.deployer);
    println!(
        "  Phlo: price {} limit {}",
        output.payment.phlo_price, output.payment.phlo_limit
    );
    println!();
    print!("{}", output.term);
}
