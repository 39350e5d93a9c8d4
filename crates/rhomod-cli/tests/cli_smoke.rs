use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const LIST_OPS: &str = "/**\n * ListOps -- list utilities\n */\nnew ListOps(`export:`) in {\n  contract ListOps(return) = { return!(Nil) }\n}\n";
const ABC_HASH: &str = "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45";

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "rhomod-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_rhomod<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_rhomod");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("rhomod command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn write_registry(path: &Path) {
    let line = format!(
        r#"{{"contentHash":"{ABC_HASH}","handle":{{"uri":"rho:id:abc","name":"Abc"}}}}"#
    );
    fs::write(path, format!("{line}\n")).expect("registry should be written");
}

#[test]
fn encode_json_reports_canonical_bytes() {
    let tmp = TempDirGuard::new("encode");
    let data = tmp.path().join("data.json");
    fs::write(&data, r#"{"x": "abc", "y": {"a": true}}"#).expect("data should be written");

    let output = run_rhomod([
        OsStr::new("encode"),
        data.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(
        payload["hex"],
        "0a0b0a0012072a051a036162630a0e0a00120a0a080a0012042a020801"
    );
    assert_eq!(payload["length"], 29);
    assert_eq!(payload["rholang"], r#"@"x"!("abc") | @"y"!(@"a"!(true))"#);
}

#[test]
fn encode_rejects_fractional_numbers() {
    let tmp = TempDirGuard::new("encode-float");
    let data = tmp.path().join("data.json");
    fs::write(&data, "[1, 2.5]").expect("data should be written");

    let output = run_rhomod([OsStr::new("encode"), data.as_os_str()]);
    assert_failure(&output);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("fractional number 2.5"));
}

#[test]
fn hash_prints_one_line_per_file() {
    let tmp = TempDirGuard::new("hash");
    let a = tmp.path().join("a.rho");
    let b = tmp.path().join("b.rho");
    fs::write(&a, "abc").expect("a should be written");
    fs::write(&b, "").expect("b should be written");

    let output = run_rhomod([OsStr::new("hash"), a.as_os_str(), b.as_os_str()]);
    assert_success(&output);
    let text = stdout_text(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(ABC_HASH));
    assert!(
        lines[1].starts_with("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
    );
}

#[test]
fn module_json_shows_loader_term() {
    let tmp = TempDirGuard::new("module");
    let file = tmp.path().join("list_ops.rho");
    fs::write(&file, LIST_OPS).expect("module should be written");

    let output = run_rhomod([
        OsStr::new("module"),
        file.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["name"], "ListOps");
    assert_eq!(payload["export"], "ListOps");
    assert_eq!(payload["payment"]["phloLimit"], 100000);
    let term = payload["term"].as_str().expect("term should be a string");
    assert!(term.contains("insertArbitrary!(bundle+{*ListOps}, *return)"));
}

#[test]
fn module_reports_syntax_errors() {
    let tmp = TempDirGuard::new("module-bad");
    let file = tmp.path().join("bad.rho");
    fs::write(&file, "/**\n * Broken\n */\nnew Broken in {\n Nil\n}\n")
        .expect("module should be written");

    let output = run_rhomod([OsStr::new("module"), file.as_os_str()]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("bad module syntax: no export:"));
}

#[test]
fn registry_list_and_lookup_read_the_jsonl_file() {
    let tmp = TempDirGuard::new("registry");
    let registry = tmp.path().join("registry.jsonl");
    write_registry(&registry);
    let module = tmp.path().join("abc.rho");
    fs::write(&module, "abc").expect("module should be written");

    let listed = run_rhomod([
        OsStr::new("registry"),
        OsStr::new("--registry"),
        registry.as_os_str(),
        OsStr::new("list"),
        OsStr::new("--json"),
    ]);
    assert_success(&listed);
    let entries = parse_json_stdout(&listed);
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
    assert_eq!(entries[0]["contentHash"], ABC_HASH);
    assert_eq!(entries[0]["uri"], "rho:id:abc");

    let found = run_rhomod([
        OsStr::new("registry"),
        OsStr::new("--registry"),
        registry.as_os_str(),
        OsStr::new("lookup"),
        module.as_os_str(),
    ]);
    assert_success(&found);
    assert_eq!(stdout_text(&found).trim(), "rho:id:abc");

    let other = tmp.path().join("other.rho");
    fs::write(&other, "something else").expect("module should be written");
    let missing = run_rhomod([
        OsStr::new("registry"),
        OsStr::new("--registry"),
        registry.as_os_str(),
        OsStr::new("lookup"),
        other.as_os_str(),
    ]);
    assert_failure(&missing);
    assert!(stderr_text(&missing).contains("is not registered"));
}

#[test]
fn verbose_flag_logs_registry_open_to_stderr() {
    let tmp = TempDirGuard::new("verbose");
    let registry = tmp.path().join("registry.jsonl");
    write_registry(&registry);

    let args = [
        OsStr::new("registry"),
        OsStr::new("--registry"),
        registry.as_os_str(),
        OsStr::new("list"),
    ];
    let quiet = run_rhomod(args);
    assert_success(&quiet);
    assert!(stderr_text(&quiet).is_empty());

    let verbose = run_rhomod([OsStr::new("--verbose")].into_iter().chain(args));
    assert_success(&verbose);
    assert!(stderr_text(&verbose).contains("registry opened"));
    assert_eq!(stdout_text(&verbose), stdout_text(&quiet));
}

#[test]
fn config_file_sets_registry_path() {
    let tmp = TempDirGuard::new("config");
    let registry = tmp.path().join("mods.jsonl");
    write_registry(&registry);
    let config = tmp.path().join("rhomod.toml");
    fs::write(
        &config,
        format!("[registry]\npath = {:?}\n", registry.display().to_string()),
    )
    .expect("config should be written");

    let output = run_rhomod([
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("registry"),
        OsStr::new("list"),
    ]);
    assert_success(&output);
    assert!(stdout_text(&output).contains("Entries: 1"));
    assert!(stdout_text(&output).contains("rho:id:abc (Abc)"));
}

#[test]
fn invalid_config_is_a_usage_error() {
    let tmp = TempDirGuard::new("config-bad");
    let config = tmp.path().join("rhomod.toml");
    fs::write(&config, "[registry\n").expect("config should be written");

    let output = run_rhomod([
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("registry"),
        OsStr::new("list"),
    ]);
    assert_failure(&output);
    assert_eq!(output.status.code(), Some(2));
}
