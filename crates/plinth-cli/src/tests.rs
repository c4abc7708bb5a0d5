//! Unit tests for the CLI runtime, driven through [`run`] with captured
//! streams.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rstest::{fixture, rstest};
use serde_json::Value;
use tempfile::TempDir;

use super::*;

struct Workspace {
    dir: TempDir,
}

#[fixture]
fn workspace() -> Workspace {
    Workspace {
        dir: TempDir::new().expect("create temp dir"),
    }
}

impl Workspace {
    fn plugin_root(&self) -> PathBuf {
        self.dir.path().join("plugins")
    }

    fn registry(&self) -> PathBuf {
        self.dir.path().join("registry.json")
    }

    /// Writes a minimal installable package zip and returns its path.
    fn write_package(&self, name: &str, code: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{name}.zip"));
        let file = std::fs::File::create(&path).expect("create package file");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        writer
            .start_file("plugin.json", options)
            .expect("start metadata entry");
        writer
            .write_all(serde_json::json!({"name": name}).to_string().as_bytes())
            .expect("write metadata");
        writer
            .start_file("main.lua", options)
            .expect("start code entry");
        writer.write_all(code.as_bytes()).expect("write code");
        writer.finish().expect("finish archive");
        path
    }

    /// Runs one CLI command against this workspace, capturing both streams.
    fn invoke(&self, args: &[&str]) -> (ExitCode, String, String) {
        let root = self.plugin_root();
        let registry = self.registry();
        let mut full: Vec<String> = vec![
            "plinth".to_owned(),
            "--plugin-root".to_owned(),
            root.display().to_string(),
            "--registry".to_owned(),
            registry.display().to_string(),
        ];
        full.extend(args.iter().map(|arg| (*arg).to_owned()));
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(full, &mut out, &mut err);
        (
            code,
            String::from_utf8(out).expect("stdout is UTF-8"),
            String::from_utf8(err).expect("stderr is UTF-8"),
        )
    }

    fn install(&self, package: &Path) -> String {
        let (code, out, err) = self.invoke(&["install", &package.display().to_string()]);
        assert_eq!(code, ExitCode::SUCCESS, "install failed: {err}");
        let record: Value = serde_json::from_str(&out).expect("record JSON");
        record["id"].as_str().expect("record id").to_owned()
    }
}

const ECHO_PLUGIN: &str = r#"
function run(input)
    return { status = "success", echo = input.word }
end
"#;

#[rstest]
fn help_prints_usage_and_succeeds(workspace: Workspace) {
    let (code, out, _err) = workspace.invoke(&["--help"]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(out.contains("Plugin lifecycle and execution host"));
}

#[rstest]
fn unknown_subcommand_is_a_usage_error(workspace: Workspace) {
    let (code, out, err) = workspace.invoke(&["frobnicate"]);
    assert_eq!(code, ExitCode::from(2));
    assert!(out.is_empty());
    assert!(err.contains("Usage"), "expected usage text: {err}");
}

#[rstest]
fn install_prints_the_new_record(workspace: Workspace) {
    let package = workspace.write_package("echo", ECHO_PLUGIN);
    let (code, out, err) = workspace.invoke(&["install", &package.display().to_string()]);
    assert_eq!(code, ExitCode::SUCCESS, "install failed: {err}");
    let record: Value = serde_json::from_str(&out).expect("record JSON");
    assert_eq!(record["name"], "echo");
    assert_eq!(record["entryPoint"], "main.run");
    assert_eq!(record["enabled"], true);
}

#[rstest]
fn list_reports_installed_plugins(workspace: Workspace) {
    let package = workspace.write_package("echo", ECHO_PLUGIN);
    let id = workspace.install(&package);

    let (code, out, _err) = workspace.invoke(&["list"]);
    assert_eq!(code, ExitCode::SUCCESS);
    let records: Value = serde_json::from_str(&out).expect("list JSON");
    let listed = records.as_array().expect("array of records");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], Value::String(id));
    assert_eq!(listed[0]["name"], "echo");
    // Listing is the summary projection, not the registry record.
    assert!(listed[0].get("entryPoint").is_none());
    assert!(listed[0].get("enabled").is_none());
    assert!(listed[0].get("createdAt").is_none());
}

#[rstest]
fn run_round_trips_plugin_output(workspace: Workspace) {
    let package = workspace.write_package("echo", ECHO_PLUGIN);
    let id = workspace.install(&package);

    let (code, out, err) =
        workspace.invoke(&["run", &id, "--input", r#"{"word": "marmalade"}"#]);
    assert_eq!(code, ExitCode::SUCCESS, "run failed: {err}");
    let envelope: Value = serde_json::from_str(&out).expect("envelope JSON");
    assert_eq!(envelope["status"], "success");
    assert_eq!(envelope["echo"], "marmalade");
}

#[rstest]
fn run_of_disabled_plugin_exits_non_zero_with_envelope(workspace: Workspace) {
    let package = workspace.write_package("echo", ECHO_PLUGIN);
    let id = workspace.install(&package);

    let (code, out, _err) = workspace.invoke(&["disable", &id]);
    assert_eq!(code, ExitCode::SUCCESS);
    let report: Value = serde_json::from_str(&out).expect("toggle JSON");
    assert_eq!(report["enabled"], false);

    let (code, out, _err) = workspace.invoke(&["run", &id]);
    assert_eq!(code, ExitCode::FAILURE);
    let envelope: Value = serde_json::from_str(&out).expect("envelope JSON");
    assert_eq!(envelope["error"], "plugin 'echo' is disabled");

    let (code, _out, _err) = workspace.invoke(&["enable", &id]);
    assert_eq!(code, ExitCode::SUCCESS);
    let (code, _out, _err) = workspace.invoke(&["run", &id]);
    assert_eq!(code, ExitCode::SUCCESS);
}

#[rstest]
fn info_returns_stored_metadata(workspace: Workspace) {
    let package = workspace.write_package("echo", ECHO_PLUGIN);
    let id = workspace.install(&package);

    let (code, out, _err) = workspace.invoke(&["info", &id]);
    assert_eq!(code, ExitCode::SUCCESS);
    let metadata: Value = serde_json::from_str(&out).expect("metadata JSON");
    assert_eq!(metadata["name"], "echo");
    assert!(metadata.as_object().expect("object").contains_key("uiSchema"));
    // The entry point names an internal code file and is kept out of info.
    assert!(metadata.get("entryPoint").is_none());
}

#[rstest]
fn remove_deletes_the_plugin(workspace: Workspace) {
    let package = workspace.write_package("echo", ECHO_PLUGIN);
    let id = workspace.install(&package);

    let (code, _out, _err) = workspace.invoke(&["remove", &id]);
    assert_eq!(code, ExitCode::SUCCESS);

    let (code, out, _err) = workspace.invoke(&["list"]);
    assert_eq!(code, ExitCode::SUCCESS);
    let records: Value = serde_json::from_str(&out).expect("list JSON");
    assert_eq!(records, serde_json::json!([]));
}

#[rstest]
fn non_object_run_input_is_rejected(workspace: Workspace) {
    let package = workspace.write_package("echo", ECHO_PLUGIN);
    let id = workspace.install(&package);

    let (code, _out, err) = workspace.invoke(&["run", &id, "--input", "[1, 2, 3]"]);
    assert_eq!(code, ExitCode::FAILURE);
    assert!(err.contains("input must be a JSON object"), "got: {err}");
}

#[rstest]
fn missing_package_file_reports_a_readable_error(workspace: Workspace) {
    let missing = workspace.dir.path().join("absent.zip");
    let (code, _out, err) = workspace.invoke(&["install", &missing.display().to_string()]);
    assert_eq!(code, ExitCode::FAILURE);
    assert!(err.contains("failed to read package"), "got: {err}");
}
