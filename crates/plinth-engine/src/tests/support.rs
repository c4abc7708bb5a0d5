//! Shared builders for package archives used across test modules.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::FileOptions;

/// Builds an in-memory zip archive from `(path, contents)` pairs.
pub(crate) fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, contents) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish archive").into_inner()
}

/// Renders a minimal valid `plugin.json` for the named plugin.
pub(crate) fn manifest_json(name: &str) -> String {
    serde_json::json!({
        "name": name,
        "description": format!("{name} test plugin"),
        "version": "0.1.0",
    })
    .to_string()
}
