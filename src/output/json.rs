//! JSON output

use std::fs;
use std::path::Path;

use serde::Serialize;

pub fn output_json<T: Serialize>(result: &T) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
}

pub fn save_json<T: Serialize>(result: &T, path: &Path) -> anyhow::Result<()> {
    let json = output_json(result);
    fs::write(path, json)?;
    Ok(())
}
