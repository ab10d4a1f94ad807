// src/utils/input.rs - JSON-lines record readers for the driver
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lazily decodes one record per non-blank line of `path`.
///
/// Opening the file is the only hard error. Unreadable or undecodable lines
/// come through as `Err` items so the engine can skip and count them.
pub fn read_json_lines<T>(path: &Path) -> Result<impl Iterator<Item = Result<T>>>
where
    T: DeserializeOwned,
{
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let source = path.display().to_string();

    Ok(BufReader::new(file)
        .lines()
        .enumerate()
        .filter_map(move |(idx, line)| {
            let line_no = idx + 1;
            match line {
                Ok(text) if text.trim().is_empty() => None,
                Ok(text) => Some(
                    serde_json::from_str::<T>(&text)
                        .with_context(|| format!("{}:{}: invalid record", source, line_no)),
                ),
                Err(e) => Some(Err(e).with_context(|| format!("{}:{}: unreadable line", source, line_no))),
            }
        }))
}
