//! Reader for local `.env` files and the merge of every variable source.

use log::debug;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

pub const DEFAULT_ENV_FILE: &str = ".env";

/// Parse `KEY=VALUE` lines. Comments, blank lines and an `export ` prefix are
/// accepted; one layer of matching quotes is stripped from values.
pub fn parse(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            debug!("skipping .env line {} without '='", index + 1);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            debug!("skipping .env line {} with empty key", index + 1);
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Load `path`, returning `None` when the file does not exist.
pub fn load(path: &Path) -> io::Result<Option<BTreeMap<String, String>>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(parse(&content))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Merge variable sources; later sources override earlier ones.
///
/// A blank value never overrides, so an empty exported variable falls back to
/// the `.env` or configured value.
pub fn merge<I>(sources: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = BTreeMap<String, String>>,
{
    sources.into_iter().fold(BTreeMap::new(), |mut merged, source| {
        for (key, value) in source {
            if value.trim().is_empty() {
                merged.entry(key).or_insert(value);
            } else {
                merged.insert(key, value);
            }
        }
        merged
    })
}

/// The current process environment, skipping non-Unicode entries.
pub fn process_environment() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}
