/*!
# Command Discovery

Walks the command-implementation directory and yields one entry per module
file. Layout is `<root>/<family>/<file>`; files directly under the root
belong to the `general` family.
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{RelayError, Result};

static COMMAND_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)@command\s+([^\r\n*]+?)\s*(?:\*/)?\s*$").expect("valid command marker pattern")
});

pub const DEFAULT_FAMILY: &str = "general";

/// A command module found on disk, before classification
#[derive(Debug, Clone)]
pub struct DiscoveredCommand {
    pub name: String,
    pub family: String,
    /// Path relative to the command root
    pub location: PathBuf,
    pub content: String,
}

/// Find every command module under `root` with one of `extensions`.
///
/// Results are sorted by location so registry construction is deterministic.
pub fn discover_commands(root: &Path, extensions: &[String]) -> Result<Vec<DiscoveredCommand>> {
    if !root.is_dir() {
        return Err(RelayError::MissingDirectory(root.to_path_buf()));
    }

    let mut found = Vec::new();
    walk(root, root, extensions, &mut found)?;
    found.sort_by(|a, b| a.location.cmp(&b.location));
    debug!(root = %root.display(), commands = found.len(), "discovered command modules");
    Ok(found)
}

fn walk(
    current: &Path,
    root: &Path,
    extensions: &[String],
    found: &mut Vec<DiscoveredCommand>,
) -> Result<()> {
    let entries = fs::read_dir(current).map_err(|e| RelayError::io(current, e))?;
    for entry in entries {
        let path = entry.map_err(|e| RelayError::io(current, e))?.path();

        if path.is_dir() {
            walk(&path, root, extensions, found)?;
        } else if has_extension(&path, extensions) && !is_index_module(&path) {
            let content = fs::read_to_string(&path).map_err(|e| RelayError::io(&path, e))?;
            let location = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            found.push(DiscoveredCommand {
                name: command_name(&location, &content),
                family: family_of(&location),
                location,
                content,
            });
        }
    }
    Ok(())
}

/// `@command <name>` marker if present, otherwise the file stem with `_` read as a space.
pub fn command_name(location: &Path, content: &str) -> String {
    if let Some(captures) = COMMAND_MARKER.captures(content) {
        return captures[1].trim().to_string();
    }
    location
        .file_stem()
        .map(|stem| stem.to_string_lossy().replace('_', " "))
        .unwrap_or_default()
}

fn family_of(location: &Path) -> String {
    let mut components = location.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().to_string(),
        _ => DEFAULT_FAMILY.to_string(),
    }
}

pub(crate) fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|e| e.to_lowercase() == ext))
}

fn is_index_module(path: &Path) -> bool {
    path.file_stem().is_some_and(|stem| stem == "index")
}
