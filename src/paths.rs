//! Filesystem path helpers.
//!
//! Lexical cleaning for configuration search paths, `$HOME`/environment
//! expansion, directory creation and recursive file discovery.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically clean a path: drop `.` segments and resolve `..` against the
/// preceding segment.
///
/// Returns `None` when a `..` segment would climb above the path's own starting
/// point (`../etc`, `/../etc`, `a/../../b`). An empty result becomes `.`.
pub fn clean_path(path: impl AsRef<Path>) -> Option<PathBuf> {
    let mut prefix = PathBuf::new();
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            Component::Prefix(p) => prefix.push(p.as_os_str()),
            Component::RootDir => prefix.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part),
        }
    }

    let mut cleaned = prefix;
    for part in parts {
        cleaned.push(part);
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    Some(cleaned)
}

/// Expand a leading `$HOME` and any `$VAR` / `${VAR}` references, then make the
/// path absolute against the current directory.
///
/// Unset variables expand to an empty string.
pub fn expand_path(path: &str) -> io::Result<PathBuf> {
    let mut path = path.to_string();
    if path == "$HOME" || path.starts_with("$HOME/") || path.starts_with("$HOME\\") {
        let home = dirs::home_dir().unwrap_or_default();
        path = format!("{}{}", home.display(), &path[5..]);
    }

    let expanded = PathBuf::from(expand_env(&path));
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    Ok(clean_path(&absolute).unwrap_or(absolute))
}

fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let name: String = if chars.peek() == Some(&'{') {
            chars.next();
            let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
            name
        } else {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                out.push('$');
                continue;
            }
            name
        };

        out.push_str(&std::env::var(&name).unwrap_or_default());
    }

    out
}

/// Create a directory (and its parents) after expansion.
///
/// Succeeds when the directory already exists; fails with
/// [`io::ErrorKind::AlreadyExists`] when a regular file is in the way.
pub fn create_directory(path: &str) -> io::Result<PathBuf> {
    let expanded = expand_path(path)?;

    match std::fs::metadata(&expanded) {
        Ok(meta) if meta.is_file() => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} is a regular file", expanded.display()),
        )),
        Ok(_) => Ok(expanded),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            std::fs::create_dir_all(&expanded)?;
            Ok(expanded)
        }
        Err(e) => Err(e),
    }
}

/// Recursively collect files under `path` whose extension (with the leading
/// dot, e.g. `".yaml"`) is listed in `extensions`.
pub fn find_files(path: &str, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let root = expand_path(path)?;
    let mut files = Vec::new();
    walk(&root, extensions, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, extensions: &[&str], files: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(&path, extensions, files)?;
        } else if has_extension(&path, extensions) {
            files.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions
            .iter()
            .any(|wanted| wanted.strip_prefix('.') == Some(ext)),
        None => false,
    }
}
