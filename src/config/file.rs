//! File-bound configuration source.
//!
//! A [`FileSource`] is either pinned to one exact file (the path carried a
//! directory component) or resolved by name across a list of search
//! directories. The format is taken from the file extension.

use std::path::{Path, PathBuf};

use figment::providers::{Format, Json, Toml, Yaml};
use figment::Figment;

use crate::error::ConfigurationError;
use crate::paths::clean_path;

/// Format assumed when the filename carries no extension.
pub const DEFAULT_CONFIG_TYPE: &str = "yaml";

/// Where one configuration file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    directory: Option<PathBuf>,
    filename: String,
    search_paths: Vec<PathBuf>,
}

impl FileSource {
    /// Describe a configuration file.
    ///
    /// Search paths whose `..` segments escape their starting point are
    /// dropped, the rest are cleaned. When `file` has a directory component the
    /// search paths are ignored at load time.
    pub fn new<P: AsRef<Path>>(file: impl AsRef<Path>, search_paths: &[P]) -> Self {
        let search_paths = search_paths.iter().filter_map(|p| clean_path(p)).collect();

        let file = file.as_ref();
        let filename = file
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| clean_path(p).unwrap_or_else(|| p.to_path_buf()));

        Self {
            directory,
            filename,
            search_paths,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Directory component of the original path, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Effective search directories after sanitization.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Configuration name: the filename without its extension.
    pub fn config_name(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((name, _)) => name,
            None => &self.filename,
        }
    }

    /// Configuration format: the extension, or [`DEFAULT_CONFIG_TYPE`].
    pub fn config_type(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => DEFAULT_CONFIG_TYPE,
        }
    }

    /// Locate the file on disk.
    pub fn resolve(&self) -> Result<PathBuf, ConfigurationError> {
        if let Some(dir) = &self.directory {
            let path = dir.join(&self.filename);
            if path.is_file() {
                return Ok(path);
            }
            return Err(ConfigurationError::FileNotFound {
                file: self.filename.clone(),
                searched: vec![dir.clone()],
            });
        }

        let has_extension = self.filename.contains('.');
        for dir in &self.search_paths {
            let exact = dir.join(&self.filename);
            if exact.is_file() {
                return Ok(exact);
            }
            if !has_extension {
                for ext in ["yaml", "yml"] {
                    let candidate = dir.join(format!("{}.{}", self.filename, ext));
                    if candidate.is_file() {
                        return Ok(candidate);
                    }
                }
            }
        }

        Err(ConfigurationError::FileNotFound {
            file: self.filename.clone(),
            searched: self.search_paths.clone(),
        })
    }

    /// Resolve, read and parse the file.
    pub(crate) fn load(&self) -> Result<Figment, ConfigurationError> {
        let format = self.config_type().to_ascii_lowercase();
        if !matches!(format.as_str(), "yaml" | "yml" | "json" | "toml") {
            return Err(ConfigurationError::UnsupportedFormat(format));
        }

        let path = self.resolve()?;
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigurationError::Read {
            path: path.clone(),
            source,
        })?;

        let figment = match format.as_str() {
            "json" => Figment::from(Json::string(&contents)),
            "toml" => Figment::from(Toml::string(&contents)),
            _ => Figment::from(Yaml::string(&contents)),
        };

        // Surface parse errors now rather than on first read
        figment
            .extract::<figment::value::Dict>()
            .map_err(|e| ConfigurationError::Parse {
                path,
                source: Box::new(e),
            })?;

        Ok(figment)
    }
}
