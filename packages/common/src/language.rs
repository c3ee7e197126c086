//! Language toolchain registry loaded from `langs.toml`.
//!
//! ```toml
//! [[langs]]
//! id = "cpp"
//! name = "C++"
//! version = "GCC 13 (C++20)"
//! source = "main.cpp"
//! compile = ["g++", "-O2", "-std=c++20", "-o", "main", "main.cpp"]
//! exec = ["./main"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("failed to read language file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse language file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid language registry: {0}")]
    Invalid(String),
}

/// One toolchain entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Language {
    /// Identifier used in submissions (e.g. `cpp`).
    #[schema(example = "cpp")]
    pub id: String,
    /// Human readable name.
    #[schema(example = "C++")]
    pub name: String,
    #[schema(example = "GCC 13 (C++20)")]
    pub version: String,
    /// File name the source is written to inside the working directory.
    #[schema(example = "main.cpp")]
    pub source: String,
    /// Compile argv, run inside the working directory. Empty means no compile step.
    #[serde(default)]
    pub compile: Vec<String>,
    /// Run argv, run inside the working directory.
    pub exec: Vec<String>,
}

impl Language {
    pub fn needs_compile(&self) -> bool {
        !self.compile.is_empty()
    }
}

#[derive(Deserialize)]
struct LanguageFile {
    langs: Vec<Language>,
}

/// Immutable set of languages for the lifetime of a process.
#[derive(Clone, Debug)]
pub struct LanguageRegistry {
    langs: Vec<Language>,
}

impl LanguageRegistry {
    /// Load and validate a registry from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LanguageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| LanguageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_toml_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            count = registry.langs.len(),
            "Loaded language registry"
        );
        Ok(registry)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, LanguageError> {
        let file: LanguageFile = toml::from_str(raw)?;
        Self::new(file.langs)
    }

    pub fn new(langs: Vec<Language>) -> Result<Self, LanguageError> {
        if langs.is_empty() {
            return Err(LanguageError::Invalid("no languages configured".into()));
        }

        let mut seen = HashSet::with_capacity(langs.len());
        for lang in &langs {
            if lang.id.trim().is_empty() {
                return Err(LanguageError::Invalid("language id must not be empty".into()));
            }
            if !seen.insert(lang.id.as_str()) {
                return Err(LanguageError::Invalid(format!(
                    "duplicate language id '{}'",
                    lang.id
                )));
            }
            if lang.exec.is_empty() {
                return Err(LanguageError::Invalid(format!(
                    "language '{}' has no exec command",
                    lang.id
                )));
            }
            if lang.source.contains('/') || lang.source.contains('\\') || lang.source.is_empty() {
                return Err(LanguageError::Invalid(format!(
                    "language '{}' has an invalid source file name",
                    lang.id
                )));
            }
        }

        Ok(Self { langs })
    }

    pub fn get(&self, id: &str) -> Option<&Language> {
        self.langs.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn list(&self) -> &[Language] {
        &self.langs
    }
}
