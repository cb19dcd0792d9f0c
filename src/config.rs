//! Layered configuration for the converter and its session.
//!
//! `defaults/mdpage.default.toml` is embedded into the binary so that docs and
//! runtime behavior stay in sync. Callers layer user files and CLI overrides on
//! top of those defaults via [`Loader`] before deserializing into [`MdpageConfig`].

use crate::page::PageShell;
use crate::renderer::RenderOptions;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/mdpage.default.toml");

/// File picked up from the working directory when present
pub const LOCAL_CONFIG_FILE: &str = "mdpage.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MdpageConfig {
    pub page: PageConfig,
    pub render: RenderConfig,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    pub title: String,
    pub lang: String,
    pub body_style: String,
}

impl From<&PageConfig> for PageShell {
    fn from(config: &PageConfig) -> Self {
        PageShell {
            title: config.title.clone(),
            lang: config.lang.clone(),
            body_style: config.body_style.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub link_titles: bool,
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        RenderOptions {
            link_titles: config.link_titles,
        }
    }
}

/// Where the session writes previews and saved pages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub preview_file: PathBuf,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (used for CLI flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<MdpageConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<MdpageConfig, ConfigError> {
    Loader::new().build()
}
