//! Layered configuration.
//!
//! `defaults/tagquery.default.toml` is embedded into the crate so the binary
//! always starts from a complete configuration. [`Loader`] layers user files,
//! explicit overrides and `TAGQUERY__*` environment variables on top before
//! deserializing into [`Settings`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

const DEFAULT_TOML: &str = include_str!("../defaults/tagquery.default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub generator: GeneratorSettings,
    pub metatags: MetatagSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratorSettings {
    pub indent_char: char,
    pub indent_size: usize,
}
impl Default for GeneratorSettings {
    fn default() -> Self {
        Self { indent_char: ' ', indent_size: 4 }
    }
}

/// Metatag names per value type.
#[derive(Debug, Clone, Deserialize)]
pub struct MetatagSettings {
    pub string: Vec<String>,
    pub integer: Vec<String>,
    pub date: Vec<String>,
    pub size: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
    environment: bool,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder, environment: true }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref()).format(FileFormat::Toml).required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a configuration file that may be absent.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref()).format(FileFormat::Toml).required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Skip the `TAGQUERY__*` environment layer.
    pub fn without_environment(mut self) -> Self {
        self.environment = false;
        self
    }

    pub fn build(self) -> Result<Settings> {
        let mut builder = self.builder;
        if self.environment {
            builder = builder.add_source(
                Environment::with_prefix("TAGQUERY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }
        Ok(builder.build()?.try_deserialize()?)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<Settings> {
    Loader::new().without_environment().build()
}
