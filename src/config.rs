//! Generator configuration.
//!
//! Settings load from a TOML file with three optional sections. Missing
//! sections and keys fall back to defaults; command-line flags override
//! whatever the file sets.
//!
//! ```toml
//! [device]
//! allow_cpu_fallback = true
//! kernel_path = "kernels/custom.wgsl"
//!
//! [mixer]
//! width = 256
//! sample_width = 256
//! sample_height = 256
//!
//! [seed]
//! selection = "leading"
//! ```

use crate::kernels::KERNEL_SOURCE;
use crate::keygen::{SeedSelection, SEED_WORDS};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("mixer width {0} is below the {min} lanes a seed needs", min = SEED_WORDS)]
    InvalidWidth(u32),
    #[error("invalid sample dimensions {0}x{1}")]
    InvalidSampleDimensions(u32, u32),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
    #[error("failed to read kernel source: {0}")]
    KernelReadError(String),
}

impl ConfigError {
    /// Stable category name used in diagnostics.
    pub fn category(&self) -> &'static str {
        "ConfigError"
    }
}

/// Compute device selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Use a CPU-class device when no GPU is available.
    pub allow_cpu_fallback: bool,
    /// Kernel source to load instead of the embedded program. Only GPU
    /// devices accept it; the host device fails to build it.
    pub kernel_path: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            allow_cpu_fallback: true,
            kernel_path: None,
        }
    }
}

/// Entropy mixer dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Work-items per mixer launch, one entropy word each.
    pub width: u32,
    /// Sample grid width.
    pub sample_width: u32,
    /// Sample grid height.
    pub sample_height: u32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            width: 256,
            sample_width: 256,
            sample_height: 256,
        }
    }
}

impl MixerConfig {
    /// Byte length of the sample buffer.
    #[inline]
    pub fn sample_len(&self) -> usize {
        self.sample_width as usize * self.sample_height as usize
    }

    /// Validates the dimensions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (self.width as usize) < SEED_WORDS {
            return Err(ConfigError::InvalidWidth(self.width));
        }
        if self.sample_width == 0 || self.sample_height == 0 {
            return Err(ConfigError::InvalidSampleDimensions(
                self.sample_width,
                self.sample_height,
            ));
        }
        Ok(())
    }
}

/// Candidate seed derivation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub selection: SeedSelection,
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub mixer: MixerConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mixer.validate()
    }

    /// Kernel program text: the configured file, or the embedded program.
    pub fn kernel_source(&self) -> Result<Cow<'static, str>, ConfigError> {
        match &self.device.kernel_path {
            Some(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|e| ConfigError::KernelReadError(format!("{}: {}", path.display(), e))),
            None => Ok(Cow::Borrowed(KERNEL_SOURCE)),
        }
    }
}
