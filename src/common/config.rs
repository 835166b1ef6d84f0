use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::layout::{IdGenerator, SequentialIds, UuidIds, sizes};

const DEFAULT_CONFIG: &str = include_str!("../../panel-layout.default.toml");

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub layout: LayoutSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Smallest size, in percent, a boundary resize may leave on either side.
    #[serde(default = "default_min_size_percent")]
    pub min_size_percent: f64,
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            min_size_percent: default_min_size_percent(),
            id_strategy: IdStrategy::default(),
        }
    }
}

/// How ids are generated for nodes created without one.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    Uuid,
    Sequential,
}

impl IdStrategy {
    pub fn generator(self) -> Box<dyn IdGenerator> {
        match self {
            IdStrategy::Uuid => Box::new(UuidIds),
            IdStrategy::Sequential => Box::new(SequentialIds::default()),
        }
    }
}

fn default_min_size_percent() -> f64 { 5.0 }

impl LayoutSettings {
    /// The minimum size as a share, clamped to what a two-way split allows.
    pub fn min_share(&self) -> u32 {
        let share = sizes::delta_from_percent(self.min_size_percent.clamp(0.0, 50.0));
        share as u32
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.min_size_percent.is_finite() || self.min_size_percent < 0.0 {
            issues.push(format!(
                "layout.min_size_percent must be a non-negative number, got {}",
                self.min_size_percent
            ));
        } else if self.min_size_percent > 50.0 {
            issues.push(format!(
                "layout.min_size_percent must be at most 50, got {}",
                self.min_size_percent
            ));
        }

        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn builtin() -> Config {
        Self::parse(DEFAULT_CONFIG).expect("built-in config must parse")
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(config) => Ok(config),
            Err(e) => bail!("{}", e.to_string().trim_end()),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.layout.validate());

        issues
    }
}
