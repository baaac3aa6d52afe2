//! Configuration: file locations and animator settings.
//!
//! Settings live in `flavorseq.json` inside the config directory. A missing
//! file means defaults; unknown keys are ignored and missing keys take their
//! default, so old files keep loading.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::image_cache::DEFAULT_BATCH_SIZE;
use crate::entities::compositor::MAX_DPR;
use crate::entities::easing::Easing;
use crate::entities::product::DEFAULT_FRAME_COUNT;

/// Settings file name inside the config directory.
pub const SETTINGS_FILE: &str = "flavorseq.json";

/// Environment override for the config directory.
pub const CONFIG_DIR_ENV: &str = "FLAVORSEQ_CONFIG_DIR";

/// Configuration for overriding default application paths
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (FLAVORSEQ_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. FLAVORSEQ_CONFIG_DIR environment variable
/// 3. Current directory IF it already holds a flavorseq config or log
/// 4. Platform config directory from dirs-next
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir()).join(name)
}

/// Get path to a data file (logs, snapshots). Same priority as [`config_file`].
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir()).join(name)
}

/// Create config and data directories if missing.
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = resolve_dir(config, dirs_next::config_dir());
    let data_dir = resolve_dir(config, dirs_next::data_dir());

    for dir in [config_dir, data_dir] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
    }
    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [SETTINGS_FILE, "flavorseq.log"]
        .iter()
        .any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    if let Ok(current_dir) = std::env::current_dir() {
        if has_local_config_files(&current_dir) {
            return current_dir;
        }
    }

    if let Some(dir) = platform_dir {
        return dir.join("flavorseq");
    }

    PathBuf::from(".")
}

/// Tunables of the loader, compositor and driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorSettings {
    /// Frame loads in flight per batch
    pub batch_size: usize,
    /// Cap for the device pixel ratio, clamped to `[1, MAX_DPR]` when applied
    pub max_dpr: f64,
    /// Visible fraction of the container that starts autoplay (strictly above)
    pub visibility_threshold: f64,
    /// Lower bound of the autoplay duration
    pub autoplay_min_ms: u64,
    pub autoplay_ms_per_frame: u64,
    /// Fixed autoplay duration, replaces the per-frame value (the minimum still applies)
    pub autoplay_duration_ms: Option<u64>,
    pub easing: Easing,
    /// Sequence length assumed when none is given (the `frame` command)
    pub default_frame_count: u32,
    /// Worker threads (default: 3/4 of the cores)
    pub workers: Option<usize>,
}

impl Default for AnimatorSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_dpr: MAX_DPR,
            visibility_threshold: 0.6,
            autoplay_min_ms: 1600,
            autoplay_ms_per_frame: 6,
            autoplay_duration_ms: None,
            easing: Easing::EaseOutCubic,
            default_frame_count: DEFAULT_FRAME_COUNT,
            workers: None,
        }
    }
}

impl AnimatorSettings {
    /// Autoplay length for a sequence of `total_frames`, never below `autoplay_min_ms`.
    pub fn autoplay_duration(&self, total_frames: u32) -> Duration {
        let ms = self
            .autoplay_duration_ms
            .unwrap_or(total_frames as u64 * self.autoplay_ms_per_frame)
            .max(self.autoplay_min_ms);
        Duration::from_millis(ms.max(1))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };
        assert_eq!(config_file("test.json", &config), PathBuf::from("/custom/test.json"));
        assert_eq!(data_file("run.log", &config), PathBuf::from("/custom/run.log"));
    }

    #[test]
    fn test_autoplay_duration() {
        let settings = AnimatorSettings::default();
        // 191 * 6 = 1146 ms, below the 1600 ms floor
        assert_eq!(settings.autoplay_duration(191), Duration::from_millis(1600));
        assert_eq!(settings.autoplay_duration(400), Duration::from_millis(2400));

        let fixed = AnimatorSettings {
            autoplay_duration_ms: Some(1800),
            ..Default::default()
        };
        assert_eq!(fixed.autoplay_duration(191), Duration::from_millis(1800));
    }

    #[test]
    fn test_autoplay_duration_respects_minimum() {
        let too_short = AnimatorSettings {
            autoplay_duration_ms: Some(50),
            ..Default::default()
        };
        assert_eq!(too_short.autoplay_duration(191), Duration::from_millis(1600));
        assert_eq!(too_short.autoplay_duration(1), Duration::from_millis(1600));
    }

    #[test]
    fn test_partial_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{ "batch_size": 4, "easing": "linear" }"#).unwrap();

        let settings = AnimatorSettings::load(&path).unwrap();
        assert_eq!(settings.batch_size, 4);
        assert_eq!(settings.easing, Easing::Linear);
        assert_eq!(settings.max_dpr, MAX_DPR);
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AnimatorSettings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, AnimatorSettings::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = AnimatorSettings {
            workers: Some(2),
            visibility_threshold: 0.5,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(AnimatorSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_malformed_settings_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AnimatorSettings::load(&path).is_err());
    }
}
