//! Scanner configuration for camscan.
//!
//! A single TOML file plus `CAMSCAN_` environment overrides, validated and
//! translated to `camscan_core::ScannerSettings`. Device-class profiles
//! merge key-by-key over the built-in defaults, so a file only needs the
//! values it changes.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use camscan_core::model::{DEFAULT_FPS, DEFAULT_SYMBOLOGIES};
use camscan_core::{
    BusyPolicy, DecodeRegion, DeviceClass, DeviceProfiles, ScanProfile, ScannerSettings,
    StrategyOrder, Symbology,
};

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "CAMSCAN_";

const MAX_FPS: u32 = 60;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Target decode attempts per second.
    pub fps: u32,

    /// Symbologies the decoder should recognize.
    pub symbologies: Vec<Symbology>,

    /// Whether the exact-device strategy is tried before facing mode.
    pub strategy_order: StrategyOrder,

    /// What a scan request does while a session is live.
    pub busy_policy: BusyPolicy,

    /// Name of the element the decoder renders into.
    pub render_target: String,

    /// Per device-class surface and decode-region profiles.
    pub profiles: DeviceProfiles,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            symbologies: DEFAULT_SYMBOLOGIES.to_vec(),
            strategy_order: StrategyOrder::default(),
            busy_policy: BusyPolicy::default(),
            render_target: "scanner-container".into(),
            profiles: DeviceProfiles::default(),
        }
    }
}

impl Config {
    /// Reject values no decoder could honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_FPS).contains(&self.fps) {
            return Err(ConfigError::invalid(
                "fps",
                format!("expected 1..={MAX_FPS}, got {}", self.fps),
            ));
        }
        if self.symbologies.is_empty() {
            return Err(ConfigError::invalid(
                "symbologies",
                "at least one symbology is required",
            ));
        }
        if self.render_target.trim().is_empty() {
            return Err(ConfigError::invalid("render_target", "must not be empty"));
        }

        for class in [
            DeviceClass::Desktop,
            DeviceClass::Mobile,
            DeviceClass::EmbeddedWebView,
        ] {
            validate_profile(class, self.profiles.for_class(class))?;
        }
        Ok(())
    }

    /// Validate and convert into the settings a `ScanController` runs with.
    pub fn to_settings(&self) -> Result<ScannerSettings, ConfigError> {
        self.validate()?;
        Ok(ScannerSettings {
            fps: self.fps,
            symbologies: self.symbologies.clone(),
            strategy_order: self.strategy_order,
            busy_policy: self.busy_policy,
            profiles: self.profiles,
        })
    }
}

fn validate_profile(class: DeviceClass, profile: &ScanProfile) -> Result<(), ConfigError> {
    let field = format!("profiles.{class}.decode_region");
    match profile.decode_region {
        DecodeRegion::Fixed { width, height } => {
            if width == 0 || height == 0 {
                return Err(ConfigError::invalid(
                    field,
                    format!("decode box must be non-empty, got {width}x{height}"),
                ));
            }
        }
        DecodeRegion::Viewport {
            width_fraction,
            height,
        } => {
            let in_range = width_fraction > 0.0 && width_fraction <= 1.0;
            if !in_range {
                return Err(ConfigError::invalid(
                    field,
                    format!("width_fraction must be in (0, 1], got {width_fraction}"),
                ));
            }
            if height == 0 {
                return Err(ConfigError::invalid(field, "height must be non-zero"));
            }
        }
    }
    Ok(())
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "camscan", "camscan").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("camscan");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered providers: defaults, then the TOML file, then environment.
///
/// A missing file contributes nothing.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from `path` (or the canonical path) + environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use camscan_core::{CaptureRegion, Viewport};
    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_match_core_settings() {
        let settings = Config::default().to_settings().unwrap();
        assert_eq!(settings, ScannerSettings::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = figment(&dir.path().join("absent.toml"))
            .extract::<Config>()
            .unwrap();
        assert_eq!(cfg.fps, DEFAULT_FPS);
        assert_eq!(cfg.render_target, "scanner-container");
    }

    #[test]
    fn file_overrides_top_level_keys() {
        let (_dir, path) = write_config(
            r#"
            fps = 24
            symbologies = ["QR_CODE", "EAN_8"]
            strategy_order = "facing-first"
            busy_policy = "restart"
            "#,
        );

        let cfg = figment(&path).extract::<Config>().unwrap();
        assert_eq!(cfg.fps, 24);
        assert_eq!(cfg.symbologies, vec![Symbology::QrCode, Symbology::Ean8]);
        assert_eq!(cfg.strategy_order, StrategyOrder::FacingFirst);
        assert_eq!(cfg.busy_policy, BusyPolicy::Restart);
    }

    #[test]
    fn partial_profile_merges_over_defaults() {
        let (_dir, path) = write_config(
            r"
            [profiles.mobile.layout]
            stop_control_inset = 32

            [profiles.mobile.layout.capture]
            mode = 'full-viewport'
            reserved_bottom = 80
            ",
        );

        let cfg = figment(&path).extract::<Config>().unwrap();
        let settings = cfg.to_settings().unwrap();

        let mobile = settings.layout(DeviceClass::Mobile);
        assert_eq!(
            mobile.capture,
            CaptureRegion::FullViewport {
                reserved_bottom: 80
            }
        );
        assert_eq!(mobile.stop_control_inset, 32);
        // Untouched classes keep their defaults.
        assert_eq!(
            settings.layout(DeviceClass::Desktop),
            ScannerSettings::default().layout(DeviceClass::Desktop)
        );
        let phone = Viewport {
            width: 390,
            height: 844,
        };
        assert_eq!(mobile.capture.height_for(phone), 764);
    }

    #[test]
    fn rejects_out_of_range_fps() {
        let cfg = Config {
            fps: 0,
            ..Config::default()
        };
        let err = cfg.to_settings().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "fps"));

        let cfg = Config {
            fps: 120,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_symbologies() {
        let cfg = Config {
            symbologies: Vec::new(),
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid symbologies: at least one symbology is required"
        );
    }

    #[test]
    fn rejects_viewport_fraction_outside_unit_interval() {
        for fraction in [0.0, -0.5, 1.5] {
            let mut cfg = Config::default();
            cfg.profiles.webview.decode_region = DecodeRegion::Viewport {
                width_fraction: fraction,
                height: 150,
            };
            let err = cfg.validate().unwrap_err();
            assert!(
                err.to_string()
                    .starts_with("invalid profiles.webview.decode_region"),
                "fraction {fraction}: {err}"
            );
        }
    }

    #[test]
    fn unknown_enum_value_is_a_load_error() {
        let (_dir, path) = write_config(r#"busy_policy = "queue""#);
        let err: ConfigError = figment(&path).extract::<Config>().unwrap_err().into();
        assert!(matches!(err, ConfigError::Figment(_)));
    }
}
