//! # Config Module
//!
//! Turns raw settings into a validated, immutable [`AppConfig`].
//!
//! ## Settings
//! | Key                         | Required            | Meaning                              |
//! |-----------------------------|---------------------|--------------------------------------|
//! | `METRIC`                    | yes                 | `mse` or `ssim`                      |
//! | `DIFF_THRESHOLD`            | yes                 | finite number                        |
//! | `MAGICK_PATH`               | for MSE / preprocess| ImageMagick executable               |
//! | `FFMPEG_PATH`               | for SSIM            | FFmpeg executable                    |
//! | `ABNORMAL_IMAGES_DIRECTORY` | no                  | sub-directory for flagged frames     |
//! | `CROP_WIDTH` ... `CROP_OFFSET_Y` | all or none    | region of interest                   |
//! | `CROP_MODE`                 | no                  | `in-backend` (default) or `preprocess` |
//! | `WORKERS`                   | no                  | worker pool size, default CPU count  |
//! | `COMPARE_TIMEOUT_SECS`      | no                  | per-call timeout, default none       |
//!
//! Empty values count as unset.

use crate::core::crop::{CropConfig, CropMode};
use crate::core::metric::Metric;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// Raw, unvalidated settings as given on the command line or in the
/// environment (clap resolves which one wins)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub magick_path: Option<String>,
    pub ffmpeg_path: Option<String>,
    pub metric: Option<String>,
    pub diff_threshold: Option<String>,
    pub abnormal_images_directory: Option<String>,
    pub crop_width: Option<String>,
    pub crop_height: Option<String>,
    pub crop_offset_x: Option<String>,
    pub crop_offset_y: Option<String>,
    pub crop_mode: Option<String>,
    pub workers: Option<String>,
    pub compare_timeout_secs: Option<String>,
}

/// Validated configuration, built once and passed by reference
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub magick_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub metric: Metric,
    pub threshold: f64,
    pub abnormal_images_directory: Option<String>,
    pub crop: Option<CropConfig>,
    pub crop_mode: CropMode,
    pub workers: Option<usize>,
    pub compare_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let metric_raw = non_empty(&settings.metric).ok_or(ConfigError::Missing { key: "METRIC" })?;
        let metric: Metric = metric_raw.parse().map_err(|reason| ConfigError::Invalid {
            key: "METRIC",
            value: metric_raw.to_string(),
            reason,
        })?;

        let threshold_raw = non_empty(&settings.diff_threshold)
            .ok_or(ConfigError::Missing { key: "DIFF_THRESHOLD" })?;
        let threshold = threshold_raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .ok_or_else(|| ConfigError::Invalid {
                key: "DIFF_THRESHOLD",
                value: threshold_raw.to_string(),
                reason: "expected a finite number".to_string(),
            })?;

        let magick_path = non_empty(&settings.magick_path).map(PathBuf::from);
        let ffmpeg_path = non_empty(&settings.ffmpeg_path).map(PathBuf::from);

        match metric {
            Metric::Mse if magick_path.is_none() => {
                return Err(ConfigError::Missing { key: "MAGICK_PATH" })
            }
            Metric::Ssim if ffmpeg_path.is_none() => {
                return Err(ConfigError::Missing { key: "FFMPEG_PATH" })
            }
            _ => {}
        }

        let crop = parse_crop(settings)?;

        let crop_mode = match non_empty(&settings.crop_mode) {
            Some(raw) => raw.parse::<CropMode>().map_err(|reason| ConfigError::Invalid {
                key: "CROP_MODE",
                value: raw.to_string(),
                reason,
            })?,
            None => CropMode::default(),
        };
        if crop.is_some() && crop_mode == CropMode::Preprocess && magick_path.is_none() {
            return Err(ConfigError::Missing { key: "MAGICK_PATH" });
        }

        let workers = non_empty(&settings.workers)
            .map(|raw| parse_positive("WORKERS", raw).map(|n| n as usize))
            .transpose()?;

        let compare_timeout = non_empty(&settings.compare_timeout_secs)
            .map(|raw| parse_positive("COMPARE_TIMEOUT_SECS", raw).map(Duration::from_secs))
            .transpose()?;

        Ok(Self {
            magick_path,
            ffmpeg_path,
            metric,
            threshold,
            abnormal_images_directory: non_empty(&settings.abnormal_images_directory)
                .map(str::to_string),
            crop,
            crop_mode,
            workers,
            compare_timeout,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn parse_crop(settings: &Settings) -> Result<Option<CropConfig>, ConfigError> {
    let fields = [
        ("CROP_WIDTH", non_empty(&settings.crop_width)),
        ("CROP_HEIGHT", non_empty(&settings.crop_height)),
        ("CROP_OFFSET_X", non_empty(&settings.crop_offset_x)),
        ("CROP_OFFSET_Y", non_empty(&settings.crop_offset_y)),
    ];

    let present = fields.iter().filter(|(_, v)| v.is_some()).count();
    if present == 0 {
        return Ok(None);
    }
    if present != fields.len() {
        return Err(ConfigError::IncompleteCrop);
    }

    let mut values = [0u32; 4];
    for (slot, (key, raw)) in values.iter_mut().zip(fields) {
        let raw = raw.unwrap_or_default();
        *slot = parse_non_negative(key, raw)?;
    }
    let [width, height, offset_x, offset_y] = values;

    for (key, value) in [("CROP_WIDTH", width), ("CROP_HEIGHT", height)] {
        if value == 0 {
            return Err(ConfigError::Invalid {
                key,
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
    }

    Ok(Some(CropConfig::new(width, height, offset_x, offset_y)))
}

fn parse_non_negative(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let value: i64 = raw.trim().parse().map_err(|_| invalid("expected an integer"))?;
    if value < 0 {
        return Err(invalid("must not be negative"));
    }
    u32::try_from(value).map_err(|_| invalid("too large"))
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let value = parse_non_negative(key, raw)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(u64::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        let get = |key: &str| map.get(key).map(|v| v.to_string());
        Settings {
            magick_path: get("MAGICK_PATH"),
            ffmpeg_path: get("FFMPEG_PATH"),
            metric: get("METRIC"),
            diff_threshold: get("DIFF_THRESHOLD"),
            abnormal_images_directory: get("ABNORMAL_IMAGES_DIRECTORY"),
            crop_width: get("CROP_WIDTH"),
            crop_height: get("CROP_HEIGHT"),
            crop_offset_x: get("CROP_OFFSET_X"),
            crop_offset_y: get("CROP_OFFSET_Y"),
            crop_mode: get("CROP_MODE"),
            workers: get("WORKERS"),
            compare_timeout_secs: get("COMPARE_TIMEOUT_SECS"),
        }
    }

    fn mse_base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MAGICK_PATH", "magick"),
            ("METRIC", "mse"),
            ("DIFF_THRESHOLD", "0.005"),
        ]
    }

    #[test]
    fn loads_full_configuration() {
        let mut pairs = mse_base();
        pairs.extend([
            ("ABNORMAL_IMAGES_DIRECTORY", "abnormal"),
            ("CROP_WIDTH", "100"),
            ("CROP_HEIGHT", "100"),
            ("CROP_OFFSET_X", "0"),
            ("CROP_OFFSET_Y", "0"),
        ]);

        let config = AppConfig::from_settings(&settings(&pairs)).unwrap();

        assert_eq!(config.metric, Metric::Mse);
        assert_eq!(config.threshold, 0.005);
        assert_eq!(config.abnormal_images_directory.as_deref(), Some("abnormal"));
        assert_eq!(config.crop, Some(CropConfig::new(100, 100, 0, 0)));
        assert_eq!(config.crop_mode, CropMode::InBackend);
        assert_eq!(config.workers, None);
        assert_eq!(config.compare_timeout, None);
    }

    #[test]
    fn ssim_requires_ffmpeg() {
        let config = settings(&[("METRIC", "ssim"), ("DIFF_THRESHOLD", "0.9"), ("MAGICK_PATH", "magick")]);
        assert_eq!(
            AppConfig::from_settings(&config).unwrap_err(),
            ConfigError::Missing { key: "FFMPEG_PATH" }
        );

        let config = settings(&[("METRIC", "ssim"), ("DIFF_THRESHOLD", "0.9"), ("FFMPEG_PATH", "ffmpeg")]);
        assert_eq!(AppConfig::from_settings(&config).unwrap().metric, Metric::Ssim);
    }

    #[test]
    fn mse_requires_magick() {
        let config = settings(&[("METRIC", "mse"), ("DIFF_THRESHOLD", "0.1")]);
        assert_eq!(
            AppConfig::from_settings(&config).unwrap_err(),
            ConfigError::Missing { key: "MAGICK_PATH" }
        );
    }

    #[test]
    fn metric_is_required_and_validated() {
        let config = settings(&[("MAGICK_PATH", "magick"), ("DIFF_THRESHOLD", "0.1")]);
        assert_eq!(
            AppConfig::from_settings(&config).unwrap_err(),
            ConfigError::Missing { key: "METRIC" }
        );

        let config = settings(&[("METRIC", "psnr"), ("DIFF_THRESHOLD", "0.1")]);
        assert!(matches!(
            AppConfig::from_settings(&config).unwrap_err(),
            ConfigError::Invalid { key: "METRIC", .. }
        ));
    }

    #[test]
    fn threshold_must_be_finite() {
        for bad in ["abc", "inf", "NaN"] {
            let mut pairs = mse_base();
            pairs[2] = ("DIFF_THRESHOLD", bad);
            assert!(matches!(
                AppConfig::from_settings(&settings(&pairs)).unwrap_err(),
                ConfigError::Invalid { key: "DIFF_THRESHOLD", .. }
            ));
        }
    }

    #[test]
    fn empty_values_count_as_unset() {
        let mut pairs = mse_base();
        pairs.push(("ABNORMAL_IMAGES_DIRECTORY", ""));
        pairs.push(("WORKERS", "  "));
        let config = AppConfig::from_settings(&settings(&pairs)).unwrap();
        assert_eq!(config.abnormal_images_directory, None);
        assert_eq!(config.workers, None);
    }

    #[test]
    fn partial_crop_is_rejected() {
        let mut pairs = mse_base();
        pairs.extend([("CROP_WIDTH", "100"), ("CROP_HEIGHT", "100")]);
        assert_eq!(
            AppConfig::from_settings(&settings(&pairs)).unwrap_err(),
            ConfigError::IncompleteCrop
        );
    }

    #[test]
    fn crop_values_are_validated() {
        let cases = [
            ("CROP_OFFSET_X", "-1"),
            ("CROP_OFFSET_Y", "1.5"),
            ("CROP_WIDTH", "0"),
            ("CROP_HEIGHT", "tall"),
        ];
        for (key, bad) in cases {
            let mut pairs = mse_base();
            let mut crop = vec![
                ("CROP_WIDTH", "10"),
                ("CROP_HEIGHT", "10"),
                ("CROP_OFFSET_X", "0"),
                ("CROP_OFFSET_Y", "0"),
            ];
            for entry in crop.iter_mut() {
                if entry.0 == key {
                    entry.1 = bad;
                }
            }
            pairs.extend(crop);

            let err = AppConfig::from_settings(&settings(&pairs)).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: k, .. } if k == key),
                "{key}={bad} gave {err:?}"
            );
        }
    }

    #[test]
    fn workers_and_timeout_are_parsed() {
        let mut pairs = mse_base();
        pairs.extend([("WORKERS", "3"), ("COMPARE_TIMEOUT_SECS", "30"), ("CROP_MODE", "preprocess")]);
        let config = AppConfig::from_settings(&settings(&pairs)).unwrap();
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.compare_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.crop_mode, CropMode::Preprocess);

        let mut pairs = mse_base();
        pairs.push(("WORKERS", "0"));
        assert!(AppConfig::from_settings(&settings(&pairs)).is_err());
    }

    #[test]
    fn preprocess_crop_needs_magick_even_for_ssim() {
        let config = settings(&[
            ("METRIC", "ssim"),
            ("DIFF_THRESHOLD", "0.9"),
            ("FFMPEG_PATH", "ffmpeg"),
            ("CROP_MODE", "preprocess"),
            ("CROP_WIDTH", "10"),
            ("CROP_HEIGHT", "10"),
            ("CROP_OFFSET_X", "0"),
            ("CROP_OFFSET_Y", "0"),
        ]);
        assert_eq!(
            AppConfig::from_settings(&config).unwrap_err(),
            ConfigError::Missing { key: "MAGICK_PATH" }
        );
    }
}
