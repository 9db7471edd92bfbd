use crate::error::{OrreryError, OrreryResult};
use crate::model::{default_bodies, CelestialBody};
use crate::sim::{Knobs, DEFAULT_Z_AMPLITUDE};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

pub(crate) const SPEED_RANGE: (f64, f64) = (0.01, 0.1);
pub(crate) const SIZE_RANGE: (f64, f64) = (0.5, 3.0);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CameraSettings {
    pub(crate) elevation_deg: f64,
    pub(crate) spin_deg_per_frame: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            elevation_deg: 30.0,
            spin_deg_per_frame: 0.3,
        }
    }
}

/// On-disk settings. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    /// Overrides every body's angular speed when set.
    pub(crate) speed: Option<f64>,
    pub(crate) show_trails: bool,
    pub(crate) size_multiplier: f64,
    pub(crate) max_trail_length: i64,
    pub(crate) frame_step: f64,
    pub(crate) z_amplitude: f64,
    pub(crate) fps_cap: u32,
    pub(crate) camera: CameraSettings,
    pub(crate) bodies: Vec<CelestialBody>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed: None,
            show_trails: true,
            size_multiplier: 1.0,
            max_trail_length: 150,
            frame_step: 2.0,
            z_amplitude: DEFAULT_Z_AMPLITUDE,
            fps_cap: 20,
            camera: CameraSettings::default(),
            bodies: default_bodies(),
        }
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Clone, Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) speed: Option<f64>,
    pub(crate) hide_trails: bool,
    pub(crate) size_multiplier: Option<f64>,
    pub(crate) max_trail_length: Option<i64>,
    pub(crate) frame_step: Option<f64>,
    pub(crate) z_amplitude: Option<f64>,
    pub(crate) fps_cap: Option<u32>,
    pub(crate) elevation_deg: Option<f64>,
}

/// Validated configuration handed to the simulation and front ends.
#[derive(Clone, Debug)]
pub(crate) struct SimConfig {
    pub(crate) bodies: Vec<CelestialBody>,
    pub(crate) knobs: Knobs,
    pub(crate) z_amplitude: f64,
    pub(crate) fps_cap: u32,
    pub(crate) camera: CameraSettings,
}

impl Settings {
    pub(crate) fn apply(&mut self, o: &Overrides) {
        if o.speed.is_some() {
            self.speed = o.speed;
        }
        if o.hide_trails {
            self.show_trails = false;
        }
        if let Some(v) = o.size_multiplier {
            self.size_multiplier = v;
        }
        if let Some(v) = o.max_trail_length {
            self.max_trail_length = v;
        }
        if let Some(v) = o.frame_step {
            self.frame_step = v;
        }
        if let Some(v) = o.z_amplitude {
            self.z_amplitude = v;
        }
        if let Some(v) = o.fps_cap {
            self.fps_cap = v;
        }
        if let Some(v) = o.elevation_deg {
            self.camera.elevation_deg = v;
        }
    }

    pub(crate) fn validate(&self) -> OrreryResult<SimConfig> {
        if self.max_trail_length < 0 {
            return Err(OrreryError::invalid(
                "max_trail_length",
                format!("must be >= 0, got {}", self.max_trail_length),
            ));
        }
        if let Some(s) = self.speed {
            positive("speed", s)?;
        }
        positive("size_multiplier", self.size_multiplier)?;
        positive("frame_step", self.frame_step)?;
        if !self.z_amplitude.is_finite() || self.z_amplitude < 0.0 {
            return Err(OrreryError::invalid(
                "z_amplitude",
                format!("must be finite and >= 0, got {}", self.z_amplitude),
            ));
        }
        finite("camera.elevation_deg", self.camera.elevation_deg)?;
        finite("camera.spin_deg_per_frame", self.camera.spin_deg_per_frame)?;

        if self.bodies.is_empty() {
            return Err(OrreryError::invalid("bodies", "at least one body is required"));
        }
        let mut seen = HashSet::new();
        for b in &self.bodies {
            if b.name.trim().is_empty() {
                return Err(OrreryError::invalid("bodies.name", "name must not be empty"));
            }
            if !seen.insert(b.name.as_str()) {
                return Err(OrreryError::invalid(
                    "bodies.name",
                    format!("duplicate body name '{}'", b.name),
                ));
            }
            positive(&format!("{}.semi_major_axis", b.name), b.semi_major_axis)?;
            positive(&format!("{}.semi_minor_axis", b.name), b.semi_minor_axis)?;
            positive(&format!("{}.display_size", b.name), b.display_size)?;
            positive(&format!("{}.angular_speed", b.name), b.angular_speed)?;
        }

        Ok(SimConfig {
            bodies: self.bodies.clone(),
            knobs: Knobs {
                speed: self.speed,
                show_trails: self.show_trails,
                size_multiplier: self.size_multiplier,
                max_trail_length: self.max_trail_length as usize,
                frame_step: self.frame_step,
            },
            z_amplitude: self.z_amplitude,
            fps_cap: self.fps_cap.clamp(10, 120),
            camera: self.camera.clone(),
        })
    }
}

fn positive(field: &str, v: f64) -> OrreryResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(OrreryError::invalid(field, format!("must be a positive number, got {v}")))
    }
}

fn finite(field: &str, v: f64) -> OrreryResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(OrreryError::invalid(field, format!("must be finite, got {v}")))
    }
}

pub(crate) fn default_settings_path() -> OrreryResult<PathBuf> {
    let proj = ProjectDirs::from("com", "solarsystem", "SolarSystem").ok_or(OrreryError::NoConfigDir)?;
    Ok(proj.config_dir().join("settings.json"))
}

pub(crate) fn load_settings(path: &Path) -> OrreryResult<Settings> {
    let s = fs::read_to_string(path).map_err(|e| OrreryError::io(path, e))?;
    serde_json::from_str::<Settings>(&s).map_err(|source| OrreryError::Settings {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load_settings`], but a missing file yields the defaults.
pub(crate) fn load_settings_or_default(path: &Path) -> OrreryResult<Settings> {
    match load_settings(path) {
        Err(OrreryError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Settings::default())
        }
        other => other,
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> OrreryResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| OrreryError::io(dir, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s).map_err(|source| OrreryError::Settings {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(&tmp, data).map_err(|e| OrreryError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| OrreryError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = Settings::default().validate().unwrap();
        assert_eq!(cfg.bodies.len(), 8);
        assert_eq!(cfg.knobs.max_trail_length, 150);
        assert!(cfg.knobs.show_trails);
        assert_eq!(cfg.knobs.speed, None);
        assert_eq!(cfg.fps_cap, 20);
    }

    #[test]
    fn negative_trail_length_is_rejected() {
        let s = Settings {
            max_trail_length: -1,
            ..Settings::default()
        };
        match s.validate() {
            Err(OrreryError::InvalidConfiguration { field, .. }) => {
                assert_eq!(field, "max_trail_length")
            }
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn zero_trail_length_is_allowed() {
        let s = Settings {
            max_trail_length: 0,
            ..Settings::default()
        };
        assert_eq!(s.validate().unwrap().knobs.max_trail_length, 0);
    }

    #[test]
    fn non_positive_speed_override_is_rejected() {
        for bad in [0.0, -0.02, f64::NAN, f64::INFINITY] {
            let s = Settings {
                speed: Some(bad),
                ..Settings::default()
            };
            assert_eq!(rejected_field(&s), "speed", "speed {bad}");
        }
    }

    fn rejected_field(s: &Settings) -> String {
        match s.validate() {
            Err(OrreryError::InvalidConfiguration { field, .. }) => field,
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn bad_scalar_knobs_are_rejected_by_field() {
        let cases: Vec<(&str, Settings)> = vec![
            ("z_amplitude", Settings { z_amplitude: -0.01, ..Settings::default() }),
            ("z_amplitude", Settings { z_amplitude: f64::NAN, ..Settings::default() }),
            ("z_amplitude", Settings { z_amplitude: f64::INFINITY, ..Settings::default() }),
            ("frame_step", Settings { frame_step: 0.0, ..Settings::default() }),
            ("frame_step", Settings { frame_step: -2.0, ..Settings::default() }),
            ("size_multiplier", Settings { size_multiplier: 0.0, ..Settings::default() }),
            ("size_multiplier", Settings { size_multiplier: -1.0, ..Settings::default() }),
            ("size_multiplier", Settings { size_multiplier: f64::NAN, ..Settings::default() }),
        ];
        for (field, s) in &cases {
            assert_eq!(rejected_field(s), *field, "{s:?}");
        }
    }

    #[test]
    fn flat_orbits_are_allowed() {
        let s = Settings {
            z_amplitude: 0.0,
            ..Settings::default()
        };
        assert_eq!(s.validate().unwrap().z_amplitude, 0.0);
    }

    #[test]
    fn blank_body_names_are_rejected() {
        for name in ["", "   ", "\t"] {
            let mut s = Settings::default();
            s.bodies[3].name = name.to_string();
            assert_eq!(rejected_field(&s), "bodies.name", "name {name:?}");
        }
    }

    #[test]
    fn duplicate_body_names_are_rejected() {
        let mut s = Settings::default();
        let dup = s.bodies[2].clone();
        s.bodies.push(dup);
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate body name 'Earth'"));
    }

    #[test]
    fn bad_body_geometry_is_rejected() {
        let mut s = Settings::default();
        s.bodies[0].semi_minor_axis = 0.0;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("Mercury.semi_minor_axis"));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let s = Settings {
            bodies: Vec::new(),
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let mut s = Settings::default();
        s.apply(&Overrides {
            speed: Some(0.05),
            hide_trails: true,
            max_trail_length: Some(12),
            fps_cap: Some(500),
            ..Overrides::default()
        });
        let cfg = s.validate().unwrap();
        assert_eq!(cfg.knobs.speed, Some(0.05));
        assert!(!cfg.knobs.show_trails);
        assert_eq!(cfg.knobs.max_trail_length, 12);
        assert_eq!(cfg.fps_cap, 120);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "max_trail_length": 40, "camera": { "elevation_deg": 60 } }"#).unwrap();
        let s = load_settings(&path).unwrap();
        assert_eq!(s.max_trail_length, 40);
        assert_eq!(s.camera.elevation_deg, 60.0);
        assert_eq!(s.camera.spin_deg_per_frame, 0.3);
        assert_eq!(s.bodies, default_bodies());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_settings_or_default(&path),
            Err(OrreryError::Settings { .. })
        ));
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let s = Settings {
            speed: Some(0.03),
            size_multiplier: 2.0,
            ..Settings::default()
        };
        save_settings_atomic(&path, &s).unwrap();
        assert_eq!(load_settings(&path).unwrap(), s);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
