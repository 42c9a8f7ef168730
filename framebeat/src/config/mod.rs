/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scenario configuration for the `framebeat` simulator.
//!
//! A scenario describes one host (refresh rate, run length) and any number of
//! named beats sharing it, each with an optional list of pause windows.
//!
//! The expected YAML structure is:
//! ```yaml
//! host:
//!   refresh_hz: 144
//!   duration_ms: 2000
//! beats:
//!   render:
//!     fps: 60
//!   physics:
//!     fps: 30
//!     pauses:
//!       - at_ms: 500
//!         for_ms: 250
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::beat::DEFAULT_FPS;

/// Refresh rate used when the `host` section omits it.
pub const DEFAULT_REFRESH_HZ: f64 = 60.0;

/// Run length used when the `host` section omits it.
pub const DEFAULT_DURATION_MS: f64 = 1_000.0;

/// Name of the beat inserted when a scenario defines none.
pub const DEFAULT_BEAT_NAME: &str = "default";

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    host: Option<HostEntry>,
    #[serde(default)]
    beats: HashMap<String, BeatEntry>,
}

#[derive(Debug, Deserialize)]
struct HostEntry {
    #[serde(default = "default_refresh_hz")]
    refresh_hz: f64,
    #[serde(default = "default_duration_ms")]
    duration_ms: f64,
}

#[derive(Debug, Deserialize)]
struct BeatEntry {
    #[serde(default = "default_fps")]
    fps: f64,
    #[serde(default)]
    pauses: Vec<PauseEntry>,
}

#[derive(Debug, Deserialize)]
struct PauseEntry {
    at_ms: f64,
    for_ms: f64,
}

fn default_refresh_hz() -> f64 {
    DEFAULT_REFRESH_HZ
}

fn default_duration_ms() -> f64 {
    DEFAULT_DURATION_MS
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

// ── Public data structures ────────────────────────────────────────────────────

/// Display refresh simulated for the whole scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSpec {
    pub refresh_hz: f64,
    pub duration_ms: f64,
}

impl Default for HostSpec {
    fn default() -> Self {
        Self {
            refresh_hz: DEFAULT_REFRESH_HZ,
            duration_ms: DEFAULT_DURATION_MS,
        }
    }
}

/// A window during which a beat is paused, in host milliseconds from the
/// start of the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseWindow {
    pub at_ms: f64,
    pub for_ms: f64,
}

impl PauseWindow {
    pub fn end_ms(&self) -> f64 {
        self.at_ms + self.for_ms
    }
}

/// One beat to run in the scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatSpec {
    pub name: String,
    pub fps: f64,
    /// Sorted by `at_ms`.
    pub pauses: Vec<PauseWindow>,
}

impl BeatSpec {
    pub fn new(name: impl Into<String>, fps: f64) -> Self {
        Self {
            name: name.into(),
            fps,
            pauses: Vec::new(),
        }
    }

    /// Total paused milliseconds, clipped to the run length.
    pub fn paused_ms_within(&self, duration_ms: f64) -> f64 {
        self.pauses
            .iter()
            .map(|p| (p.end_ms().min(duration_ms) - p.at_ms).max(0.0))
            .sum()
    }
}

/// A fully parsed and validated scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub host: HostSpec,
    /// Keyed by beat name; `BTreeMap` so runs and reports are ordered.
    pub beats: BTreeMap<String, BeatSpec>,
}

impl ScenarioConfig {
    /// One beat on one host, as used when no scenario file is supplied.
    pub fn single(fps: f64, refresh_hz: f64, duration_ms: f64) -> Self {
        let mut beats = BTreeMap::new();
        beats.insert(
            DEFAULT_BEAT_NAME.to_string(),
            BeatSpec::new(DEFAULT_BEAT_NAME, fps),
        );
        Self {
            host: HostSpec {
                refresh_hz,
                duration_ms,
            },
            beats,
        }
    }

    /// Parses `path` and validates the result.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is structurally
    /// invalid, or a value fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading scenario from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open scenario file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid scenario file: {}", path.display()))
    }

    /// Parses a scenario from YAML text and validates it.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ScenarioFile =
            serde_yaml::from_str(content).context("Failed to parse scenario YAML")?;

        let host = file
            .host
            .map(|h| HostSpec {
                refresh_hz: h.refresh_hz,
                duration_ms: h.duration_ms,
            })
            .unwrap_or_default();

        let mut beats = BTreeMap::new();
        for (name, entry) in file.beats {
            let mut pauses: Vec<PauseWindow> = entry
                .pauses
                .into_iter()
                .map(|p| PauseWindow {
                    at_ms: p.at_ms,
                    for_ms: p.for_ms,
                })
                .collect();
            pauses.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));

            debug!(
                "  Beat: {} | fps: {} | pauses: {}",
                name,
                entry.fps,
                pauses.len()
            );

            beats.insert(
                name.clone(),
                BeatSpec {
                    name,
                    fps: entry.fps,
                    pauses,
                },
            );
        }

        // Fallback: no beats parsed → insert a default one
        if beats.is_empty() {
            warn!("No beats found in scenario, using a single {DEFAULT_FPS} fps beat");
            beats.insert(
                DEFAULT_BEAT_NAME.to_string(),
                BeatSpec::new(DEFAULT_BEAT_NAME, DEFAULT_FPS),
            );
        }

        let config = Self { host, beats };
        config.validate()?;

        info!(
            refresh_hz = config.host.refresh_hz,
            duration_ms = config.host.duration_ms,
            beat_count = config.beats.len(),
            "Scenario loaded"
        );
        Ok(config)
    }

    /// Checks every numeric field.
    ///
    /// # Errors
    /// Non-positive or non-finite `refresh_hz`, `duration_ms` or `fps`;
    /// negative or non-finite pause offsets and lengths; overlapping pauses.
    pub fn validate(&self) -> Result<()> {
        if !is_positive(self.host.refresh_hz) {
            bail!(
                "host.refresh_hz must be greater than zero (got {})",
                self.host.refresh_hz
            );
        }
        if !is_positive(self.host.duration_ms) {
            bail!(
                "host.duration_ms must be greater than zero (got {})",
                self.host.duration_ms
            );
        }

        for beat in self.beats.values() {
            if !is_positive(beat.fps) {
                bail!("beat '{}': fps must be greater than zero (got {})", beat.name, beat.fps);
            }
            for pause in &beat.pauses {
                if !(pause.at_ms.is_finite() && pause.at_ms >= 0.0) {
                    bail!("beat '{}': pause at_ms must be >= 0 (got {})", beat.name, pause.at_ms);
                }
                if !(pause.for_ms.is_finite() && pause.for_ms >= 0.0) {
                    bail!("beat '{}': pause for_ms must be >= 0 (got {})", beat.name, pause.for_ms);
                }
            }
            for pair in beat.pauses.windows(2) {
                if pair[1].at_ms < pair[0].end_ms() {
                    bail!(
                        "beat '{}': pause at {}ms overlaps the pause ending at {}ms",
                        beat.name,
                        pair[1].at_ms,
                        pair[0].end_ms()
                    );
                }
            }
        }

        Ok(())
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::single(DEFAULT_FPS, DEFAULT_REFRESH_HZ, DEFAULT_DURATION_MS)
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_full_scenario() {
        let yaml = r#"
host:
  refresh_hz: 144
  duration_ms: 2000
beats:
  render:
    fps: 60
  physics:
    fps: 30
    pauses:
      - at_ms: 900
        for_ms: 100
      - at_ms: 500
        for_ms: 250
"#;
        let f = yaml_tempfile(yaml);
        let cfg = ScenarioConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.host.refresh_hz, 144.0);
        assert_eq!(cfg.host.duration_ms, 2_000.0);
        assert_eq!(cfg.beats.len(), 2);

        let render = &cfg.beats["render"];
        assert_eq!(render.name, "render");
        assert_eq!(render.fps, 60.0);
        assert!(render.pauses.is_empty());

        let physics = &cfg.beats["physics"];
        assert_eq!(physics.fps, 30.0);
        // sorted by start
        assert_eq!(
            physics.pauses,
            vec![
                PauseWindow { at_ms: 500.0, for_ms: 250.0 },
                PauseWindow { at_ms: 900.0, for_ms: 100.0 },
            ]
        );
    }

    #[test]
    fn beats_iterate_in_name_order() {
        let yaml = "beats:\n  zeta: {fps: 10}\n  alpha: {fps: 20}\n  mid: {fps: 30}\n";
        let cfg = ScenarioConfig::from_yaml_str(yaml).unwrap();
        let names: Vec<_> = cfg.beats.keys().cloned().collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn optional_fields_use_defaults_when_absent() {
        let yaml = "host:\n  refresh_hz: 120\nbeats:\n  ui: {}\n";
        let cfg = ScenarioConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.host.refresh_hz, 120.0);
        assert_eq!(cfg.host.duration_ms, DEFAULT_DURATION_MS);
        assert_eq!(cfg.beats["ui"].fps, DEFAULT_FPS);
    }

    #[test]
    fn empty_scenario_inserts_default_beat() {
        let cfg = ScenarioConfig::from_yaml_str("{}\n").unwrap();
        assert_eq!(cfg.host, HostSpec::default());
        assert_eq!(cfg.beats.len(), 1);
        assert_eq!(cfg.beats[DEFAULT_BEAT_NAME].fps, DEFAULT_FPS);
        assert_eq!(cfg, ScenarioConfig::default());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = ScenarioConfig::load_from_file(Path::new("/nonexistent/path/scenario.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(ScenarioConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn zero_fps_is_rejected() {
        let err = ScenarioConfig::from_yaml_str("beats:\n  bad: {fps: 0}\n").unwrap_err();
        assert!(err.to_string().contains("fps"), "got: {err:#}");
    }

    #[test]
    fn negative_refresh_is_rejected() {
        let err = ScenarioConfig::from_yaml_str("host:\n  refresh_hz: -60\n").unwrap_err();
        assert!(err.to_string().contains("refresh_hz"), "got: {err:#}");
    }

    #[test]
    fn negative_pause_is_rejected() {
        let yaml = "beats:\n  b:\n    pauses:\n      - {at_ms: -1, for_ms: 10}\n";
        assert!(ScenarioConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn negative_pause_length_is_rejected() {
        let yaml = "beats:\n  b:\n    pauses:\n      - {at_ms: 100, for_ms: -5}\n";
        let err = ScenarioConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("for_ms"), "got: {err:#}");
    }

    #[test]
    fn non_finite_duration_is_rejected() {
        for bad in [f64::INFINITY, f64::NAN, 0.0] {
            let mut config = ScenarioConfig::default();
            config.host.duration_ms = bad;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("duration_ms"), "got: {err:#}");
        }
    }

    #[test]
    fn overlapping_pauses_are_rejected() {
        let yaml = r#"
beats:
  b:
    pauses:
      - {at_ms: 100, for_ms: 200}
      - {at_ms: 250, for_ms: 10}
"#;
        let err = ScenarioConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("overlaps"), "got: {err:#}");
    }

    #[test]
    fn paused_ms_is_clipped_to_run_length() {
        let mut beat = BeatSpec::new("b", 60.0);
        beat.pauses = vec![
            PauseWindow { at_ms: 100.0, for_ms: 100.0 },
            PauseWindow { at_ms: 900.0, for_ms: 500.0 },
            PauseWindow { at_ms: 1_500.0, for_ms: 10.0 },
        ];
        assert_eq!(beat.paused_ms_within(1_000.0), 200.0);
    }
}
