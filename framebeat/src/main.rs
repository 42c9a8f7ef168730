/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::cell::Cell;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, trace, warn};

use framebeat::beat::Beat;
use framebeat::config::{ScenarioConfig, DEFAULT_DURATION_MS, DEFAULT_REFRESH_HZ};
use framebeat::frame::{BeatControl, Frame};
use framebeat::host::{Clock, FrameHost, PacedHost, SimulatedHost};
use framebeat::math::interval_for_fps;

// ── CLI argument definition ───────────────────────────────────────────────────

/// framebeat – runs frame-paced beats against a simulated or real-time host.
///
/// Example:
///   framebeat --fps 30 --refresh-hz 144 --duration-ms 2000
///   framebeat --config demos/scenario.yaml --realtime
#[derive(Debug, Parser)]
#[command(
    name = "framebeat",
    about = "Frame-paced callback scheduler simulator",
    long_about = None,
)]
struct Cli {
    /// Path to a YAML scenario file.  When absent a single beat is built from
    /// `--fps`.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Target frame rate of the single beat (ignored with --config).
    #[arg(short = 'f', long = "fps", default_value_t = 60.0)]
    fps: f64,

    /// Host refresh rate; overrides the scenario file.
    #[arg(short = 'r', long = "refresh-hz")]
    refresh_hz: Option<f64>,

    /// Run length in milliseconds; overrides the scenario file.
    #[arg(short = 'd', long = "duration-ms")]
    duration_ms: Option<f64>,

    /// Pace refreshes with wall-clock time instead of simulating them.
    #[arg(long = "realtime", default_value_t = false)]
    realtime: bool,
}

// ── Hosts ─────────────────────────────────────────────────────────────────────

/// The host every beat of a run shares.
enum Driver {
    Simulated(Rc<SimulatedHost>),
    Paced(Rc<PacedHost>),
}

impl Driver {
    fn clock(&self) -> Rc<dyn Clock> {
        match self {
            Driver::Simulated(h) => h.clone(),
            Driver::Paced(h) => h.clone(),
        }
    }

    fn frames(&self) -> Rc<dyn FrameHost> {
        match self {
            Driver::Simulated(h) => h.clone(),
            Driver::Paced(h) => h.clone(),
        }
    }

    /// Runs refreshes until host time reaches `until_ms`.  Simulated
    /// refreshes stay on the grid anchored at `origin_ms` however often the
    /// run is interrupted.
    async fn advance_to(&self, until_ms: f64, origin_ms: f64, refresh_hz: f64) -> Result<()> {
        match self {
            Driver::Simulated(h) => {
                let step_ms = interval_for_fps(refresh_hz)
                    .with_context(|| format!("invalid refresh rate {refresh_hz}"))?;
                h.run_until(until_ms, origin_ms, step_ms);
            }
            Driver::Paced(h) => {
                let period = PacedHost::refresh_period(refresh_hz)
                    .with_context(|| format!("invalid refresh rate {refresh_hz}"))?;
                let ms = until_ms - h.now();
                if ms > 0.0 {
                    h.run_for(Duration::from_secs_f64(ms / 1_000.0), period)
                        .await;
                }
            }
        }
        Ok(())
    }
}

// ── Scenario run ──────────────────────────────────────────────────────────────

struct TrackedBeat {
    name: String,
    beat: Beat,
    frames: Rc<Cell<u64>>,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Pause,
    Resume,
}

/// Outcome of one beat over a scenario run.
#[derive(Debug, Clone, PartialEq)]
struct BeatReport {
    name: String,
    target_fps: f64,
    frames: u64,
    /// Beat time (paused spans excluded) at the last accepted frame.
    time_ms: f64,
    current_fps: Option<f64>,
    /// Frames per second of unpaused host time.
    average_fps: f64,
}

async fn run_scenario(scenario: &ScenarioConfig, driver: &Driver) -> Result<Vec<BeatReport>> {
    let host = scenario.host;

    let mut tracked = Vec::with_capacity(scenario.beats.len());
    for beat_spec in scenario.beats.values() {
        let frames = Rc::new(Cell::new(0u64));
        let counter = frames.clone();
        let name = beat_spec.name.clone();
        let beat = Beat::new(
            move |frame: &Frame| {
                counter.set(counter.get() + 1);
                trace!(
                    beat = %name,
                    index = frame.index,
                    elapsed_ms = frame.elapsed_ms,
                    delta_ms = frame.delta_ms,
                    "frame"
                );
                BeatControl::Continue
            },
            beat_spec.fps,
            driver.clock(),
            driver.frames(),
        )
        .with_context(|| format!("cannot create beat '{}'", beat_spec.name))?;
        tracked.push(TrackedBeat {
            name: beat_spec.name.clone(),
            beat,
            frames,
        });
    }

    for (beat_spec, pause) in scenario
        .beats
        .values()
        .flat_map(|b| b.pauses.iter().map(move |p| (b, p)))
        .filter(|(_, p)| p.at_ms < host.duration_ms && p.end_ms() >= host.duration_ms)
    {
        debug!(
            beat = %beat_spec.name,
            at_ms = pause.at_ms,
            end_ms = pause.end_ms(),
            "pause outlasts the run; beat stays paused at the end"
        );
    }

    // Pause/resume events across all beats, in host-time order
    let mut events: Vec<(f64, usize, Action)> = scenario
        .beats
        .values()
        .enumerate()
        .flat_map(|(idx, beat_spec)| {
            beat_spec.pauses.iter().flat_map(move |p| {
                [(p.at_ms, idx, Action::Pause), (p.end_ms(), idx, Action::Resume)]
            })
        })
        .filter(|(at, _, _)| *at < host.duration_ms)
        .collect();
    events.sort_by(|a, b| a.0.total_cmp(&b.0));

    let origin_ms = driver.clock().now();
    for t in &tracked {
        t.beat.start()?;
        info!(beat = %t.name, fps = t.beat.fps(), "beat started");
    }

    for (at_ms, idx, action) in events {
        driver
            .advance_to(origin_ms + at_ms, origin_ms, host.refresh_hz)
            .await?;

        let t = &tracked[idx];
        match action {
            Action::Pause => t.beat.pause(),
            Action::Resume => t.beat.resume(),
        }
        info!(beat = %t.name, at_ms, ?action, frames = t.frames.get(), "pause window");
    }
    driver
        .advance_to(origin_ms + host.duration_ms, origin_ms, host.refresh_hz)
        .await?;

    let mut reports = Vec::with_capacity(tracked.len());
    for (t, beat_spec) in tracked.iter().zip(scenario.beats.values()) {
        t.beat.stop();
        let running_ms = host.duration_ms - beat_spec.paused_ms_within(host.duration_ms);
        let average_fps = if running_ms > 0.0 {
            t.frames.get() as f64 * 1_000.0 / running_ms
        } else {
            0.0
        };
        let report = BeatReport {
            name: t.name.clone(),
            target_fps: beat_spec.fps,
            frames: t.frames.get(),
            time_ms: t.beat.time(),
            current_fps: t.beat.current_fps(),
            average_fps,
        };
        info!(
            beat = %report.name,
            target_fps = report.target_fps,
            frames = report.frames,
            average_fps = report.average_fps,
            last_fps = ?report.current_fps,
            beat_time_ms = report.time_ms,
            "beat finished"
        );
        if report.frames == 0 {
            warn!(beat = %report.name, "beat produced no frames");
        }
        reports.push(report);
    }

    Ok(reports)
}

fn build_scenario(cli: &Cli) -> Result<ScenarioConfig> {
    let mut scenario = match &cli.config {
        Some(path) => ScenarioConfig::load_from_file(path)?,
        None => ScenarioConfig::single(cli.fps, DEFAULT_REFRESH_HZ, DEFAULT_DURATION_MS),
    };
    if let Some(hz) = cli.refresh_hz {
        scenario.host.refresh_hz = hz;
    }
    if let Some(ms) = cli.duration_ms {
        scenario.host.duration_ms = ms;
    }
    scenario.validate()?;
    Ok(scenario)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=framebeat=trace).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config = ?cli.config,
        fps = cli.fps,
        refresh_hz = ?cli.refresh_hz,
        duration_ms = ?cli.duration_ms,
        realtime = cli.realtime,
        "Configuration"
    );

    let scenario = match build_scenario(&cli) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to build scenario: {:#}", e);
            process::exit(1);
        }
    };

    let driver = if cli.realtime {
        Driver::Paced(Rc::new(PacedHost::new()))
    } else {
        Driver::Simulated(Rc::new(SimulatedHost::new()))
    };

    info!(
        refresh_hz = scenario.host.refresh_hz,
        duration_ms = scenario.host.duration_ms,
        beats = scenario.beats.len(),
        realtime = cli.realtime,
        "Running scenario"
    );

    if let Err(e) = run_scenario(&scenario, &driver).await {
        error!("Scenario failed: {:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli::parse_from([
            "framebeat",
            "--fps",
            "30",
            "--refresh-hz",
            "144",
            "--duration-ms",
            "500",
        ]);
        let scenario = build_scenario(&cli).unwrap();
        assert_eq!(scenario.host.refresh_hz, 144.0);
        assert_eq!(scenario.host.duration_ms, 500.0);
        assert_eq!(scenario.beats.values().next().unwrap().fps, 30.0);
    }

    #[test]
    fn invalid_refresh_flag_is_rejected() {
        let cli = Cli::parse_from(["framebeat", "--refresh-hz", "0"]);
        assert!(build_scenario(&cli).is_err());
    }

    async fn run_simulated(yaml: &str) -> (Rc<SimulatedHost>, Vec<BeatReport>) {
        let scenario = ScenarioConfig::from_yaml_str(yaml).unwrap();
        let host = Rc::new(SimulatedHost::new());
        let reports = run_scenario(&scenario, &Driver::Simulated(host.clone()))
            .await
            .unwrap();
        (host, reports)
    }

    #[tokio::test]
    async fn simulated_scenario_runs_every_beat() {
        let (host, reports) = run_simulated(
            r#"
host: {refresh_hz: 100, duration_ms: 1000}
beats:
  fast: {fps: 50}
  slow:
    fps: 20
    pauses:
      - {at_ms: 250, for_ms: 500}
"#,
        )
        .await;

        assert!((host.now() - 1_000.0).abs() < 1e-6, "now = {}", host.now());
        assert_eq!(host.pending_frames(), 0, "every beat must be stopped");
        assert_eq!(host.ticks(), 100);

        let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["fast", "slow"]);

        let fast = &reports[0];
        assert!((48..=50).contains(&fast.frames), "fast: {fast:?}");
        assert!(fast.time_ms <= 1_000.0 + 1e-6);

        // 500 ms of unpaused time at 20 fps
        let slow = &reports[1];
        assert!((8..=10).contains(&slow.frames), "slow: {slow:?}");
        assert!(slow.time_ms <= 500.0 + 1e-6, "slow: {slow:?}");
        assert!(slow.average_fps <= 20.0 + 1e-9);
    }

    #[tokio::test]
    async fn sibling_pause_keeps_refresh_cadence() {
        let alone = "host: {refresh_hz: 60, duration_ms: 1000}\nbeats:\n  a: {fps: 60}\n";
        let with_sibling = r#"
host: {refresh_hz: 60, duration_ms: 1000}
beats:
  a: {fps: 60}
  b:
    fps: 60
    pauses:
      - {at_ms: 110, for_ms: 10}
"#;

        let (host_alone, reports_alone) = run_simulated(alone).await;
        let (host_shared, reports_shared) = run_simulated(with_sibling).await;

        assert_eq!(host_alone.ticks(), 60);
        assert_eq!(host_shared.ticks(), host_alone.ticks());
        assert_eq!(reports_shared[0].name, "a");
        assert_eq!(reports_shared[0].frames, reports_alone[0].frames);
    }

    #[tokio::test]
    async fn pause_past_end_leaves_beat_paused() {
        let (_, reports) = run_simulated(
            r#"
host: {refresh_hz: 100, duration_ms: 1000}
beats:
  late:
    fps: 20
    pauses:
      - {at_ms: 500, for_ms: 2000}
"#,
        )
        .await;

        let late = &reports[0];
        assert!((8..=10).contains(&late.frames), "late: {late:?}");
        assert!(late.time_ms <= 500.0 + 1e-6, "late: {late:?}");
    }
}
