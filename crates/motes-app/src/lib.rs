//! Headless frame driver for the motes engine.
//!
//! Stands in for a browser-style host: a [`ManualScheduler`] hands out frame
//! requests, frames are delivered with simulated timestamps, and draws land in
//! a [`RecordingSurface`].

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use motes_core::{ManualScheduler, MotesConfig, MotesEngine, RecordingSurface};
use serde::Serialize;
use tracing::{debug, info, warn};

/// A surface coordinate given on the command line as `x,y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl FromStr for Point {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f32>()
                .map_err(|err| format!("invalid coordinate `{}`: {err}", part.trim()))
        };
        Ok(Self {
            x: parse(x)?,
            y: parse(y)?,
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// How a headless run is driven.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub width: f32,
    pub height: f32,
    /// Frame callbacks to deliver, including the baseline frame.
    pub frames: u64,
    pub fps: f64,
    /// Clicks spread evenly across the run.
    pub clicks: Vec<Point>,
    /// Pointer held over the surface for the whole run.
    pub pointer: Option<Point>,
    /// Log a progress line every this many ticks; 0 disables it.
    pub report_every: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            frames: 600,
            fps: 60.0,
            clicks: Vec::new(),
            pointer: None,
            report_every: 60,
        }
    }
}

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub ticks: u64,
    pub particles: usize,
    pub links_last_tick: usize,
    pub draws_last_tick: usize,
    pub assets_ready: bool,
}

/// Frame at which each click lands, spread evenly between the first and last frame.
fn click_schedule(frames: u64, clicks: usize) -> Vec<u64> {
    let slots = clicks as u64 + 1;
    (1..=clicks as u64).map(|i| i * frames / slots).collect()
}

/// Drive an engine for `options.frames` frames and destroy it.
pub fn run_headless(config: MotesConfig, options: &RunOptions) -> Result<RunSummary> {
    if !options.fps.is_finite() || options.fps <= 0.0 {
        bail!("fps must be a positive number, got {}", options.fps);
    }
    info!(
        detect_on = ?config.interactivity.detect_on,
        width = options.width,
        height = options.height,
        frames = options.frames,
        fps = options.fps,
        "starting headless run"
    );

    let mut engine = MotesEngine::new(
        config,
        RecordingSurface::new(options.width, options.height),
        ManualScheduler::new(),
    )
    .context("failed to build engine")?;
    engine.on_assets_ready(|| info!("particle assets ready"));
    if let Some(pointer) = options.pointer {
        engine.pointer_move(pointer.x, pointer.y);
    }

    let interval_ms = 1000.0 / options.fps;
    let schedule = click_schedule(options.frames, options.clicks.len());
    let mut clicks = schedule.iter().zip(&options.clicks).peekable();
    let mut summary = RunSummary {
        frames: 0,
        ticks: 0,
        particles: engine.particles().len(),
        links_last_tick: 0,
        draws_last_tick: 0,
        assets_ready: false,
    };

    for frame in 0..options.frames {
        if engine.scheduler_mut().take_pending().is_none() {
            warn!(frame, "engine stopped requesting frames");
            break;
        }
        while let Some((_, point)) = clicks.next_if(|(at, _)| **at <= frame) {
            debug!(frame, %point, "click");
            engine.click(point.x, point.y);
        }
        let timestamp_ms = frame as f64 * interval_ms;
        summary.frames += 1;
        if let Some(report) = engine.on_frame(timestamp_ms) {
            summary.ticks = report.tick.0;
            summary.links_last_tick = report.links;
            if options.report_every > 0 && report.tick.0 % options.report_every == 0 {
                info!(
                    tick = report.tick.0,
                    particles = report.particles,
                    links = report.links,
                    delta = report.delta,
                    "progress"
                );
            }
        }
    }

    summary.particles = engine.particles().len();
    summary.draws_last_tick = engine.surface().commands().len();
    summary.assets_ready = engine.assets_ready();
    engine.destroy();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motes_core::config::ClickMode;

    fn small_config(count: u32) -> MotesConfig {
        let mut config = MotesConfig::default();
        config.rng_seed = Some(42);
        config.particles.number.value = count;
        config.particles.number.density.enable = false;
        config
    }

    #[test]
    fn points_parse_from_pairs() {
        assert_eq!(
            "12.5, 40".parse::<Point>(),
            Ok(Point { x: 12.5, y: 40.0 })
        );
        assert!("12".parse::<Point>().is_err());
        assert!("a,b".parse::<Point>().is_err());
    }

    #[test]
    fn clicks_are_spread_across_the_run() {
        assert_eq!(click_schedule(100, 3), vec![25, 50, 75]);
        assert!(click_schedule(100, 0).is_empty());
    }

    #[test]
    fn headless_run_ticks_after_the_baseline_frame() {
        let options = RunOptions {
            width: 320.0,
            height: 240.0,
            frames: 30,
            report_every: 0,
            ..RunOptions::default()
        };
        let summary = run_headless(small_config(15), &options).expect("run");
        assert_eq!(summary.frames, 30);
        assert_eq!(summary.ticks, 29);
        assert_eq!(summary.particles, 15);
        assert_eq!(summary.draws_last_tick, 15);
        assert!(summary.assets_ready);
    }

    #[test]
    fn push_clicks_grow_the_population() {
        let mut config = small_config(10);
        config.interactivity.events.on_click.mode = ClickMode::Push;
        config.interactivity.modes.push.quantity = 4;
        let options = RunOptions {
            frames: 20,
            clicks: vec![Point { x: 5.0, y: 5.0 }, Point { x: 50.0, y: 50.0 }],
            report_every: 0,
            ..RunOptions::default()
        };
        let summary = run_headless(config, &options).expect("run");
        assert_eq!(summary.particles, 18);
    }

    #[test]
    fn rejects_non_positive_fps() {
        let options = RunOptions {
            fps: 0.0,
            ..RunOptions::default()
        };
        assert!(run_headless(small_config(1), &options).is_err());
    }
}
