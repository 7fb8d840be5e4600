//! Frame-driven simulation engine: lifecycle, timing, population, and the tick pipeline.

use std::sync::Arc;

use motes_index::{Boundary, IndexError, NeighborhoodIndex, QuadTree};
use rand::Rng;
use rand::rngs::SmallRng;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::assets::{AssetHandle, AssetLoader, AssetReadiness, ParticleImage};
use crate::config::{ClickMode, ConfigError, MotesConfig, NumberConfig, Preset, ShapeKind};
use crate::interaction::{self, ClickBurst, PointerState};
use crate::particle::{DepthSprites, Particle};
use crate::physics;
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::surface::{DrawSurface, SpriteRequest};

/// Nominal frame length at 60 ticks per second, in milliseconds.
pub const FRAME_MS: f64 = 1000.0 / 60.0;

/// Elapsed times above this are treated as a stalled clock.
pub const STALL_THRESHOLD_MS: f64 = 100.0;

/// Ceiling on the population produced at initialisation.
pub const MAX_PARTICLES: usize = 2000;

/// Errors that can occur when constructing or resizing an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid drawing surface: {0}")]
    InvalidSurface(#[from] IndexError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed; the first frame has not arrived yet.
    Idle,
    Running,
    /// Terminal.
    Destroyed,
}

/// Monotonic simulation tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u64);

impl Tick {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Summary of one completed tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    pub delta: f32,
    pub particles: usize,
    /// Grab links drawn this tick.
    pub links: usize,
}

/// Population for a canvas of `width` x `height`, capped at [`MAX_PARTICLES`].
#[must_use]
pub fn population_size(number: &NumberConfig, width: f32, height: f32) -> usize {
    let raw = if number.density.enable {
        let area = f64::from(width) * f64::from(height);
        let per_unit = f64::from(number.density.value_area).max(0.001) * 1000.0;
        // Saturating cast: negative and NaN become 0.
        (area / per_unit * f64::from(number.value)).floor() as usize
    } else {
        number.value as usize
    };
    raw.min(MAX_PARTICLES)
}

fn is_stalled(elapsed_ms: f64) -> bool {
    !elapsed_ms.is_finite() || elapsed_ms < 0.0 || elapsed_ms > STALL_THRESHOLD_MS
}

/// Time-normalisation factor for `elapsed_ms`, substituting one nominal frame for stalls.
#[must_use]
pub fn frame_delta(elapsed_ms: f64) -> f32 {
    let elapsed = if is_stalled(elapsed_ms) {
        FRAME_MS
    } else {
        elapsed_ms
    };
    (elapsed / FRAME_MS) as f32
}

fn surface_bounds(surface: &dyn DrawSurface) -> Result<Boundary, EngineError> {
    let bounds = Boundary::new(0.0, 0.0, surface.width(), surface.height());
    bounds.validate()?;
    Ok(bounds)
}

/// Particle simulation bound to one drawing surface and one frame scheduler.
pub struct MotesEngine<S: DrawSurface, H: FrameScheduler> {
    config: Arc<MotesConfig>,
    surface: S,
    scheduler: H,
    loader: Option<Box<dyn AssetLoader>>,
    rng: SmallRng,
    particles: Vec<Particle>,
    index: QuadTree,
    positions: Vec<(f32, f32)>,
    bounds: Boundary,
    pointer: PointerState,
    bursts: Vec<ClickBurst>,
    readiness: AssetReadiness,
    state: EngineState,
    tick: Tick,
    last_frame_ms: Option<f64>,
    pending_frame: Option<FrameHandle>,
}

impl<S: DrawSurface, H: FrameScheduler> MotesEngine<S, H> {
    /// Build an engine, populate it for the surface, and request the first frame.
    pub fn new(
        config: impl Into<Arc<MotesConfig>>,
        surface: S,
        scheduler: H,
    ) -> Result<Self, EngineError> {
        Self::build(config.into(), surface, scheduler, None)
    }

    /// Like [`MotesEngine::new`], loading image shapes through `loader`.
    pub fn with_asset_loader(
        config: impl Into<Arc<MotesConfig>>,
        surface: S,
        scheduler: H,
        loader: impl AssetLoader + 'static,
    ) -> Result<Self, EngineError> {
        Self::build(config.into(), surface, scheduler, Some(Box::new(loader)))
    }

    /// Build from a named preset with JSON overrides merged on top.
    pub fn from_preset(
        preset: Preset,
        overrides: &Value,
        surface: S,
        scheduler: H,
    ) -> Result<Self, EngineError> {
        let config = MotesConfig::from_preset_with_overrides(preset, overrides)?;
        Self::new(config, surface, scheduler)
    }

    fn build(
        config: Arc<MotesConfig>,
        surface: S,
        mut scheduler: H,
        loader: Option<Box<dyn AssetLoader>>,
    ) -> Result<Self, EngineError> {
        let bounds = surface_bounds(&surface)?;
        let rng = config.seeded_rng();
        let pending_frame = Some(scheduler.request_frame());
        let mut engine = Self {
            config,
            surface,
            scheduler,
            loader,
            rng,
            particles: Vec::new(),
            index: QuadTree::new(bounds),
            positions: Vec::new(),
            bounds,
            pointer: PointerState::default(),
            bursts: Vec::new(),
            readiness: AssetReadiness::new(),
            state: EngineState::Idle,
            tick: Tick::zero(),
            last_frame_ms: None,
            pending_frame,
        };
        engine.populate();
        debug!(
            detect_on = ?engine.config.interactivity.detect_on,
            "engine constructed"
        );
        Ok(engine)
    }

    /// Replace the population with a freshly sized one for the current bounds.
    fn populate(&mut self) {
        self.particles.clear();
        self.bursts.clear();
        let (width, height) = (self.bounds.width, self.bounds.height);
        let number = &self.config.particles.number;
        let count = population_size(number, width, height);
        info!(
            count,
            width,
            height,
            density = number.density.enable,
            "populating particles"
        );
        self.particles.reserve(count);
        for _ in 0..count {
            let x = self.rng.random::<f32>() * width;
            let y = self.rng.random::<f32>() * height;
            self.spawn(x, y);
        }
    }

    fn spawn(&mut self, x: f32, y: f32) {
        let mut particle = Particle::new(Arc::clone(&self.config), &mut self.rng, x, y);
        let particles = &self.config.particles;

        if particle.shape() == ShapeKind::Image && !particles.shape.images.is_empty() {
            let pick = self.rng.random_range(0..particles.shape.images.len());
            let source = particles.shape.images[pick].clone();
            let handle = match self.loader.as_mut() {
                Some(loader) => loader.load(&source),
                None => AssetHandle::loaded(),
            };
            particle.attach_image(ParticleImage { source, handle });
        }

        if particles.depth.enable {
            let draw = particle.draw();
            let radius = particles.size.value;
            let surface = &mut self.surface;
            let sprites = particles.depth.blur_levels.map(|blur| {
                surface.prepare_sprite(&SpriteRequest {
                    shape: draw.shape,
                    sides: draw.sides,
                    color: draw.color,
                    radius,
                    blur,
                })
            });
            particle.set_depth_sprites(DepthSprites(sprites));
        }

        self.particles.push(particle);
    }

    /// Frame callback. The first call only records the time baseline.
    pub fn on_frame(&mut self, timestamp_ms: f64) -> Option<TickReport> {
        if self.state == EngineState::Destroyed {
            return None;
        }
        self.pending_frame = None;
        let report = match self.last_frame_ms.replace(timestamp_ms) {
            None => {
                self.state = EngineState::Running;
                debug!(timestamp_ms, "first frame; recording baseline");
                None
            }
            Some(previous) => {
                let elapsed_ms = timestamp_ms - previous;
                if is_stalled(elapsed_ms) {
                    debug!(elapsed_ms, "clock stalled; substituting one nominal frame");
                }
                self.step(frame_delta(elapsed_ms))
            }
        };
        self.poll_assets();
        self.pending_frame = Some(self.scheduler.request_frame());
        report
    }

    /// Run one tick with an explicit `delta`; `None` once destroyed.
    ///
    /// Driving ticks directly starts the engine; a later frame callback then
    /// records a fresh time baseline before ticking again.
    pub fn step(&mut self, delta: f32) -> Option<TickReport> {
        match self.state {
            EngineState::Destroyed => return None,
            EngineState::Idle => self.state = EngineState::Running,
            EngineState::Running => {}
        }

        self.surface.clear();

        self.positions.clear();
        self.positions
            .extend(self.particles.iter().map(|particle| (particle.x, particle.y)));
        if let Err(err) = self.index.rebuild(self.bounds, &self.positions) {
            warn!(?err, "spatial index rebuild failed; continuing without neighbours");
            self.index = QuadTree::default();
        }

        let movement = &self.config.particles.movement;
        // Attraction is part of movement; a still population stays still.
        if movement.enable {
            physics::apply_attraction(
                &movement.attract,
                &self.index,
                &self.positions,
                &mut self.particles,
            );
        }

        let links = interaction::apply_hover(
            &self.config.interactivity,
            &self.pointer,
            &self.index,
            &mut self.particles,
            &mut self.surface,
        );
        interaction::apply_bursts(
            &self.config.interactivity,
            &mut self.bursts,
            delta * FRAME_MS as f32,
            &self.index,
            &mut self.particles,
        );

        let (width, height) = (self.bounds.width, self.bounds.height);
        for particle in &mut self.particles {
            particle.integrate(delta);
            particle.apply_boundary(width, height);
            particle.animate(delta);
            self.surface.draw_particle(&particle.draw());
        }

        self.tick = self.tick.next();
        let report = TickReport {
            tick: self.tick,
            delta,
            particles: self.particles.len(),
            links,
        };
        trace!(tick = report.tick.0, delta, particles = report.particles, links, "tick");
        Some(report)
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.state != EngineState::Destroyed {
            self.pointer.move_to(x, y);
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer.leave();
    }

    /// Apply the configured click mode at `(x, y)`.
    pub fn click(&mut self, x: f32, y: f32) {
        if self.state == EngineState::Destroyed {
            return;
        }
        let on_click = &self.config.interactivity.events.on_click;
        if !on_click.enable {
            return;
        }
        let mode = on_click.mode;
        self.pointer.x = x;
        self.pointer.y = y;
        match mode {
            ClickMode::Push => {
                let quantity = self.config.interactivity.modes.push.quantity;
                for _ in 0..quantity {
                    self.spawn(x, y);
                }
                info!(mode = "push", added = quantity, total = self.particles.len(), "click");
            }
            ClickMode::Remove => {
                let quantity = self.config.interactivity.modes.remove.quantity as usize;
                let removed = interaction::remove_nearest(&mut self.particles, x, y, quantity);
                info!(mode = "remove", removed, total = self.particles.len(), "click");
            }
            ClickMode::Bubble | ClickMode::Repulse => {
                if let Some(burst) =
                    interaction::start_burst(&self.config.interactivity, mode, x, y)
                {
                    debug!(?mode, x, y, duration_ms = burst.remaining_ms, "click burst");
                    self.bursts.push(burst);
                }
            }
        }
    }

    /// Re-read the surface size and rebuild the population from scratch.
    pub fn resize(&mut self) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            return Ok(());
        }
        self.bounds = surface_bounds(&self.surface)?;
        info!(
            width = self.bounds.width,
            height = self.bounds.height,
            "surface resized; reinitialising"
        );
        self.populate();
        Ok(())
    }

    /// Cancel the next frame, release listeners, and ignore later asset completions.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.scheduler.detach_listeners();
        self.readiness.disarm();
        self.state = EngineState::Destroyed;
        info!(tick = self.tick.0, "engine destroyed");
    }

    /// Register the one-shot callback fired once every particle image has settled.
    pub fn on_assets_ready(&mut self, callback: impl FnOnce() + 'static) {
        self.readiness.set_callback(callback);
    }

    /// Check image loads; returns `true` on the call that fires readiness.
    pub fn poll_assets(&mut self) -> bool {
        let handles = self
            .particles
            .iter()
            .filter_map(Particle::image)
            .map(|image| &image.handle);
        let fired = self.readiness.poll(handles);
        if fired {
            info!(particles = self.particles.len(), "particle assets ready");
        }
        fired
    }

    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn config(&self) -> &MotesConfig {
        &self.config
    }

    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[must_use]
    pub const fn pointer(&self) -> PointerState {
        self.pointer
    }

    #[must_use]
    pub fn active_bursts(&self) -> &[ClickBurst] {
        &self.bursts
    }

    #[must_use]
    pub fn bounds(&self) -> Boundary {
        self.bounds
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable surface access; follow size changes with [`MotesEngine::resize`].
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub fn scheduler(&self) -> &H {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut H {
        &mut self.scheduler
    }

    #[must_use]
    pub fn assets_ready(&self) -> bool {
        self.readiness.has_fired()
    }
}
