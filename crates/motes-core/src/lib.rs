//! Core types and tick pipeline for the motes particle simulation.
//!
//! The engine owns its particles and spatial index, draws through a host
//! [`DrawSurface`], and advances when the host's [`FrameScheduler`] delivers a
//! frame timestamp to [`MotesEngine::on_frame`].

pub mod assets;
pub mod color;
pub mod config;
pub mod engine;
pub mod interaction;
pub mod particle;
pub mod physics;
pub mod scheduler;
pub mod surface;

pub use assets::{AssetCompleter, AssetHandle, AssetLoader, AssetReadiness, LoadState, ParticleImage};
pub use color::{ColorSpec, Rgb};
pub use config::{ConfigError, MotesConfig, Preset, ShapeKind};
pub use engine::{
    EngineError, EngineState, FRAME_MS, MAX_PARTICLES, MotesEngine, STALL_THRESHOLD_MS, Tick,
    TickReport, frame_delta, population_size,
};
pub use interaction::{ClickBurst, PointerState};
pub use motes_index::{Boundary, NeighborhoodIndex, QuadTree};
pub use particle::{DepthSprites, DepthTier, Particle};
pub use scheduler::{FrameHandle, FrameScheduler, ManualScheduler};
pub use surface::{
    DrawCommand, DrawSurface, LinkDraw, ParticleDraw, ParticleRecord, RecordingSurface, SpriteId,
    SpriteRequest,
};
