//! Draw primitives emitted each tick and the surface contract that receives them.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::config::{ImageSource, ShapeKind};

/// Opaque handle to a sprite the surface prepared ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteId(pub u32);

/// Request for a pre-blurred rendition of a particle used by depth tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteRequest {
    pub shape: ShapeKind,
    pub sides: u32,
    pub color: Rgb,
    /// Radius the sprite is rasterised at; draws scale it to the live radius.
    pub radius: f32,
    pub blur: f32,
}

/// One particle, ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleDraw<'a> {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub opacity: f32,
    /// Rotation in radians.
    pub rotation: f32,
    pub color: Rgb,
    pub shape: ShapeKind,
    /// Vertex count for polygonal shapes, point count for stars, 0 for circles and images.
    pub sides: u32,
    pub image: Option<&'a ImageSource>,
    pub sprite: Option<SpriteId>,
}

/// Line segment from a particle to the pointer (grab mode).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkDraw {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub opacity: f32,
    pub width: f32,
    pub color: Rgb,
}

/// 2D drawing surface supplied by the host.
pub trait DrawSurface {
    fn width(&self) -> f32;

    fn height(&self) -> f32;

    /// Erase everything drawn during the previous tick.
    fn clear(&mut self);

    fn draw_particle(&mut self, draw: &ParticleDraw<'_>);

    fn draw_link(&mut self, link: &LinkDraw);

    /// Rasterise a blurred sprite once and return a handle for later draws.
    fn prepare_sprite(&mut self, request: &SpriteRequest) -> SpriteId;
}

/// Owned copy of a [`ParticleDraw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub opacity: f32,
    pub rotation: f32,
    pub color: Rgb,
    pub shape: ShapeKind,
    pub sides: u32,
    pub image: Option<String>,
    pub sprite: Option<SpriteId>,
}

impl From<&ParticleDraw<'_>> for ParticleRecord {
    fn from(draw: &ParticleDraw<'_>) -> Self {
        Self {
            x: draw.x,
            y: draw.y,
            radius: draw.radius,
            opacity: draw.opacity,
            rotation: draw.rotation,
            color: draw.color,
            shape: draw.shape,
            sides: draw.sides,
            image: draw.image.map(|image| image.src.clone()),
            sprite: draw.sprite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Particle(ParticleRecord),
    Link(LinkDraw),
}

/// In-memory surface that keeps the draw commands of the current tick.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
    sprites: Vec<SpriteRequest>,
    clears: u64,
}

impl RecordingSurface {
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Change the reported size; callers follow up with a resize on the engine.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn particles(&self) -> impl Iterator<Item = &ParticleRecord> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Particle(record) => Some(record),
            DrawCommand::Link(_) => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkDraw> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Link(link) => Some(link),
            DrawCommand::Particle(_) => None,
        })
    }

    #[must_use]
    pub fn sprites(&self) -> &[SpriteRequest] {
        &self.sprites
    }

    /// Number of times the surface has been cleared.
    #[must_use]
    pub const fn clears(&self) -> u64 {
        self.clears
    }
}

impl DrawSurface for RecordingSurface {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.clears += 1;
    }

    fn draw_particle(&mut self, draw: &ParticleDraw<'_>) {
        self.commands.push(DrawCommand::Particle(draw.into()));
    }

    fn draw_link(&mut self, link: &LinkDraw) {
        self.commands.push(DrawCommand::Link(*link));
    }

    fn prepare_sprite(&mut self, request: &SpriteRequest) -> SpriteId {
        let id = SpriteId(self.sprites.len() as u32);
        self.sprites.push(*request);
        id
    }
}
