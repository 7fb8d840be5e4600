//! Per-particle state: spawn-time resolution, animation machines, and edge policy.

use std::f32::consts::TAU;
use std::sync::Arc;

use rand::{Rng, RngCore};

use crate::assets::ParticleImage;
use crate::color::Rgb;
use crate::config::{MotesConfig, MovementConfig, OutMode, RotateDirection, ShapeKind};
use crate::surface::{ParticleDraw, SpriteId};

const FULL_TURN_DEGREES: f32 = 360.0;

/// Discrete depth classification selecting one of three pre-blurred sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthTier {
    Near,
    Mid,
    Far,
}

impl DepthTier {
    /// Map a normalised size in `[0, 1]` onto a tier.
    #[must_use]
    pub fn from_normalized(value: f32) -> Self {
        if value > 0.66 {
            Self::Far
        } else if value > 0.33 {
            Self::Mid
        } else {
            Self::Near
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Near => 0,
            Self::Mid => 1,
            Self::Far => 2,
        }
    }
}

/// Sprites prepared at spawn, one per depth tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthSprites(pub [SpriteId; 3]);

impl DepthSprites {
    #[must_use]
    pub const fn for_tier(self, tier: DepthTier) -> SpriteId {
        self.0[tier.index()]
    }
}

/// Advance `value` toward the bound in `direction`, turning around on arrival.
fn ping_pong(value: f32, direction: &mut f32, step: f32, min: f32, max: f32) -> f32 {
    let mut next = value + step * *direction;
    if *direction > 0.0 && next >= max {
        next = max;
        *direction = -1.0;
    } else if *direction < 0.0 && next <= min {
        next = min;
        *direction = 1.0;
    }
    next
}

/// Clamp without panicking on inverted bounds (configuration is not validated).
fn clamp_loose(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

fn random_sign(rng: &mut dyn RngCore) -> f32 {
    if rng.random_bool(0.5) { 1.0 } else { -1.0 }
}

/// Resolve the spawn velocity from heading, jitter, and speed settings.
pub fn initial_velocity(movement: &MovementConfig, rng: &mut dyn RngCore) -> (f32, f32) {
    if !movement.enable {
        return (0.0, 0.0);
    }
    let (mut x, mut y) = movement.direction.base_vector();
    if movement.random {
        x += rng.random::<f32>() - 0.5;
        y += rng.random::<f32>() - 0.5;
    }
    let speed = if movement.random_speed.enable {
        let (min, max) = movement.random_speed.bounds();
        // An infinite span would panic in the sampler.
        if max > min && (max - min).is_finite() {
            rng.random_range(min..max)
        } else if min.is_finite() {
            min
        } else {
            movement.speed
        }
    } else {
        movement.speed
    };
    (x * speed, y * speed)
}

/// A single simulated entity.
///
/// `base_radius` and `base_opacity` are the resting values that pointer effects
/// interpolate from and reset to; the oscillators advance those baselines.
#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub opacity: f32,
    base_radius: f32,
    base_opacity: f32,
    angle: f32,
    angle_radians: f32,
    rotation_sign: f32,
    sway_phase: f32,
    opacity_direction: f32,
    size_direction: f32,
    color: Rgb,
    shape: ShapeKind,
    image: Option<ParticleImage>,
    depth_sprites: Option<DepthSprites>,
    config: Arc<MotesConfig>,
}

impl Particle {
    /// Spawn a particle at `(x, y)` with randomised or configured attributes.
    pub fn new(config: Arc<MotesConfig>, rng: &mut dyn RngCore, x: f32, y: f32) -> Self {
        let settings = &config.particles;

        let size = &settings.size;
        let mut radius = if size.random {
            rng.random::<f32>() * size.value
        } else {
            size.value
        };
        if size.anim.enable {
            radius = clamp_loose(radius, size.anim.minimum, size.value);
        }

        let opacity_cfg = &settings.opacity;
        let mut opacity = if opacity_cfg.random {
            rng.random::<f32>() * opacity_cfg.value
        } else {
            opacity_cfg.value
        };
        if opacity_cfg.anim.enable {
            opacity = clamp_loose(opacity, opacity_cfg.anim.minimum, opacity_cfg.value);
        }
        let opacity = opacity.clamp(0.0, 1.0);

        let rotate = &settings.rotate;
        let angle = if rotate.random {
            rng.random_range(0.0..FULL_TURN_DEGREES)
        } else {
            rotate.value.rem_euclid(FULL_TURN_DEGREES)
        };
        let rotation_sign = match rotate.direction {
            RotateDirection::Clockwise => 1.0,
            RotateDirection::CounterClockwise => -1.0,
            RotateDirection::Random => random_sign(rng),
        };

        let opacity_direction = if opacity_cfg.anim.sync {
            -1.0
        } else {
            random_sign(rng)
        };
        let size_direction = if size.anim.sync {
            -1.0
        } else {
            random_sign(rng)
        };

        let shape = match settings.shape.kinds.len() {
            0 => ShapeKind::Circle,
            1 => settings.shape.kinds[0],
            len => settings.shape.kinds[rng.random_range(0..len)],
        };
        let color = settings.color.resolve(rng);
        let (vx, vy) = initial_velocity(&settings.movement, rng);
        let sway_phase = rng.random_range(0.0..TAU);

        Self {
            x,
            y,
            vx,
            vy,
            radius,
            opacity,
            base_radius: radius,
            base_opacity: opacity,
            angle,
            angle_radians: angle.to_radians(),
            rotation_sign,
            sway_phase,
            opacity_direction,
            size_direction,
            color,
            shape,
            image: None,
            depth_sprites: None,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MotesConfig {
        &self.config
    }

    #[must_use]
    pub const fn base_radius(&self) -> f32 {
        self.base_radius
    }

    #[must_use]
    pub const fn base_opacity(&self) -> f32 {
        self.base_opacity
    }

    /// Rotation in degrees, within `[0, 360)`.
    #[must_use]
    pub const fn angle(&self) -> f32 {
        self.angle
    }

    #[must_use]
    pub const fn angle_radians(&self) -> f32 {
        self.angle_radians
    }

    #[must_use]
    pub const fn color(&self) -> Rgb {
        self.color
    }

    #[must_use]
    pub const fn shape(&self) -> ShapeKind {
        self.shape
    }

    #[must_use]
    pub fn image(&self) -> Option<&ParticleImage> {
        self.image.as_ref()
    }

    pub fn attach_image(&mut self, image: ParticleImage) {
        self.image = Some(image);
    }

    #[must_use]
    pub const fn depth_sprites(&self) -> Option<DepthSprites> {
        self.depth_sprites
    }

    pub fn set_depth_sprites(&mut self, sprites: DepthSprites) {
        self.depth_sprites = Some(sprites);
    }

    /// Vertex or point count used when drawing the particle's shape.
    #[must_use]
    pub fn sides(&self) -> u32 {
        let shape = &self.config.particles.shape;
        match self.shape {
            ShapeKind::Circle | ShapeKind::Image => 0,
            ShapeKind::Edge => 4,
            ShapeKind::Triangle => 3,
            ShapeKind::Polygon => shape.polygon_sides,
            ShapeKind::Star => shape.star_sides,
        }
    }

    /// Restore radius and opacity to their resting baselines.
    pub fn reset_to_base(&mut self) {
        self.radius = self.base_radius;
        self.opacity = self.base_opacity;
    }

    pub fn integrate(&mut self, delta: f32) {
        self.x += self.vx * delta;
        self.y += self.vy * delta;
    }

    /// Apply the configured edge policy against a `width` x `height` canvas.
    pub fn apply_boundary(&mut self, width: f32, height: f32) {
        let r = self.radius;
        match self.config.particles.movement.out_mode {
            OutMode::Out => {
                if self.x - r > width {
                    self.x -= width + 2.0 * r;
                } else if self.x + r < 0.0 {
                    self.x += width + 2.0 * r;
                }
                if self.y - r > height {
                    self.y -= height + 2.0 * r;
                } else if self.y + r < 0.0 {
                    self.y += height + 2.0 * r;
                }
            }
            // A resting particle pushed past a wall is reflected back in.
            OutMode::Bounce => {
                if self.x + r >= width && self.vx >= 0.0 {
                    let overlap = self.x + r - width;
                    self.x = width - r - overlap;
                    self.vx = -self.vx;
                } else if self.x - r <= 0.0 && self.vx <= 0.0 {
                    let overlap = r - self.x;
                    self.x = r + overlap;
                    self.vx = -self.vx;
                }
                if self.y + r >= height && self.vy >= 0.0 {
                    let overlap = self.y + r - height;
                    self.y = height - r - overlap;
                    self.vy = -self.vy;
                } else if self.y - r <= 0.0 && self.vy <= 0.0 {
                    let overlap = r - self.y;
                    self.y = r + overlap;
                    self.vy = -self.vy;
                }
            }
        }
    }

    /// Run the four animation machines for one tick.
    pub fn animate(&mut self, delta: f32) {
        self.step_opacity(delta);
        self.step_size(delta);
        self.step_rotation(delta);
        self.step_sway(delta);
    }

    fn step_opacity(&mut self, delta: f32) {
        let opacity = &self.config.particles.opacity;
        if !opacity.anim.enable {
            return;
        }
        let step = opacity.anim.speed / 1000.0 * delta;
        let next = ping_pong(
            self.base_opacity,
            &mut self.opacity_direction,
            step,
            opacity.anim.minimum,
            opacity.value,
        )
        .clamp(0.0, 1.0);
        // Keep any pointer displacement applied earlier in the tick.
        let displacement = self.opacity - self.base_opacity;
        self.base_opacity = next;
        self.opacity = (next + displacement).clamp(0.0, 1.0);
    }

    fn step_size(&mut self, delta: f32) {
        let size = &self.config.particles.size;
        if !size.anim.enable {
            return;
        }
        let step = size.anim.speed / 100.0 * delta;
        let next = clamp_loose(
            ping_pong(
                self.base_radius,
                &mut self.size_direction,
                step,
                size.anim.minimum,
                size.value,
            ),
            0.0,
            size.value,
        );
        let displacement = self.radius - self.base_radius;
        self.base_radius = next;
        self.radius = (next + displacement).max(0.0);
    }

    fn step_rotation(&mut self, delta: f32) {
        let rotate = &self.config.particles.rotate;
        if !rotate.anim.enable {
            return;
        }
        let mut angle =
            (self.angle + rotate.anim.speed * self.rotation_sign * delta).rem_euclid(FULL_TURN_DEGREES);
        // rem_euclid can round tiny negatives up to exactly 360.
        if angle >= FULL_TURN_DEGREES {
            angle = 0.0;
        }
        self.angle = angle;
        self.angle_radians = angle.to_radians();
    }

    fn step_sway(&mut self, delta: f32) {
        let sway = &self.config.particles.sway;
        if !sway.enable {
            return;
        }
        self.sway_phase += sway.frequency * delta;
        self.x += self.sway_phase.cos() * (sway.amplitude * 0.1) * delta;
    }

    /// Depth tier from where the radius sits between the configured minimum and maximum.
    #[must_use]
    pub fn depth_tier(&self) -> DepthTier {
        let size = &self.config.particles.size;
        let span = size.value - size.anim.minimum;
        let normalized = if span > f32::EPSILON {
            ((self.radius - size.anim.minimum) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        DepthTier::from_normalized(normalized)
    }

    /// Draw primitive for the current state. Image shapes without an image draw as circles.
    #[must_use]
    pub fn draw(&self) -> ParticleDraw<'_> {
        let image = self.image.as_ref().map(|image| &image.source);
        let shape = match (self.shape, image) {
            (ShapeKind::Image, None) => ShapeKind::Circle,
            (shape, _) => shape,
        };
        ParticleDraw {
            x: self.x,
            y: self.y,
            radius: self.radius,
            opacity: self.opacity,
            rotation: self.angle_radians,
            color: self.color,
            shape,
            sides: self.sides(),
            image,
            sprite: self
                .depth_sprites
                .map(|sprites| sprites.for_tier(self.depth_tier())),
        }
    }
}
