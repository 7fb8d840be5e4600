//! Simulation configuration, named presets, and JSON override merging.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::color::ColorSpec;

/// Errors produced while building a configuration from presets and overrides.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
    #[error("unknown configuration path: {0}")]
    UnknownPath(String),
    #[error("{0}")]
    InvalidPatch(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ConfigError {
    fn serialization(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Static configuration shared by every particle of an engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MotesConfig {
    pub particles: ParticlesConfig,
    pub interactivity: InteractivityConfig,
    /// Optional RNG seed for reproducible populations.
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ParticlesConfig {
    pub number: NumberConfig,
    pub color: ColorSpec,
    pub shape: ShapeConfig,
    pub opacity: OpacityConfig,
    pub size: SizeConfig,
    pub rotate: RotateConfig,
    pub movement: MovementConfig,
    pub sway: SwayConfig,
    pub depth: DepthConfig,
}

/// Population sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NumberConfig {
    /// Fixed count, or the per-area multiplier when density is enabled.
    pub value: u32,
    pub density: DensityConfig,
}

impl Default for NumberConfig {
    fn default() -> Self {
        Self {
            value: 80,
            density: DensityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DensityConfig {
    pub enable: bool,
    /// Canvas area (in thousands of square pixels) that holds `number.value` particles.
    pub value_area: f32,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            enable: true,
            value_area: 800.0,
        }
    }
}

/// Closed set of drawable shapes.
///
/// Deserialises from any string; names outside the set fall back to [`ShapeKind::Circle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeKind {
    #[default]
    Circle,
    Edge,
    Triangle,
    Polygon,
    Star,
    Image,
}

impl ShapeKind {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "edge" | "square" => Self::Edge,
            "triangle" => Self::Triangle,
            "polygon" => Self::Polygon,
            "star" => Self::Star,
            "image" | "images" => Self::Image,
            _ => Self::Circle,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Edge => "edge",
            Self::Triangle => "triangle",
            Self::Polygon => "polygon",
            Self::Star => "star",
            Self::Image => "image",
        }
    }
}

impl From<String> for ShapeKind {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<ShapeKind> for String {
    fn from(kind: ShapeKind) -> Self {
        kind.name().to_string()
    }
}

/// Image asset referenced by image-shaped particles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageSource {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl Default for ImageSource {
    fn default() -> Self {
        Self {
            src: String::new(),
            width: 100.0,
            height: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShapeConfig {
    /// Candidate shapes; each particle picks one at spawn. Empty means circle.
    pub kinds: Vec<ShapeKind>,
    pub polygon_sides: u32,
    pub star_sides: u32,
    pub images: Vec<ImageSource>,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            kinds: vec![ShapeKind::Circle],
            polygon_sides: 5,
            star_sides: 5,
            images: Vec::new(),
        }
    }
}

/// Ping-pong oscillation parameters shared by opacity and size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OscillationConfig {
    pub enable: bool,
    pub speed: f32,
    /// Lower turning point; the upper one is the section's `value`.
    pub minimum: f32,
    /// Start every particle descending instead of in a random direction.
    pub sync: bool,
}

impl Default for OscillationConfig {
    fn default() -> Self {
        Self {
            enable: false,
            speed: 1.0,
            minimum: 0.1,
            sync: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpacityConfig {
    /// Maximum (and default) opacity.
    pub value: f32,
    pub random: bool,
    pub anim: OscillationConfig,
}

impl Default for OpacityConfig {
    fn default() -> Self {
        Self {
            value: 0.5,
            random: false,
            anim: OscillationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizeConfig {
    /// Maximum (and default) radius in pixels.
    pub value: f32,
    pub random: bool,
    pub anim: OscillationConfig,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            value: 3.0,
            random: true,
            anim: OscillationConfig {
                speed: 40.0,
                ..OscillationConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotateDirection {
    #[default]
    Clockwise,
    CounterClockwise,
    /// Resolved to one of the other two per particle at spawn.
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RotateAnim {
    pub enable: bool,
    /// Degrees per nominal frame.
    pub speed: f32,
}

impl Default for RotateAnim {
    fn default() -> Self {
        Self {
            enable: false,
            speed: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RotateConfig {
    /// Initial angle in degrees.
    pub value: f32,
    pub random: bool,
    pub direction: RotateDirection,
    pub anim: RotateAnim,
}

/// Named compass headings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Compass {
    #[default]
    None,
    Top,
    #[serde(alias = "top-right")]
    TopRight,
    Right,
    #[serde(alias = "bottom-right")]
    BottomRight,
    Bottom,
    #[serde(alias = "bottom-left")]
    BottomLeft,
    Left,
    #[serde(alias = "top-left")]
    TopLeft,
}

/// Heading of spawned particles: a compass name or an angle in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MoveDirection {
    Compass(Compass),
    Angle(f32),
}

impl Default for MoveDirection {
    fn default() -> Self {
        Self::Compass(Compass::None)
    }
}

impl MoveDirection {
    /// Unscaled heading vector. Diagonals use half components rather than a unit vector.
    #[must_use]
    pub fn base_vector(self) -> (f32, f32) {
        match self {
            Self::Compass(compass) => match compass {
                Compass::None => (0.0, 0.0),
                Compass::Top => (0.0, -1.0),
                Compass::TopRight => (0.5, -0.5),
                Compass::Right => (1.0, 0.0),
                Compass::BottomRight => (0.5, 0.5),
                Compass::Bottom => (0.0, 1.0),
                Compass::BottomLeft => (-0.5, 0.5),
                Compass::Left => (-1.0, 0.0),
                Compass::TopLeft => (-0.5, -0.5),
            },
            Self::Angle(degrees) => {
                let radians = degrees.to_radians();
                (radians.cos(), radians.sin())
            }
        }
    }
}

/// Behaviour when a particle reaches the canvas edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutMode {
    /// Leave one edge and reappear flush on the opposite one.
    #[default]
    #[serde(alias = "wrap")]
    Out,
    Bounce,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RandomSpeed {
    pub enable: bool,
    /// Defaults to 1 when unset.
    pub min: Option<f32>,
    /// Defaults to 5 when unset.
    pub max: Option<f32>,
}

impl RandomSpeed {
    #[must_use]
    pub fn bounds(&self) -> (f32, f32) {
        (self.min.unwrap_or(1.0), self.max.unwrap_or(5.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AttractConfig {
    pub enable: bool,
    pub rotate_x: f32,
    pub rotate_y: f32,
}

impl Default for AttractConfig {
    fn default() -> Self {
        Self {
            enable: false,
            rotate_x: 600.0,
            rotate_y: 1200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MovementConfig {
    pub enable: bool,
    pub speed: f32,
    pub direction: MoveDirection,
    /// Jitter each heading component by up to half a unit.
    pub random: bool,
    pub random_speed: RandomSpeed,
    pub out_mode: OutMode,
    pub attract: AttractConfig,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            enable: true,
            speed: 2.0,
            direction: MoveDirection::default(),
            random: true,
            random_speed: RandomSpeed::default(),
            out_mode: OutMode::Out,
            attract: AttractConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwayConfig {
    pub enable: bool,
    /// Phase advance per nominal frame, in radians.
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for SwayConfig {
    fn default() -> Self {
        Self {
            enable: false,
            frequency: 0.02,
            amplitude: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DepthConfig {
    pub enable: bool,
    /// Blur radius in pixels for the near, mid, and far tiers.
    pub blur_levels: [f32; 3],
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            enable: false,
            blur_levels: [0.0, 1.5, 3.0],
        }
    }
}

/// Where the host listens for pointer input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectOn {
    #[default]
    Canvas,
    Window,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HoverMode {
    Grab,
    Bubble,
    #[default]
    Repulse,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClickMode {
    #[default]
    Push,
    Remove,
    /// Timed bubble burst centred on the click point.
    Bubble,
    /// Timed repulse burst centred on the click point.
    Repulse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct HoverEvent {
    pub enable: bool,
    pub mode: HoverMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClickEvent {
    pub enable: bool,
    pub mode: ClickMode,
}

impl Default for ClickEvent {
    fn default() -> Self {
        Self {
            enable: true,
            mode: ClickMode::Push,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EventsConfig {
    pub on_hover: HoverEvent,
    pub on_click: ClickEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrabMode {
    pub distance: f32,
    pub line_width: f32,
}

impl Default for GrabMode {
    fn default() -> Self {
        Self {
            distance: 140.0,
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BubbleMode {
    pub distance: f32,
    /// Target radius at the pointer.
    pub size: f32,
    /// Lifetime of a click burst, in seconds.
    pub duration: f32,
    /// Target opacity at the pointer; `None` leaves opacity untouched.
    pub opacity: Option<f32>,
}

impl Default for BubbleMode {
    fn default() -> Self {
        Self {
            distance: 200.0,
            size: 40.0,
            duration: 0.4,
            opacity: Some(0.8),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepulseMode {
    pub distance: f32,
    /// Lifetime of a click burst, in seconds.
    pub duration: f32,
}

impl Default for RepulseMode {
    fn default() -> Self {
        Self {
            distance: 100.0,
            duration: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuantityMode {
    pub quantity: u32,
}

impl Default for QuantityMode {
    fn default() -> Self {
        Self { quantity: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModesConfig {
    pub grab: GrabMode,
    pub bubble: BubbleMode,
    pub repulse: RepulseMode,
    pub push: QuantityMode,
    pub remove: QuantityMode,
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            grab: GrabMode::default(),
            bubble: BubbleMode::default(),
            repulse: RepulseMode::default(),
            push: QuantityMode { quantity: 4 },
            remove: QuantityMode { quantity: 2 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct InteractivityConfig {
    pub detect_on: DetectOn,
    pub events: EventsConfig,
    pub modes: ModesConfig,
}

/// Named baselines that overrides are merged onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    Default,
    Snow,
    Bubbles,
    Constellation,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Default,
        Preset::Snow,
        Preset::Bubbles,
        Preset::Constellation,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Snow => "snow",
            Self::Bubbles => "bubbles",
            Self::Constellation => "constellation",
        }
    }

    /// Fully populated configuration for this preset.
    #[must_use]
    pub fn config(self) -> MotesConfig {
        let mut config = MotesConfig::default();
        match self {
            Self::Default => {}
            Self::Snow => {
                let particles = &mut config.particles;
                particles.number.value = 160;
                particles.size.value = 5.0;
                particles.opacity.random = true;
                particles.movement.speed = 1.0;
                particles.movement.direction = MoveDirection::Compass(Compass::Bottom);
                particles.movement.random = false;
                particles.sway.enable = true;
                particles.depth.enable = true;
                particles.size.anim.minimum = 1.0;
                config.interactivity.events.on_hover = HoverEvent {
                    enable: true,
                    mode: HoverMode::Repulse,
                };
            }
            Self::Bubbles => {
                let particles = &mut config.particles;
                particles.number.value = 12;
                particles.size.value = 40.0;
                particles.size.anim = OscillationConfig {
                    enable: true,
                    speed: 4.0,
                    minimum: 10.0,
                    sync: false,
                };
                particles.opacity.anim = OscillationConfig {
                    enable: true,
                    speed: 1.0,
                    minimum: 0.1,
                    sync: false,
                };
                particles.movement.out_mode = OutMode::Bounce;
                particles.shape.kinds = vec![ShapeKind::Circle, ShapeKind::Polygon];
                particles.shape.polygon_sides = 6;
                config.interactivity.events.on_hover = HoverEvent {
                    enable: true,
                    mode: HoverMode::Bubble,
                };
                config.interactivity.events.on_click.mode = ClickMode::Repulse;
            }
            Self::Constellation => {
                let particles = &mut config.particles;
                particles.number.value = 100;
                particles.color = ColorSpec::Palette(vec![
                    "#ffffff".into(),
                    "#ffe9a8".into(),
                    "#a8d8ff".into(),
                ]);
                particles.shape.kinds = vec![ShapeKind::Star];
                particles.rotate = RotateConfig {
                    value: 0.0,
                    random: true,
                    direction: RotateDirection::Random,
                    anim: RotateAnim {
                        enable: true,
                        speed: 1.0,
                    },
                };
                particles.movement.speed = 0.6;
                particles.movement.attract.enable = true;
                config.interactivity.events.on_hover = HoverEvent {
                    enable: true,
                    mode: HoverMode::Grab,
                };
            }
        }
        config
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

impl MotesConfig {
    /// Merge a JSON object onto a preset; leaves absent from `overrides` keep the preset value.
    pub fn from_preset_with_overrides(
        preset: Preset,
        overrides: &Value,
    ) -> Result<Self, ConfigError> {
        if overrides.is_null() {
            return Ok(preset.config());
        }
        if !overrides.is_object() {
            return Err(ConfigError::InvalidPatch(
                "configuration overrides must be a JSON object".into(),
            ));
        }
        let mut merged =
            serde_json::to_value(preset.config()).map_err(ConfigError::serialization)?;
        let mut path = Vec::new();
        merge_value(&mut merged, overrides, &mut path)?;
        serde_path_to_error::deserialize::<_, MotesConfig>(merged).map_err(
            |err: serde_path_to_error::Error<serde_json::Error>| {
                ConfigError::InvalidPatch(format!("{} at {}", err, err.path()))
            },
        )
    }

    /// Parse overrides from JSON text and merge them onto `preset`.
    pub fn from_json_str(preset: Preset, json: &str) -> Result<Self, ConfigError> {
        let overrides: Value = serde_json::from_str(json).map_err(ConfigError::serialization)?;
        Self::from_preset_with_overrides(preset, &overrides)
    }

    /// Returns the configured RNG, seeded from entropy when no seed is set.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

fn path_display(path: &[&str]) -> String {
    path.join(".")
}

fn merge_value<'a>(
    target: &mut Value,
    patch: &'a Value,
    path: &mut Vec<&'a str>,
) -> Result<(), ConfigError> {
    match target {
        Value::Object(target_map) => {
            let Value::Object(patch_map) = patch else {
                return Err(ConfigError::InvalidPatch(format!(
                    "expected an object at {}",
                    path_display(path),
                )));
            };
            for (key, patch_value) in patch_map {
                path.push(key);
                let Some(target_value) = target_map.get_mut(key) else {
                    return Err(ConfigError::UnknownPath(path_display(path)));
                };
                merge_value(target_value, patch_value, path)?;
                path.pop();
            }
            Ok(())
        }
        // Leaves (and arrays) are replaced wholesale; typing is checked on deserialisation.
        _ => {
            *target = patch.clone();
            Ok(())
        }
    }
}
