//! Pointer-driven effects: hover modes, timed click bursts, and nearest-particle removal.

use motes_index::{Boundary, NeighborhoodIndex};
use ordered_float::OrderedFloat;

use crate::config::{BubbleMode, ClickMode, GrabMode, HoverMode, InteractivityConfig, RepulseMode};
use crate::particle::Particle;
use crate::surface::{DrawSurface, LinkDraw};

/// Maximum displacement per tick applied by repulse at zero distance.
pub const REPULSE_STRENGTH: f32 = 10.0;

/// Pointer position relative to the surface and whether it is over it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

impl PointerState {
    pub fn move_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.active = true;
    }

    pub fn leave(&mut self) {
        self.active = false;
    }
}

/// A click effect that keeps applying at a fixed point until it runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickBurst {
    pub mode: ClickMode,
    pub x: f32,
    pub y: f32,
    pub remaining_ms: f32,
}

/// Every particle within `distance` of `(cx, cy)`, with its distance.
fn within(
    index: &dyn NeighborhoodIndex,
    particles: &[Particle],
    cx: f32,
    cy: f32,
    distance: f32,
) -> Vec<(usize, f32)> {
    let mut hits = Vec::new();
    if distance <= 0.0 {
        return hits;
    }
    let range = Boundary::centered(cx, cy, distance, distance);
    let limit = distance * distance;
    index.query_range(&range, &mut |id| {
        let Some(particle) = particles.get(id) else {
            return;
        };
        let dx = particle.x - cx;
        let dy = particle.y - cy;
        let d2 = dx * dx + dy * dy;
        if d2 < limit {
            hits.push((id, d2.sqrt()));
        }
    });
    hits
}

fn grab(
    modes: &GrabMode,
    pointer: &PointerState,
    index: &dyn NeighborhoodIndex,
    particles: &[Particle],
    surface: &mut dyn DrawSurface,
) -> usize {
    let hits = within(index, particles, pointer.x, pointer.y, modes.distance);
    for &(id, distance) in &hits {
        let particle = &particles[id];
        surface.draw_link(&LinkDraw {
            from: (particle.x, particle.y),
            to: (pointer.x, pointer.y),
            opacity: 1.0 - distance / modes.distance,
            width: modes.line_width,
            color: particle.color(),
        });
    }
    hits.len()
}

fn bubble(
    bubble: &BubbleMode,
    cx: f32,
    cy: f32,
    index: &dyn NeighborhoodIndex,
    particles: &mut [Particle],
) {
    for (id, distance) in within(index, particles, cx, cy, bubble.distance) {
        let ratio = 1.0 - distance / bubble.distance;
        let particle = &mut particles[id];
        let base_radius = particle.base_radius();
        particle.radius = (base_radius + (bubble.size - base_radius) * ratio).max(0.0);
        if let Some(target) = bubble.opacity {
            let base_opacity = particle.base_opacity();
            particle.opacity = (base_opacity + (target - base_opacity) * ratio).clamp(0.0, 1.0);
        }
    }
}

fn repulse(
    repulse: &RepulseMode,
    cx: f32,
    cy: f32,
    index: &dyn NeighborhoodIndex,
    particles: &mut [Particle],
) {
    for (id, distance) in within(index, particles, cx, cy, repulse.distance) {
        let particle = &mut particles[id];
        let angle = (particle.y - cy).atan2(particle.x - cx);
        let push = (1.0 - distance / repulse.distance) * REPULSE_STRENGTH;
        particle.x += angle.cos() * push;
        particle.y += angle.sin() * push;
    }
}

/// Apply the hover mode for this tick and return the number of grab links drawn.
///
/// When bubble is in use, radius and opacity are reset to their baselines first,
/// whether or not the pointer is present.
pub fn apply_hover(
    config: &InteractivityConfig,
    pointer: &PointerState,
    index: &dyn NeighborhoodIndex,
    particles: &mut [Particle],
    surface: &mut dyn DrawSurface,
) -> usize {
    let hover = &config.events.on_hover;
    let bubble_in_use =
        hover.mode == HoverMode::Bubble || config.events.on_click.mode == ClickMode::Bubble;
    if bubble_in_use {
        particles.iter_mut().for_each(Particle::reset_to_base);
    }
    if !pointer.active || !hover.enable {
        return 0;
    }
    match hover.mode {
        HoverMode::Grab => grab(&config.modes.grab, pointer, index, particles, surface),
        HoverMode::Bubble => {
            bubble(&config.modes.bubble, pointer.x, pointer.y, index, particles);
            0
        }
        HoverMode::Repulse => {
            repulse(&config.modes.repulse, pointer.x, pointer.y, index, particles);
            0
        }
    }
}

/// Start a timed burst for click modes that have one.
#[must_use]
pub fn start_burst(config: &InteractivityConfig, mode: ClickMode, x: f32, y: f32) -> Option<ClickBurst> {
    let seconds = match mode {
        ClickMode::Bubble => config.modes.bubble.duration,
        ClickMode::Repulse => config.modes.repulse.duration,
        ClickMode::Push | ClickMode::Remove => return None,
    };
    Some(ClickBurst {
        mode,
        x,
        y,
        remaining_ms: seconds * 1000.0,
    })
}

/// Apply live bursts, age them by `elapsed_ms`, and drop the expired ones.
pub fn apply_bursts(
    config: &InteractivityConfig,
    bursts: &mut Vec<ClickBurst>,
    elapsed_ms: f32,
    index: &dyn NeighborhoodIndex,
    particles: &mut [Particle],
) {
    for burst in bursts.iter_mut() {
        match burst.mode {
            ClickMode::Bubble => bubble(&config.modes.bubble, burst.x, burst.y, index, particles),
            ClickMode::Repulse => {
                repulse(&config.modes.repulse, burst.x, burst.y, index, particles);
            }
            ClickMode::Push | ClickMode::Remove => {}
        }
        burst.remaining_ms -= elapsed_ms;
    }
    bursts.retain(|burst| burst.remaining_ms > 0.0);
}

/// Remove the `quantity` particles closest to `(x, y)`; equal distances go in list order.
pub fn remove_nearest(particles: &mut Vec<Particle>, x: f32, y: f32, quantity: usize) -> usize {
    let quantity = quantity.min(particles.len());
    if quantity == 0 {
        return 0;
    }
    let mut ranked: Vec<(OrderedFloat<f32>, usize)> = particles
        .iter()
        .enumerate()
        .map(|(id, particle)| {
            let dx = particle.x - x;
            let dy = particle.y - y;
            (OrderedFloat(dx * dx + dy * dy), id)
        })
        .collect();
    ranked.sort_unstable();

    let mut doomed = vec![false; particles.len()];
    for &(_, id) in ranked.iter().take(quantity) {
        doomed[id] = true;
    }
    let mut cursor = 0;
    particles.retain(|_| {
        let keep = !doomed[cursor];
        cursor += 1;
        keep
    });
    quantity
}
