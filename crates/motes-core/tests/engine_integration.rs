use std::cell::{Cell, RefCell};
use std::rc::Rc;

use motes_core::config::{ClickMode, HoverMode, ImageSource, OscillationConfig};
use motes_core::{
    AssetCompleter, AssetHandle, AssetLoader, DrawCommand, EngineError, EngineState, FRAME_MS,
    MAX_PARTICLES, ManualScheduler, MotesConfig, MotesEngine, Preset, RecordingSurface, ShapeKind,
    Tick,
};
use serde_json::json;

type TestEngine = MotesEngine<RecordingSurface, ManualScheduler>;

fn fixed_config(count: u32) -> MotesConfig {
    let mut config = MotesConfig::default();
    config.rng_seed = Some(7);
    config.particles.number.value = count;
    config.particles.number.density.enable = false;
    config
}

fn engine(config: MotesConfig, width: f32, height: f32) -> TestEngine {
    MotesEngine::new(
        config,
        RecordingSurface::new(width, height),
        ManualScheduler::new(),
    )
    .expect("engine builds")
}

#[test]
fn density_overflow_is_capped_at_two_thousand() {
    let mut config = MotesConfig::default();
    config.rng_seed = Some(1);
    config.particles.number.value = 80;
    config.particles.number.density.enable = true;
    config.particles.number.density.value_area = 0.001;
    let engine = engine(config, 1920.0, 1080.0);
    assert_eq!(engine.particles().len(), MAX_PARTICLES);
}

#[test]
fn density_formula_sizes_the_population() {
    let mut config = MotesConfig::default();
    config.rng_seed = Some(1);
    config.particles.number.value = 80;
    config.particles.number.density.value_area = 800.0;
    let engine = engine(config, 1000.0, 1000.0);
    assert_eq!(engine.particles().len(), 100);
}

#[test]
fn first_frame_only_records_a_baseline() {
    let mut engine = engine(fixed_config(12), 400.0, 300.0);
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.scheduler().requests(), 1);

    assert!(engine.on_frame(1_000.0).is_none());
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.tick(), Tick::zero());
    assert_eq!(engine.surface().clears(), 0);
    assert_eq!(engine.scheduler().requests(), 2);

    let report = engine.on_frame(1_000.0 + FRAME_MS).expect("second frame ticks");
    assert_eq!(report.tick, Tick(1));
    assert!((report.delta - 1.0).abs() < 1e-5);
    assert_eq!(report.particles, 12);
    assert_eq!(engine.surface().clears(), 1);
    assert_eq!(engine.surface().particles().count(), 12);
    assert_eq!(engine.scheduler().requests(), 3);
}

#[test]
fn stalled_clock_advances_by_one_nominal_frame() {
    let mut engine = engine(fixed_config(3), 400.0, 300.0);
    engine.on_frame(0.0);
    let report = engine.on_frame(5_000.0).expect("tick");
    assert_eq!(report.delta, 1.0);

    let report = engine.on_frame(5_000.0 + 2.0 * FRAME_MS).expect("tick");
    assert!((report.delta - 2.0).abs() < 1e-5);
}

#[test]
fn animated_radius_and_opacity_stay_in_range() {
    let mut config = fixed_config(40);
    config.particles.size.value = 5.0;
    config.particles.size.anim = OscillationConfig {
        enable: true,
        speed: 40.0,
        minimum: 1.0,
        sync: false,
    };
    config.particles.opacity.value = 0.8;
    config.particles.opacity.random = true;
    config.particles.opacity.anim = OscillationConfig {
        enable: true,
        speed: 3.0,
        minimum: 0.1,
        sync: false,
    };
    let mut engine = engine(config, 300.0, 300.0);
    for _ in 0..200 {
        engine.step(1.3).expect("running");
        for particle in engine.particles() {
            assert!((1.0..=5.0).contains(&particle.radius), "radius {}", particle.radius);
            assert!((0.0..=1.0).contains(&particle.opacity), "opacity {}", particle.opacity);
        }
    }
}

#[test]
fn bubble_mode_resets_even_with_hover_disabled() {
    let mut config = fixed_config(25);
    config.interactivity.events.on_hover.enable = false;
    config.interactivity.events.on_hover.mode = HoverMode::Bubble;
    let mut engine = engine(config, 300.0, 300.0);
    engine.pointer_move(150.0, 150.0);
    for _ in 0..5 {
        engine.step(1.0).expect("running");
        for particle in engine.particles() {
            assert_eq!(particle.radius, particle.base_radius());
            assert_eq!(particle.opacity, particle.base_opacity());
        }
    }
}

#[test]
fn bubble_decays_fully_once_the_pointer_leaves() {
    let mut config = fixed_config(25);
    config.particles.movement.enable = false;
    config.interactivity.events.on_hover.enable = true;
    config.interactivity.events.on_hover.mode = HoverMode::Bubble;
    config.interactivity.modes.bubble.distance = 10_000.0;
    let mut engine = engine(config, 300.0, 300.0);

    engine.pointer_move(150.0, 150.0);
    engine.step(1.0).expect("running");
    assert!(
        engine
            .particles()
            .iter()
            .any(|particle| particle.radius != particle.base_radius())
    );

    engine.pointer_leave();
    engine.step(1.0).expect("running");
    for particle in engine.particles() {
        assert_eq!(particle.radius, particle.base_radius());
        assert_eq!(particle.opacity, particle.base_opacity());
    }
}

#[test]
fn push_click_spawns_quantity_at_click_point() {
    let mut config = fixed_config(10);
    config.interactivity.events.on_click.mode = ClickMode::Push;
    config.interactivity.modes.push.quantity = 4;
    let mut engine = engine(config, 400.0, 400.0);

    engine.click(123.0, 45.0);
    let particles = engine.particles();
    assert_eq!(particles.len(), 14);
    for particle in &particles[10..] {
        assert_eq!((particle.x, particle.y), (123.0, 45.0));
    }
}

#[test]
fn remove_click_drops_the_two_nearest() {
    let mut config = fixed_config(20);
    config.interactivity.events.on_click.mode = ClickMode::Remove;
    config.interactivity.modes.remove.quantity = 2;
    let mut engine = engine(config, 400.0, 400.0);

    let (cx, cy) = (200.0f32, 200.0f32);
    let before: Vec<(f32, f32)> = engine.particles().iter().map(|p| (p.x, p.y)).collect();
    let mut ranked: Vec<(f32, usize)> = before
        .iter()
        .enumerate()
        .map(|(id, &(x, y))| ((x - cx) * (x - cx) + (y - cy) * (y - cy), id))
        .collect();
    ranked.sort_by(|a, b| a.partial_cmp(b).expect("finite distances"));
    let doomed = [ranked[0].1, ranked[1].1];
    let expected: Vec<(f32, f32)> = before
        .iter()
        .enumerate()
        .filter(|(id, _)| !doomed.contains(id))
        .map(|(_, &point)| point)
        .collect();

    engine.click(cx, cy);
    let after: Vec<(f32, f32)> = engine.particles().iter().map(|p| (p.x, p.y)).collect();
    assert_eq!(after, expected);
}

#[test]
fn disabled_click_leaves_population_alone() {
    let mut config = fixed_config(8);
    config.interactivity.events.on_click.enable = false;
    let mut engine = engine(config, 400.0, 400.0);
    engine.click(10.0, 10.0);
    assert_eq!(engine.particles().len(), 8);
}

#[test]
fn repulse_click_starts_a_burst_that_expires() {
    let mut config = fixed_config(8);
    config.interactivity.events.on_click.mode = ClickMode::Repulse;
    config.interactivity.modes.repulse.duration = 0.1;
    let mut engine = engine(config, 400.0, 400.0);
    engine.click(200.0, 200.0);
    assert_eq!(engine.active_bursts().len(), 1);
    for _ in 0..7 {
        engine.step(1.0).expect("running");
    }
    assert!(engine.active_bursts().is_empty());
}

#[test]
fn repulse_without_movement_keeps_particles_on_canvas() {
    let mut config = fixed_config(30);
    config.particles.movement.enable = false;
    config.interactivity.events.on_hover.enable = true;
    config.interactivity.events.on_hover.mode = HoverMode::Repulse;
    config.interactivity.modes.repulse.distance = 400.0;
    let (width, height) = (100.0, 100.0);
    let mut engine = engine(config, width, height);
    engine.pointer_move(50.0, 50.0);

    for _ in 0..200 {
        engine.step(1.0).expect("running");
        for particle in engine.particles() {
            let r = particle.radius;
            assert!(
                particle.x + r >= 0.0
                    && particle.x - r <= width
                    && particle.y + r >= 0.0
                    && particle.y - r <= height,
                "particle left the canvas at ({}, {})",
                particle.x,
                particle.y
            );
        }
    }
}

#[test]
fn attraction_is_inert_without_movement() {
    let mut config = fixed_config(40);
    config.particles.movement.enable = false;
    config.particles.movement.attract.enable = true;
    config.particles.movement.attract.rotate_x = 600.0;
    config.particles.movement.attract.rotate_y = 1200.0;
    let mut engine = engine(config, 200.0, 200.0);
    let before: Vec<_> = engine
        .particles()
        .iter()
        .map(|p| (p.x, p.y, p.vx, p.vy))
        .collect();

    for _ in 0..10 {
        engine.step(1.0).expect("running");
    }
    let after: Vec<_> = engine
        .particles()
        .iter()
        .map(|p| (p.x, p.y, p.vx, p.vy))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn stepping_an_idle_engine_starts_it() {
    let mut engine = engine(fixed_config(5), 200.0, 200.0);
    assert_eq!(engine.state(), EngineState::Idle);
    let report = engine.step(1.0).expect("ticks");
    assert_eq!(report.tick, Tick(1));
    assert_eq!(engine.state(), EngineState::Running);

    // The first frame callback still only records its baseline.
    assert!(engine.on_frame(500.0).is_none());
    assert_eq!(engine.tick(), Tick(1));
    assert_eq!(engine.state(), EngineState::Running);
}

#[test]
fn grab_links_are_drawn_before_particles() {
    let mut config = fixed_config(30);
    config.particles.movement.enable = false;
    config.interactivity.events.on_hover.enable = true;
    config.interactivity.events.on_hover.mode = HoverMode::Grab;
    config.interactivity.modes.grab.distance = 140.0;
    let mut engine = engine(config, 200.0, 200.0);
    engine.pointer_move(100.0, 100.0);

    let report = engine.step(1.0).expect("running");
    let commands = engine.surface().commands();
    assert!(report.links > 0);
    assert_eq!(report.links, engine.surface().links().count());
    let first_particle = commands
        .iter()
        .position(|command| matches!(command, DrawCommand::Particle(_)))
        .expect("particles drawn");
    assert!(
        commands[..first_particle]
            .iter()
            .all(|command| matches!(command, DrawCommand::Link(_)))
    );
    assert_eq!(first_particle, report.links);
}

#[test]
fn depth_enabled_particles_draw_prepared_sprites() {
    let mut config = fixed_config(6);
    config.particles.depth.enable = true;
    let mut engine = engine(config, 200.0, 200.0);
    assert_eq!(engine.surface().sprites().len(), 18);
    engine.step(1.0).expect("running");
    assert!(engine.surface().particles().all(|record| record.sprite.is_some()));
}

#[test]
fn resize_reinitialises_and_rejects_bad_surfaces() {
    let mut config = MotesConfig::default();
    config.rng_seed = Some(3);
    config.particles.number.value = 80;
    config.particles.number.density.value_area = 800.0;
    let mut engine = engine(config, 1000.0, 1000.0);
    assert_eq!(engine.particles().len(), 100);

    engine.surface_mut().set_size(2000.0, 1000.0);
    engine.resize().expect("valid size");
    assert_eq!(engine.particles().len(), 200);
    assert_eq!(engine.bounds().width, 2000.0);

    engine.surface_mut().set_size(f32::NAN, 10.0);
    assert!(matches!(engine.resize(), Err(EngineError::InvalidSurface(_))));
    assert_eq!(engine.particles().len(), 200);
}

#[test]
fn construction_rejects_invalid_surface() {
    let result = MotesEngine::new(
        fixed_config(1),
        RecordingSurface::new(-1.0, 10.0),
        ManualScheduler::new(),
    );
    assert!(matches!(result, Err(EngineError::InvalidSurface(_))));
}

#[test]
fn preset_overrides_flow_into_engine() {
    let engine = MotesEngine::from_preset(
        Preset::Snow,
        &json!({ "rng_seed": 9, "particles": { "number": { "value": 5, "density": { "enable": false } } } }),
        RecordingSurface::new(320.0, 240.0),
        ManualScheduler::new(),
    )
    .expect("engine builds");
    assert_eq!(engine.particles().len(), 5);
    assert!(engine.config().particles.sway.enable);

    let failed = MotesEngine::from_preset(
        Preset::Default,
        &json!({ "particles": { "gravity": 1 } }),
        RecordingSurface::new(320.0, 240.0),
        ManualScheduler::new(),
    );
    assert!(matches!(failed, Err(EngineError::Config(_))));
}

#[test]
fn destroy_cancels_next_frame_and_detaches() {
    let mut engine = engine(fixed_config(4), 100.0, 100.0);
    engine.on_frame(0.0);
    let pending = engine.scheduler().pending().expect("next frame requested");

    engine.destroy();
    assert_eq!(engine.state(), EngineState::Destroyed);
    assert_eq!(engine.scheduler().cancelled(), &[pending]);
    assert!(engine.scheduler().pending().is_none());
    assert!(engine.scheduler().is_detached());

    let requests = engine.scheduler().requests();
    assert!(engine.on_frame(16.0).is_none());
    assert!(engine.step(1.0).is_none());
    assert_eq!(engine.scheduler().requests(), requests);

    engine.destroy();
    assert_eq!(engine.scheduler().cancelled().len(), 1);
}

struct DeferredLoader {
    completers: Rc<RefCell<Vec<AssetCompleter>>>,
}

impl AssetLoader for DeferredLoader {
    fn load(&mut self, _source: &ImageSource) -> AssetHandle {
        let (handle, completer) = AssetHandle::pending();
        self.completers.borrow_mut().push(completer);
        handle
    }
}

fn image_engine(count: u32) -> (TestEngine, Rc<RefCell<Vec<AssetCompleter>>>) {
    let mut config = fixed_config(count);
    config.particles.shape.kinds = vec![ShapeKind::Image];
    config.particles.shape.images = vec![ImageSource {
        src: "flake.png".to_string(),
        width: 32.0,
        height: 32.0,
    }];
    let completers = Rc::new(RefCell::new(Vec::new()));
    let engine = MotesEngine::with_asset_loader(
        config,
        RecordingSurface::new(200.0, 200.0),
        ManualScheduler::new(),
        DeferredLoader {
            completers: Rc::clone(&completers),
        },
    )
    .expect("engine builds");
    (engine, completers)
}

#[test]
fn assets_ready_fires_exactly_once() {
    let (mut engine, completers) = image_engine(5);
    assert_eq!(completers.borrow().len(), 5);
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    engine.on_assets_ready(move || counter.set(counter.get() + 1));

    engine.on_frame(0.0);
    assert_eq!(hits.get(), 0);

    let mut pending: Vec<AssetCompleter> = completers.borrow_mut().drain(..).collect();
    let broken = pending.pop().expect("five loads");
    broken.fail();
    for completer in pending {
        completer.complete();
    }

    engine.on_frame(FRAME_MS);
    assert_eq!(hits.get(), 1);
    assert!(engine.assets_ready());
    engine.on_frame(2.0 * FRAME_MS);
    assert!(!engine.poll_assets());
    assert_eq!(hits.get(), 1);

    let record = engine.surface().particles().next().expect("drawn");
    assert_eq!(record.shape, ShapeKind::Image);
    assert_eq!(record.image.as_deref(), Some("flake.png"));
}

#[test]
fn assets_completing_after_destroy_are_ignored() {
    let (mut engine, completers) = image_engine(3);
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    engine.on_assets_ready(move || counter.set(counter.get() + 1));

    engine.destroy();
    for completer in completers.borrow_mut().drain(..) {
        completer.complete();
    }
    assert!(!engine.poll_assets());
    assert_eq!(hits.get(), 0);
}
