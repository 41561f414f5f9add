//! Headless ragdoll settling check.
//!
//! Drops one humanoid ragdoll onto the ground with real Avian3D physics and
//! prints per-step telemetry as CSV on stdout. Exits with status 0 once the
//! figure comes to rest, or 1 if it never settles or sinks through the ground.
//!
//! Run with: cargo run -p ragdoll-viewer --bin ragdoll-settle > settle.csv

use std::{
    io::{self, Write},
    process,
    time::Duration,
};

use avian3d::prelude::*;
use bevy::{
    app::ScheduleRunnerPlugin,
    prelude::*,
    render::settings::{RenderCreation, WgpuSettings},
};

use ragdoll_viewer::{
    constants::{DEFAULT_GRAVITY, GROUND_HALF_THICKNESS, GROUND_SIZE},
    ragdoll::{
        GameLayer, RagdollPart,
        skeleton::RagdollBlueprint,
        spawn_ragdoll,
        telemetry::{SettleSample, SettleTracker, write_header, write_row},
    },
};

/// Fixed timestep for physics simulation (60 Hz).
const FIXED_TIMESTEP: f64 = 1.0 / 60.0;

/// Height the ragdoll's feet start at.
const DROP_HEIGHT: f32 = 2.0;

/// Give up after this many simulated seconds.
const MAX_SIMULATION_TIME: f32 = 20.0;

/// Parts slower than this count as still (m/s).
const SETTLE_SPEED: f32 = 0.05;

/// How long every part must stay still.
const SETTLE_HOLD: f32 = 1.0;

/// A part center below this height has gone through the ground.
const SINK_LIMIT: f32 = -0.05;

/// Progress of the settling run.
#[derive(Resource)]
struct SettleRun {
    elapsed: f32,
    tracker: SettleTracker,
    last: Option<SettleSample>,
}

impl Default for SettleRun {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            tracker: SettleTracker::new(SETTLE_SPEED, SETTLE_HOLD),
            last: None,
        }
    }
}

/// Spawn the ground slab and drop the ragdoll.
fn setup(mut commands: Commands) {
    commands.spawn((
        Name::new("Ground"),
        RigidBody::Static,
        Collider::cuboid(GROUND_SIZE, GROUND_HALF_THICKNESS * 2.0, GROUND_SIZE),
        Transform::from_xyz(0.0, -GROUND_HALF_THICKNESS, 0.0),
        CollisionLayers::new(GameLayer::Ground, [GameLayer::Ground, GameLayer::Ragdoll]),
    ));

    let blueprint = RagdollBlueprint::humanoid();
    if let Err(err) = blueprint.validate() {
        eprintln!("# ERROR: invalid ragdoll blueprint: {err}");
        process::exit(1);
    }

    let spawned = spawn_ragdoll(
        &mut commands,
        &blueprint,
        Vec3::new(0.0, DROP_HEIGHT, 0.0),
        0.0,
    );
    eprintln!(
        "# Dropped ragdoll with {} parts from {DROP_HEIGHT:.1} m",
        spawned.parts.len()
    );

    if let Err(err) = write_header(&mut io::stdout().lock()) {
        eprintln!("# ERROR: failed to write CSV header: {err}");
        process::exit(1);
    }
}

/// Sample the ragdoll, emit a CSV row and decide whether the run is over.
fn measure(
    time: Res<Time>,
    mut run: ResMut<SettleRun>,
    parts: Query<(&Position, &LinearVelocity), With<RagdollPart>>,
) {
    let dt = time.delta_secs();
    run.elapsed += dt;

    let Some(sample) =
        SettleSample::from_parts(run.elapsed, parts.iter().map(|(pos, vel)| (pos.0, vel.0)))
    else {
        return;
    };

    let mut stdout = io::stdout().lock();
    if let Err(err) = write_row(&mut stdout, &sample).and_then(|()| stdout.flush()) {
        eprintln!("# ERROR: failed to write CSV row: {err}");
        process::exit(1);
    }
    drop(stdout);

    let settled = run.tracker.observe(sample.max_speed, dt);
    run.last = Some(sample);

    if sample.lowest_y < SINK_LIMIT {
        summarize(&run, "sank through the ground");
        process::exit(1);
    }
    if settled {
        summarize(&run, "settled");
        process::exit(0);
    }
    if run.elapsed >= MAX_SIMULATION_TIME {
        summarize(&run, "timed out");
        process::exit(1);
    }
}

fn summarize(run: &SettleRun, outcome: &str) {
    eprintln!();
    eprintln!("# === Ragdoll {outcome} ===");
    eprintln!("#   Simulated: {:.2} s", run.elapsed);
    eprintln!("#   Still for: {:.2} s", run.tracker.still_for());
    if let Some(last) = run.last {
        eprintln!("#   Max speed: {:.4} m/s", last.max_speed);
        eprintln!(
            "#   Height range: {:.3} m - {:.3} m",
            last.lowest_y, last.highest_y
        );
    }
}

fn main() {
    App::new()
        // Headless plugins: DefaultPlugins without windowing or a GPU backend.
        .add_plugins(
            DefaultPlugins
                .set(bevy::render::RenderPlugin {
                    render_creation: RenderCreation::Automatic(WgpuSettings {
                        backends: None,
                        ..default()
                    }),
                    ..default()
                })
                .disable::<bevy::winit::WinitPlugin>(),
        )
        .add_plugins(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            FIXED_TIMESTEP,
        )))
        .add_plugins(PhysicsPlugins::default().with_length_unit(1.0))
        .insert_resource(Gravity(Vec3::Y * DEFAULT_GRAVITY))
        .insert_resource(Time::<Fixed>::from_seconds(FIXED_TIMESTEP))
        .init_resource::<SettleRun>()
        .add_systems(Startup, setup)
        .add_systems(FixedPostUpdate, measure.after(PhysicsSystems::Last))
        .run();
}
