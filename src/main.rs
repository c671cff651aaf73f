//! Railrunner - Headless Runner
//!
//! Builds the test course, plays a scripted input tape through the character
//! simulation and logs every state change. Pass a JSON config path as the
//! first argument to override tuning values; `RUST_LOG` controls verbosity.

use anyhow::Context;
use railrunner_game::{Level, PlayerInput, Simulation, SimulationConfig, StateId};

/// One stretch of the tape: the same input held for `ticks`.
struct Segment {
    ticks: u32,
    input: PlayerInput,
}

impl Segment {
    fn new(ticks: u32, input: PlayerInput) -> Self {
        Self { ticks, input }
    }
}

/// Run up the course, hop, crouch-slide, drift toward the rail side and
/// ride into the launcher.
fn input_tape() -> Vec<Segment> {
    let mut slide = PlayerInput::forward();
    slide.actions.action = true;

    let mut drift = PlayerInput::forward().with_axis(-0.6, 1.0);
    drift.actions.action = true;

    vec![
        Segment::new(30, PlayerInput::default()),
        Segment::new(120, PlayerInput::forward()),
        Segment::new(1, PlayerInput::forward().with_jump()),
        Segment::new(60, PlayerInput::forward()),
        Segment::new(20, slide),
        Segment::new(60, PlayerInput::forward()),
        Segment::new(1, PlayerInput::forward().with_jump()),
        Segment::new(10, PlayerInput::forward()),
        Segment::new(1, PlayerInput::forward().with_attack()),
        Segment::new(90, PlayerInput::forward()),
        Segment::new(30, drift),
        Segment::new(300, PlayerInput::forward()),
        Segment::new(60, PlayerInput::default()),
    ]
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => SimulationConfig::default(),
    };
    let level = Level::test_course().context("building test course")?;
    log::info!("level '{}' at {} Hz", level.name, config.tick_rate);

    let mut simulation = Simulation::new(config, level);
    let mut last_state = simulation.state();
    let mut visited = vec![last_state];

    for segment in input_tape() {
        for _ in 0..segment.ticks {
            simulation.tick(&segment.input);

            let state = simulation.state();
            if state != last_state {
                let pose = simulation.pose();
                log::info!(
                    "[{:>5}] {} -> {} at ({:.2}, {:.2}, {:.2}) speed {:.2}",
                    simulation.tick_count(),
                    last_state,
                    state,
                    pose.position.x,
                    pose.position.y,
                    pose.position.z,
                    pose.move_speed
                );
                if !visited.contains(&state) {
                    visited.push(state);
                }
                last_state = state;
            }
        }
    }

    let pose = simulation.pose();
    log::info!(
        "finished after {} ticks in {} at {:?}, {} transitions",
        simulation.tick_count(),
        simulation.state(),
        pose.position,
        simulation.machine().transition_count()
    );
    let names: Vec<&str> = visited.iter().map(|state: &StateId| state.name()).collect();
    log::info!("visited: {}", names.join(", "));

    Ok(())
}
