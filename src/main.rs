//! Air Hockey - scripted demo episode
//!
//! Usage: `air-hockey [config.json]`

use air_hockey::{AirHockeyEnv, EnvConfig, EnvError, Observation};

/// Largest positional delta the scripted paddle asks for per step
const TRACK_STEP: f32 = 0.05;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Air Hockey demo starting...");

    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<(), EnvError> {
    let config = match std::env::args().nth(1) {
        Some(path) => EnvConfig::load(path)?,
        None => EnvConfig::default(),
    };
    let multiagent = config.multiagent();
    let mut env = AirHockeyEnv::new(config)?;
    let (mut observation, info) = env.reset(None, None, None);
    log::info!("Episode seed {}", info.seed);

    let mut episode_return = 0.0;
    let mut steps = 0u32;
    loop {
        let action = track_puck(observation.ego());
        let other = match &observation {
            Observation::Joint { alt, .. } if multiagent => Some(track_puck(alt)),
            _ => None,
        };
        let outcome = env.step(action, other)?;
        episode_return += outcome.reward.ego();
        steps += 1;

        for target in &outcome.info.absorbed_targets {
            log::info!("Step {}: absorbed {}", steps, target);
        }
        if outcome.terminated || outcome.truncated {
            break;
        }
        observation = outcome.observation;
    }

    log::info!(
        "Episode finished after {} steps, return {:.3}",
        steps,
        episode_return
    );
    println!("steps={} return={:.3}", steps, episode_return);
    Ok(())
}

/// Move toward the puck, never more than `TRACK_STEP` per axis
fn track_puck(obs: &[f32; 8]) -> [f32; 2] {
    let dx = obs[4] - obs[0];
    let dy = obs[5] - obs[1];
    [dx.clamp(-TRACK_STEP, TRACK_STEP), dy.clamp(-TRACK_STEP, TRACK_STEP)]
}
