//! Episode engine
//!
//! `AirHockeyEnv` owns the physics world, the object registry and the RNG,
//! and runs one control step per `step` call:
//! control force -> physics step -> contacts -> termination -> reward ->
//! observation.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::{EnvConfig, Gravity};
use crate::consts::{POSITION_ITERATIONS, VELOCITY_ITERATIONS};
use crate::error::{EnvError, Result};
use crate::sim::factory::uniform;
use crate::sim::goals::{self, Goals};
use crate::sim::{
    AgentObservation, ContactResolver, GoalManager, Kinematics, PhysicsWorld, RegionFacts,
    Registry, RewardContext, RewardEngine, Side, StepController, Table, TableWorld,
    TerminationEvaluator, WorldObjectFactory, agent_observation, to_world_action,
};
use crate::spaces::{self, BoxSpace, ObservationSpace};

/// What the learner sees after reset or step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    /// Single agent, no goal
    Flat(AgentObservation),
    /// Single agent with goal vectors
    Goal {
        observation: AgentObservation,
        desired_goal: Vec<f32>,
        achieved_goal: Vec<f32>,
    },
    /// Both paddles, each in its own frame
    Joint {
        ego: AgentObservation,
        alt: AgentObservation,
    },
}

impl Observation {
    /// The ego agent's base observation
    pub fn ego(&self) -> &AgentObservation {
        match self {
            Observation::Flat(obs) => obs,
            Observation::Goal { observation, .. } => observation,
            Observation::Joint { ego, .. } => ego,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reward {
    Single(f32),
    Joint { ego: f32, alt: f32 },
}

impl Reward {
    pub fn ego(&self) -> f32 {
        match *self {
            Reward::Single(r) => r,
            Reward::Joint { ego, .. } => ego,
        }
    }
}

/// Per-step diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    #[serde(flatten)]
    pub facts: RegionFacts,
    pub hit_a_puck: bool,
    /// Pucks that touched a target this step
    pub pucks_on_targets: Vec<String>,
    /// Targets destroyed this step
    pub absorbed_targets: Vec<String>,
    pub direction_penalty: f32,
    pub wall_penalty: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetInfo {
    pub seed: u64,
    /// Forward-axis gravity for this episode
    pub gravity: f32,
    pub goals: Option<Goals>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: Reward,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

/// Air hockey episode engine
pub struct AirHockeyEnv<W: PhysicsWorld = TableWorld> {
    config: EnvConfig,
    table: Table,
    world: W,
    registry: Registry,
    factory: WorldObjectFactory,
    goal_manager: GoalManager,
    controller: StepController,
    contacts: ContactResolver,
    termination: TerminationEvaluator,
    rewards: RewardEngine,
    goals: Option<Goals>,
    rng: Pcg32,
    gravity: f32,
    current_timestep: u32,
    n_timesteps_so_far: u64,
}

impl AirHockeyEnv<TableWorld> {
    /// Create an environment on the built-in table physics
    pub fn new(config: EnvConfig) -> Result<Self> {
        let table = Table::from_config(&config);
        let world = TableWorld::new(Vec2::ZERO, table.half_extents());
        Self::with_world(config, world)
    }
}

impl<W: PhysicsWorld> AirHockeyEnv<W> {
    /// Create an environment on any physics backend and run the first reset
    pub fn with_world(config: EnvConfig, world: W) -> Result<Self> {
        config.validate()?;
        let table = Table::from_config(&config);
        let seed = config.seed.unwrap_or_else(rand::random);

        log::info!(
            "Creating air hockey env: {}x{} table, {} paddle(s), reward {}",
            table.length,
            table.width,
            config.num_paddles,
            config.reward_type
        );

        let mut env = Self {
            table,
            world,
            registry: Registry::new(),
            factory: WorldObjectFactory::from_config(&config, table),
            goal_manager: GoalManager::from_config(&config, table),
            controller: StepController::from_config(&config),
            contacts: ContactResolver::new(config.absorb_target),
            termination: TerminationEvaluator::from_config(&config, table),
            rewards: RewardEngine::from_config(&config),
            goals: None,
            rng: Pcg32::seed_from_u64(seed),
            gravity: 0.0,
            current_timestep: 0,
            n_timesteps_so_far: 0,
            config,
        };
        env.reset(Some(seed), None, None);
        Ok(env)
    }

    /// Start a new episode
    ///
    /// Goal overrides are forward-first `[y, x]` pairs. Without a seed the
    /// next seed is drawn from the environment's own RNG.
    pub fn reset(
        &mut self,
        seed: Option<u64>,
        ego_goal: Option<[f32; 2]>,
        alt_goal: Option<[f32; 2]>,
    ) -> (Observation, ResetInfo) {
        let seed = seed.unwrap_or_else(|| self.rng.random());
        self.rng = Pcg32::seed_from_u64(seed);

        for id in self.registry.ids().collect::<Vec<_>>() {
            if let Some(object) = self.registry.remove(id) {
                self.world.destroy_body(object.body);
            }
        }
        self.registry.clear();

        self.gravity = match self.config.gravity {
            Gravity::Fixed(g) => g,
            Gravity::Range([low, high]) => uniform(&mut self.rng, low, high),
        };
        self.world.set_gravity(Vec2::new(0.0, self.gravity));

        self.n_timesteps_so_far += u64::from(self.current_timestep);
        self.current_timestep = 0;

        self.goals = self.config.reward_type.samples_goal().then(|| {
            self.goal_manager.sample(
                &mut self.rng,
                self.n_timesteps_so_far,
                self.config.multiagent(),
                ego_goal,
                alt_goal,
            )
        });

        self.factory
            .build(&mut self.world, &mut self.registry, &mut self.rng);

        log::info!(
            "Reset episode: seed {}, gravity {:.2}, goal radius {:?}",
            seed,
            self.gravity,
            self.goals.map(|g| g.ego.radius)
        );

        let info = ResetInfo {
            seed,
            gravity: self.gravity,
            goals: self.goals,
        };
        (self.observation(), info)
    }

    /// Advance one control step
    ///
    /// `action` is the ego paddle's positional delta. In multi-agent mode
    /// `other_action` is required and is read in the alt paddle's own frame.
    pub fn step(&mut self, action: [f32; 2], other_action: Option<[f32; 2]>) -> Result<StepOutcome> {
        let multiagent = self.config.multiagent();
        let alt_action = match (multiagent, other_action) {
            (true, None) => return Err(EnvError::MissingAltAction),
            (true, Some(a)) => Some(a),
            (false, _) => None,
        };

        let ego_paddle = self.registry.paddle(Side::Ego).map(|p| (p.body, p.radius));
        let alt_paddle = self.registry.paddle(Side::Alt).map(|p| p.body);

        let mut direction_penalty = 0.0;
        if let Some((body, _)) = ego_paddle {
            let world_action = to_world_action(Side::Ego, action);
            direction_penalty = self
                .controller
                .apply(&mut self.world, body, Side::Ego, world_action);
        }
        if let (Some(body), Some(a)) = (alt_paddle, alt_action) {
            let world_action = to_world_action(Side::Alt, a);
            self.controller
                .apply(&mut self.world, body, Side::Alt, world_action);
        }

        self.world.step(
            self.config.time_per_step(),
            VELOCITY_ITERATIONS,
            POSITION_ITERATIONS,
        );

        let mut wall_penalty = 0.0;
        if let Some((body, radius)) = ego_paddle {
            self.controller.clamp_velocity(&mut self.world, body);
            let radius = radius.unwrap_or(self.config.paddle_radius);
            wall_penalty = self
                .controller
                .wall_bump(&self.table, self.world.position(body), radius);
        }
        if let Some(body) = alt_paddle {
            self.controller.clamp_velocity(&mut self.world, body);
        }

        let report = self.contacts.resolve(&mut self.world, &mut self.registry);

        let puck = self.puck_kinematics();
        let ego = self.paddle_kinematics(Side::Ego);
        let termination = self.termination.evaluate(
            self.current_timestep,
            ego.position,
            puck.position,
            self.goals.as_ref(),
            multiagent,
        );
        let facts = termination.facts;

        let context = |side: Side| RewardContext {
            side,
            puck_position: puck.position,
            puck_velocity: puck.velocity,
            hit_a_puck: report.hit_a_puck,
            puck_within_opponent_home: facts.puck_within_opponent_home(side),
            goal: self.goals.as_ref().and_then(|g| match side {
                Side::Ego => Some(&g.ego),
                Side::Alt => g.alt.as_ref(),
            }),
        };

        let (reward, direction_penalty, wall_penalty) = if multiagent {
            let (ego, alt) = self.rewards.joint(&context(Side::Ego), &context(Side::Alt))?;
            (Reward::Joint { ego, alt }, 0.0, 0.0)
        } else {
            let base = if termination.truncated {
                self.config.truncate_rew
            } else {
                self.rewards.evaluate(&context(Side::Ego))?
            };
            (
                Reward::Single(base + wall_penalty + direction_penalty),
                direction_penalty,
                wall_penalty,
            )
        };

        if termination.terminated || termination.truncated {
            log::debug!(
                "Episode ended at step {} (terminated: {}, truncated: {})",
                self.current_timestep,
                termination.terminated,
                termination.truncated
            );
        }
        self.current_timestep += 1;

        Ok(StepOutcome {
            observation: self.observation(),
            reward,
            terminated: termination.terminated,
            truncated: termination.truncated,
            info: StepInfo {
                facts,
                hit_a_puck: report.hit_a_puck,
                pucks_on_targets: report.pucks_on_targets,
                absorbed_targets: report.absorbed_targets,
                direction_penalty,
                wall_penalty,
            },
        })
    }

    /// Goal reward for relabeled goal batches (row-major)
    pub fn compute_reward(&self, achieved: &[f32], desired: &[f32]) -> Result<Vec<f32>> {
        let radius = self
            .goals
            .map(|g| g.ego.radius)
            .unwrap_or_else(|| self.goal_manager.radius(self.n_timesteps_so_far));
        self.rewards.compute_reward(achieved, desired, radius)
    }

    /// The primary puck's goal vector
    pub fn achieved_goal(&self) -> Result<Vec<f32>> {
        let puck = self.puck_kinematics();
        goals::achieved_goal(self.config.reward_type, puck.position, puck.velocity)
    }

    /// The ego goal vector
    pub fn desired_goal(&self) -> Result<Vec<f32>> {
        let reward_type = self.config.reward_type;
        let sampled = self
            .goals
            .as_ref()
            .ok_or(EnvError::NotGoalConditioned(reward_type))?;
        goals::desired_goal(reward_type, &sampled.ego)
    }

    pub fn observation_space(&self) -> ObservationSpace {
        spaces::observation_space(&self.config)
    }

    pub fn action_space(&self) -> BoxSpace {
        spaces::action_space()
    }

    pub fn reward_range(&self) -> (f32, f32) {
        spaces::reward_range()
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn goals(&self) -> Option<&Goals> {
        self.goals.as_ref()
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn current_timestep(&self) -> u32 {
        self.current_timestep
    }

    pub fn n_timesteps_so_far(&self) -> u64 {
        self.n_timesteps_so_far
    }

    pub fn multiagent(&self) -> bool {
        self.config.multiagent()
    }

    fn puck_kinematics(&self) -> Kinematics {
        self.registry
            .primary_puck()
            .map(|p| Kinematics::of(&self.world, p.body))
            .unwrap_or_default()
    }

    fn paddle_kinematics(&self, side: Side) -> Kinematics {
        self.registry
            .paddle(side)
            .map(|p| Kinematics::of(&self.world, p.body))
            .unwrap_or_default()
    }

    fn observation(&self) -> Observation {
        let puck = self.puck_kinematics();
        let ego = agent_observation(Side::Ego, self.paddle_kinematics(Side::Ego), puck);

        if self.config.multiagent() {
            let alt = agent_observation(Side::Alt, self.paddle_kinematics(Side::Alt), puck);
            return Observation::Joint { ego, alt };
        }

        match (self.config.reward_type.goal_layout(), self.goals.as_ref()) {
            (Some(_), Some(sampled)) => {
                let reward_type = self.config.reward_type;
                Observation::Goal {
                    observation: ego,
                    desired_goal: goals::desired_goal(reward_type, &sampled.ego).unwrap_or_default(),
                    achieved_goal: goals::achieved_goal(reward_type, puck.position, puck.velocity)
                        .unwrap_or_default(),
                }
            }
            _ => Observation::Flat(ego),
        }
    }
}
