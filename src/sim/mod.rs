//! Deterministic simulation module
//!
//! All episode logic lives here. This module must be pure and deterministic:
//! - Fixed control timestep only
//! - Seeded RNG only
//! - Stable iteration order (by object name)
//! - No I/O or platform dependencies

pub mod collision;
pub mod contacts;
pub mod control;
pub mod factory;
pub mod goals;
pub mod observation;
pub mod physics;
pub mod reward;
pub mod state;
pub mod termination;
pub mod world;

pub use collision::CollisionResult;
pub use contacts::{ContactReport, ContactResolver};
pub use control::{StepController, direction_penalty, to_world_action};
pub use factory::WorldObjectFactory;
pub use goals::{Goal, GoalManager, Goals};
pub use observation::{AgentObservation, Kinematics, OBSERVATION_SIZE, agent_observation};
pub use physics::{BodyDef, BodyHandle, BodyKind, CollisionFilter, PhysicsWorld, Shape};
pub use reward::{RewardContext, RewardEngine};
pub use state::{ObjectId, ObjectRole, Registry, Side, Table, WorldObject};
pub use termination::{RegionFacts, Termination, TerminationEvaluator};
pub use world::TableWorld;
