//! Episode end conditions and region facts

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::goals::{Goals, within_region};
use super::state::{Side, Table};
use crate::config::EnvConfig;

/// Where the puck ended up this step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFacts {
    /// Inside the ego home region
    pub puck_within_home: bool,
    /// Inside the alt home region (far end)
    pub puck_within_alt_home: bool,
    pub puck_within_ego_goal: bool,
    pub puck_within_alt_goal: bool,
}

impl RegionFacts {
    /// Whether the puck is in the home region defended by `side`'s opponent
    pub fn puck_within_opponent_home(&self, side: Side) -> bool {
        match side {
            Side::Ego => self.puck_within_alt_home,
            Side::Alt => self.puck_within_home,
        }
    }
}

/// Termination flags plus the facts they were derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub terminated: bool,
    pub truncated: bool,
    pub facts: RegionFacts,
}

#[derive(Debug, Clone)]
pub struct TerminationEvaluator {
    table: Table,
    max_timesteps: u32,
    terminate_on_out_of_bounds: bool,
    terminate_on_enemy_goal: bool,
}

impl TerminationEvaluator {
    pub fn from_config(config: &EnvConfig, table: Table) -> Self {
        Self {
            table,
            max_timesteps: config.max_timesteps,
            terminate_on_out_of_bounds: config.terminate_on_out_of_bounds,
            terminate_on_enemy_goal: config.terminate_on_enemy_goal,
        }
    }

    pub fn region_facts(&self, puck: Vec2, goals: Option<&Goals>) -> RegionFacts {
        let home_radius = self.table.home_radius();
        RegionFacts {
            puck_within_home: within_region(puck, self.table.home_anchor(Side::Ego), home_radius),
            puck_within_alt_home: within_region(puck, self.table.home_anchor(Side::Alt), home_radius),
            puck_within_ego_goal: goals.is_some_and(|g| g.ego.contains(puck)),
            puck_within_alt_goal: goals.and_then(|g| g.alt).is_some_and(|g| g.contains(puck)),
        }
    }

    /// Evaluate before the step counter advances
    pub fn evaluate(
        &self,
        current_timestep: u32,
        ego_paddle: Vec2,
        puck: Vec2,
        goals: Option<&Goals>,
        multiagent: bool,
    ) -> Termination {
        let facts = self.region_facts(puck, goals);
        let mut terminated = current_timestep > self.max_timesteps;

        let mut truncated = !terminated
            && ((self.terminate_on_out_of_bounds && ego_paddle.y > 0.0)
                || (self.terminate_on_enemy_goal && facts.puck_within_alt_home));

        if multiagent {
            terminated = terminated
                || truncated
                || facts.puck_within_home
                || facts.puck_within_alt_home;
            truncated = false;
        }

        Termination {
            terminated,
            truncated,
            facts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::goals::Goal;

    fn evaluator(config: EnvConfig) -> TerminationEvaluator {
        let table = Table::from_config(&config);
        TerminationEvaluator::from_config(&config, table)
    }

    #[test]
    fn test_time_limit_is_exclusive() {
        let eval = evaluator(EnvConfig {
            max_timesteps: 3,
            ..Default::default()
        });
        let paddle = Vec2::new(0.0, -4.0);
        let puck = Vec2::ZERO;
        for t in 0..=3 {
            assert!(!eval.evaluate(t, paddle, puck, None, false).terminated);
        }
        assert!(eval.evaluate(4, paddle, puck, None, false).terminated);
    }

    #[test]
    fn test_out_of_bounds_truncates() {
        let eval = evaluator(EnvConfig {
            terminate_on_out_of_bounds: true,
            ..Default::default()
        });
        let result = eval.evaluate(0, Vec2::new(0.0, 0.1), Vec2::ZERO, None, false);
        assert!(result.truncated);
        assert!(!result.terminated);

        let off = evaluator(EnvConfig::default());
        assert!(!off.evaluate(0, Vec2::new(0.0, 0.1), Vec2::ZERO, None, false).truncated);
    }

    #[test]
    fn test_enemy_goal_truncates() {
        let eval = evaluator(EnvConfig {
            terminate_on_enemy_goal: true,
            ..Default::default()
        });
        // Default table: length 10, home radius 0.8
        let result = eval.evaluate(0, Vec2::new(0.0, -4.0), Vec2::new(0.1, 4.5), None, false);
        assert!(result.facts.puck_within_alt_home);
        assert!(result.truncated);
    }

    #[test]
    fn test_truncation_yields_to_time_limit() {
        let eval = evaluator(EnvConfig {
            max_timesteps: 0,
            terminate_on_out_of_bounds: true,
            ..Default::default()
        });
        let result = eval.evaluate(1, Vec2::new(0.0, 1.0), Vec2::ZERO, None, false);
        assert!(result.terminated);
        assert!(!result.truncated);
    }

    #[test]
    fn test_multiagent_home_terminates() {
        let eval = evaluator(EnvConfig {
            num_paddles: 2,
            ..Default::default()
        });
        let result = eval.evaluate(0, Vec2::new(0.0, -4.0), Vec2::new(0.0, -4.6), None, true);
        assert!(result.facts.puck_within_home);
        assert!(result.terminated);
        assert!(!result.truncated);

        let open = eval.evaluate(0, Vec2::new(0.0, -4.0), Vec2::ZERO, None, true);
        assert!(!open.terminated);
    }

    #[test]
    fn test_goal_facts() {
        let eval = evaluator(EnvConfig::default());
        let goal = Goal {
            position: Vec2::new(1.0, 2.0),
            velocity: Vec2::ZERO,
            radius: 0.5,
        };
        let goals = Goals {
            ego: goal,
            alt: None,
        };
        let facts = eval.region_facts(Vec2::new(1.2, 2.1), Some(&goals));
        assert!(facts.puck_within_ego_goal);
        assert!(!facts.puck_within_alt_goal);
        assert!(!eval.region_facts(Vec2::new(1.6, 2.0), Some(&goals)).puck_within_ego_goal);
        assert!(facts.puck_within_opponent_home(Side::Alt) == facts.puck_within_home);
    }
}
