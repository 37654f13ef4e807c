//! Post-step contact bookkeeping and target absorption

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::physics::{BodyHandle, PhysicsWorld};
use super::state::{ObjectId, Registry};

/// What touched what during the last step
#[derive(Debug, Clone, Default)]
pub struct ContactReport {
    /// Touching registry objects, keyed by object (walls excluded)
    pub touching: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
    /// Names of pucks that touched a target, in target order
    pub pucks_on_targets: Vec<String>,
    /// Names of targets destroyed this step
    pub absorbed_targets: Vec<String>,
    /// Any registry pair touching at all
    pub hit_a_puck: bool,
}

impl ContactReport {
    /// Names touching the named object
    pub fn touching_names<'a>(&self, registry: &'a Registry, id: ObjectId) -> Vec<&'a str> {
        self.touching
            .get(&id)
            .map(|others| {
                others
                    .iter()
                    .filter_map(|&other| registry.get(other))
                    .map(|o| o.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Collects touching pairs and absorbs targets hit by pucks
#[derive(Debug, Clone, Copy)]
pub struct ContactResolver {
    absorb_target: bool,
}

impl ContactResolver {
    pub fn new(absorb_target: bool) -> Self {
        Self { absorb_target }
    }

    pub fn resolve<W: PhysicsWorld>(&self, world: &mut W, registry: &mut Registry) -> ContactReport {
        let by_body: HashMap<BodyHandle, ObjectId> = registry
            .ids()
            .filter_map(|id| registry.get(id).map(|o| (o.body, id)))
            .collect();

        let mut report = ContactReport::default();
        for id in registry.ids() {
            let Some(object) = registry.get(id) else {
                continue;
            };
            let others: BTreeSet<ObjectId> = world
                .touching(object.body)
                .into_iter()
                .filter_map(|handle| by_body.get(&handle).copied())
                .collect();
            report.touching.insert(id, others);
        }
        report.hit_a_puck = report.touching.values().any(|others| !others.is_empty());

        let pucks: BTreeSet<ObjectId> = registry.pucks().iter().copied().collect();
        for target in registry.targets().to_vec() {
            let hits: Vec<ObjectId> = report
                .touching
                .get(&target)
                .map(|others| others.intersection(&pucks).copied().collect())
                .unwrap_or_default();
            if hits.is_empty() {
                continue;
            }
            for puck in hits {
                if let Some(object) = registry.get(puck) {
                    if !report.pucks_on_targets.contains(&object.name) {
                        report.pucks_on_targets.push(object.name.clone());
                    }
                }
            }

            if self.absorb_target {
                if let Some(object) = registry.remove(target) {
                    world.destroy_body(object.body);
                    log::debug!("Absorbed {}", object.name);
                    report.touching.remove(&target);
                    for others in report.touching.values_mut() {
                        others.remove(&target);
                    }
                    report.absorbed_targets.push(object.name);
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::{BodyDef, BodyKind, Shape};
    use crate::sim::state::{ObjectRole, WorldObject};
    use crate::sim::world::TableWorld;
    use glam::Vec2;

    fn add(
        world: &mut TableWorld,
        registry: &mut Registry,
        role: ObjectRole,
        ordinal: u32,
        def: BodyDef,
    ) -> ObjectId {
        let body = world.create_body(&def);
        registry.insert(WorldObject {
            name: role.object_name(ordinal),
            role,
            body,
            radius: None,
            collidable: true,
        })
    }

    fn scene() -> (TableWorld, Registry, ObjectId, ObjectId) {
        let mut world = TableWorld::new(Vec2::ZERO, Vec2::new(5.0, 5.0));
        let mut registry = Registry::new();
        let target = add(
            &mut world,
            &mut registry,
            ObjectRole::Target,
            0,
            BodyDef::new(
                BodyKind::Static,
                Shape::Rect {
                    half_extents: Vec2::new(0.5, 0.25),
                },
                Vec2::ZERO,
            ),
        );
        // Resting against the target's top face
        let puck = add(
            &mut world,
            &mut registry,
            ObjectRole::Puck,
            0,
            BodyDef::new(BodyKind::Dynamic, Shape::Circle { radius: 0.25 }, Vec2::new(0.0, 0.49)),
        );
        registry.sort_roles();
        world.step(0.05, 10, 10);
        (world, registry, target, puck)
    }

    #[test]
    fn test_touching_map_and_hit_flag() {
        let (mut world, mut registry, target, puck) = scene();
        let report = ContactResolver::new(false).resolve(&mut world, &mut registry);
        assert!(report.hit_a_puck);
        assert!(report.touching[&puck].contains(&target));
        assert_eq!(report.touching_names(&registry, target), vec!["puck0"]);
        assert_eq!(report.pucks_on_targets, vec!["puck0"]);
        assert!(report.absorbed_targets.is_empty());
        assert!(registry.contains(target));
    }

    #[test]
    fn test_absorption_removes_target_once() {
        let (mut world, mut registry, target, puck) = scene();
        let resolver = ContactResolver::new(true);
        let report = resolver.resolve(&mut world, &mut registry);
        assert_eq!(report.absorbed_targets, vec!["target0"]);
        assert!(!registry.contains(target));
        assert!(registry.targets().is_empty());
        assert!(!report.touching.contains_key(&target));
        assert!(report.touching[&puck].is_empty());
        assert_eq!(world.body_count(), 1);

        world.step(0.05, 10, 10);
        let again = resolver.resolve(&mut world, &mut registry);
        assert!(again.absorbed_targets.is_empty());
        assert!(again.pucks_on_targets.is_empty());
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_no_contacts() {
        let mut world = TableWorld::new(Vec2::ZERO, Vec2::new(5.0, 5.0));
        let mut registry = Registry::new();
        add(
            &mut world,
            &mut registry,
            ObjectRole::Puck,
            0,
            BodyDef::new(BodyKind::Dynamic, Shape::Circle { radius: 0.25 }, Vec2::ZERO),
        );
        world.step(0.05, 10, 10);
        let report = ContactResolver::new(true).resolve(&mut world, &mut registry);
        assert!(!report.hit_a_puck);
        assert!(report.pucks_on_targets.is_empty());
    }
}
