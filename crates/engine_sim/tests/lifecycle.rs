use std::rc::Rc;

use engine_component::{
    Component, ComponentSchema, DenseColumn, Entity, FieldDescriptor, FieldType,
};
use engine_math::Transform;
use engine_sim::components::{PlayerInput, Velocity};
use engine_sim::{
    Ctx, Registry, SchedulerError, SimError, Simulation, SimulationConfig, System,
    SystemDescriptor,
};
use serde::{Deserialize, Serialize};

fn simulation(seed: &str) -> Simulation {
    let registry = Rc::new(Registry::with_builtins().unwrap());
    Simulation::new(registry, SimulationConfig::default().with_seed(seed)).unwrap()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Spawner {
    spawned: u32,
}

impl Component for Spawner {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Spawner"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("spawned", FieldType::Int))
    }
}

/// Spawns one moving entity per frame.
struct SpawnerSystem;

impl System for SpawnerSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Spawner>("spawner", 20.0)
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        assert!(ctx.in_step());
        let child = ctx.add_entity();
        ctx.add_component(child, Transform::default())?;
        ctx.add_component(child, Velocity { x: 1.0, y: 0.0 })?;
        ctx.update_component::<Spawner, _>(entity, |s| s.spawned += 1)?;
        Ok(())
    }
}

#[test]
fn test_step_advances_frame_and_time() {
    let mut sim = simulation("frames");
    for expected in 1..=3u64 {
        sim.step().unwrap();
        assert_eq!(sim.frame(), expected);
        assert_eq!(sim.time_elapsed(), expected * 16);
    }

    sim.set_paused(true);
    sim.step().unwrap();
    assert_eq!(sim.frame(), 3);
    assert_eq!(sim.time_elapsed(), 48);
}

#[test]
fn test_core_entity_holds_singletons() {
    let sim = simulation("core");
    let core = sim.core_entity();
    assert_eq!(core, Entity(1));
    assert!(sim.has_component::<engine_sim::components::KillStats>(core));
    assert!(sim.has_component::<engine_sim::components::CameraTarget>(core));
}

// Values are the ARC4 `seedrandom` stream for each seed. Seed "test" is
// sometimes quoted as starting 3574, 8669 for int(10000); that sequence does
// not come from this generator, which yields 8722, 4023, 9647.
#[test]
fn test_instance_rng_follows_seed() {
    let mut sim = simulation("abc");
    let values: Vec<i64> = (0..5).map(|_| sim.rand().int(100)).collect();
    assert_eq!(values, vec![73, 64, 71, 63, 39]);

    let mut sim = simulation("test");
    let values: Vec<i64> = (0..3).map(|_| sim.rand().int(10_000)).collect();
    assert_eq!(values, vec![8722, 4023, 9647]);
}

#[test]
fn test_degenerate_config_rejected() {
    let registry = Rc::new(Registry::with_builtins().unwrap());
    let config = SimulationConfig {
        cell_size: 0.0,
        ..SimulationConfig::default()
    };
    assert!(matches!(
        Simulation::new(Rc::clone(&registry), config),
        Err(SimError::InvalidConfig(_))
    ));
    let config = SimulationConfig {
        world_width: f32::INFINITY,
        ..SimulationConfig::default()
    };
    assert!(matches!(
        Simulation::new(registry, config),
        Err(SimError::InvalidConfig(_))
    ));
}

#[test]
fn test_same_seed_same_state() {
    let run = |seed: &str| {
        let mut sim = simulation(seed);
        sim.add_player(0).unwrap();
        for frame in 0..30 {
            let input = PlayerInput {
                move_x: if frame % 3 == 0 { 1.0 } else { -0.5 },
                move_y: 0.25,
                buttons: 0,
            };
            sim.step_with_inputs(&[(0, input)]).unwrap();
            sim.rand().number();
        }
        sim.state_hash().unwrap()
    };
    assert_eq!(run("same"), run("same"));
    assert_ne!(run("same"), run("other"));
}

#[test]
fn test_remove_entity_is_idempotent() {
    let mut sim = simulation("remove");
    let entity = sim.add_entity();
    sim.add_component(entity, Velocity { x: 1.0, y: 2.0 }).unwrap();

    sim.remove_entity(entity).unwrap();
    assert!(!sim.is_alive(entity));
    assert!(!sim.has_component::<Velocity>(entity));
    sim.remove_entity(entity).unwrap();
    sim.remove_component::<Velocity>(entity).unwrap();
}

#[test]
fn test_add_component_to_dead_entity_fails() {
    let mut sim = simulation("dead");
    let entity = sim.add_entity();
    sim.remove_entity(entity).unwrap();
    assert!(matches!(
        sim.add_component(entity, Velocity::default()),
        Err(SimError::InactiveEntity(e)) if e == entity
    ));
}

#[test]
fn test_released_ids_wait_two_steps() {
    let mut sim = simulation("ids");
    let first = sim.add_entity();
    sim.remove_entity(first).unwrap();
    assert_ne!(sim.add_entity(), first);

    sim.step().unwrap();
    assert_ne!(sim.add_entity(), first);

    sim.step().unwrap();
    assert_eq!(sim.add_entity(), first);
}

#[test]
fn test_structural_changes_deferred_to_end_of_step() {
    let registry = Registry::builder()
        .component::<Spawner>()
        .with_builtin_systems()
        .system(SpawnerSystem)
        .build()
        .unwrap();
    let mut sim = Simulation::new(Rc::new(registry), SimulationConfig::default()).unwrap();
    let spawner = sim.add_entity();
    sim.add_component(spawner, Spawner::default()).unwrap();

    sim.step().unwrap();
    let first_child = sim.actives::<Velocity>()[0];
    assert_eq!(sim.actives::<Velocity>().len(), 1);
    // Movement ran before the child's components were applied.
    assert_eq!(sim.transforms().unwrap().get(first_child).unwrap().x, 0.0);

    sim.step().unwrap();
    assert_eq!(sim.actives::<Velocity>().len(), 2);
    assert_eq!(sim.transforms().unwrap().get(first_child).unwrap().x, 1.0);
    assert_eq!(sim.get_component::<Spawner>(spawner).unwrap().spawned, 2);
}

#[test]
fn test_dirty_bits_cleared_each_step() {
    let mut sim = simulation("dirty");
    let entity = sim.add_entity();
    sim.add_component(entity, Transform::new(0.0, 0.0)).unwrap();
    sim.add_component(entity, Velocity { x: 0.0, y: 3.0 }).unwrap();

    sim.step().unwrap();
    // Only y moved.
    assert_eq!(sim.dirty_mask::<Transform>(entity), 0b010);

    sim.update_component::<Velocity, _>(entity, |v| v.y = 0.0).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.dirty_mask::<Transform>(entity), 0);
}

#[test]
fn test_json_component_defaults_and_validation() {
    let mut sim = simulation("json");
    let entity = sim.add_entity();
    sim.add_component_json("Health", entity, Some(serde_json::json!({"current": 40})))
        .unwrap();
    let health = sim.get_component_json("Health", entity).unwrap();
    assert_eq!(health["current"], 40);
    assert_eq!(health["max"], 100);

    assert!(sim.add_component_json("Player", entity, None).is_err());
    assert!(sim.add_component_json("Nope", entity, None).is_err());
}

struct EarlyConsumer;

impl System for EarlyConsumer {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Spawner>("early_consumer", 5.0).with_dependencies(&["Velocity"])
    }
}

#[test]
fn test_registry_rejects_dependency_scheduled_later() {
    let result = Registry::builder()
        .component::<Spawner>()
        .with_builtin_systems()
        .system(EarlyConsumer)
        .build();
    match result {
        Err(SchedulerError::DependencyOrder {
            system, dependency, ..
        }) => {
            assert_eq!(system, "early_consumer");
            assert_eq!(dependency, "movement");
        }
        other => panic!("expected dependency order error, got {other:?}"),
    }
}
