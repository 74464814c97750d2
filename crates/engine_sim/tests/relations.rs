use std::cell::RefCell;
use std::rc::Rc;

use engine_component::{
    Category, Component, ComponentSchema, DenseColumn, Entity, FieldDescriptor, FieldType,
    StoreError,
};
use engine_math::Transform;
use engine_sim::components::{
    Attach, Attached, Health, KillStats, Owned, Owner, ShareOnKill, Velocity,
};
use engine_sim::systems::damage;
use engine_sim::{
    Ctx, ModContext, Registry, RegistryBuilder, SimError, Simulation, SimulationConfig, System,
    SystemDescriptor, propagate_kill,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

type Log = Rc<RefCell<Vec<(&'static str, Entity, ModContext)>>>;

fn simulation(builder: RegistryBuilder) -> Simulation {
    Simulation::new(Rc::new(builder.build().unwrap()), SimulationConfig::default()).unwrap()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Bounty {
    kills: u32,
}

impl Component for Bounty {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Bounty"
    }

    fn category() -> Category {
        Category::OnKill
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("kills", FieldType::Int))
    }
}

struct BountySystem {
    log: Log,
}

impl System for BountySystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Bounty>("bounty", 50.0)
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let context = *ctx.mod_context().unwrap();
        self.log.borrow_mut().push(("bounty", entity, context));
        ctx.update_component::<Bounty, _>(entity, |b| b.kills += 1)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct LastWords {}

impl Component for LastWords {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "LastWords"
    }

    fn category() -> Category {
        Category::OnDeath
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Epitaph {}

impl Component for Epitaph {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Epitaph"
    }

    fn category() -> Category {
        Category::OnDeath
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
    }
}

struct Recorder<T> {
    name: &'static str,
    depth: f32,
    log: Log,
    kind: std::marker::PhantomData<T>,
}

impl<T: Component> Recorder<T> {
    fn new(name: &'static str, depth: f32, log: &Log) -> Self {
        Self {
            name,
            depth,
            log: Rc::clone(log),
            kind: std::marker::PhantomData,
        }
    }
}

impl<T: Component> System for Recorder<T> {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<T>(self.name, self.depth)
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let context = ctx.mod_context().copied().unwrap_or_default();
        self.log.borrow_mut().push((self.name, entity, context));
        Ok(())
    }
}

/// Reacts to kills through a core kind by overriding its category.
struct Lifesteal {
    log: Log,
}

impl System for Lifesteal {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Health>("lifesteal", 400.0).with_category(Category::OnKill)
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let context = *ctx.mod_context().unwrap();
        self.log.borrow_mut().push(("lifesteal", entity, context));
        ctx.update_component::<Health, _>(entity, |h| h.current = h.max)?;
        Ok(())
    }
}

#[test]
fn test_ownership_links_follow_lifecycle() {
    let mut sim = simulation(Registry::builder().with_builtin_systems());
    let owner = sim.add_entity();
    let first = sim.add_entity();
    let second = sim.add_entity();
    sim.add_component(first, Owner { owner: Some(owner) }).unwrap();
    sim.add_component(second, Owner { owner: Some(owner) }).unwrap();
    assert_eq!(
        sim.get_component::<Owned>(owner).unwrap().owned,
        vec![first, second]
    );

    sim.remove_entity(first).unwrap();
    assert_eq!(sim.get_component::<Owned>(owner).unwrap().owned, vec![second]);

    sim.remove_entity(owner).unwrap();
    assert_eq!(sim.get_component::<Owner>(second).unwrap().owner, Some(owner));
    sim.step().unwrap();
    assert_eq!(sim.get_component::<Owner>(second).unwrap().owner, None);
}

#[test]
fn test_reassigning_owner_moves_link() {
    let mut sim = simulation(Registry::builder().with_builtin_systems());
    let a = sim.add_entity();
    let b = sim.add_entity();
    let pet = sim.add_entity();
    sim.add_component(pet, Owner { owner: Some(a) }).unwrap();
    sim.add_component(pet, Owner { owner: Some(b) }).unwrap();

    assert!(sim.get_component::<Owned>(a).unwrap().owned.is_empty());
    assert_eq!(sim.get_component::<Owned>(b).unwrap().owned, vec![pet]);
}

#[test]
fn test_rejected_owner_record_keeps_link() {
    let mut sim = simulation(Registry::builder().with_builtin_systems());
    let owner = sim.add_entity();
    let pet = sim.add_entity();
    sim.add_component(pet, Owner { owner: Some(owner) }).unwrap();

    let result = sim.add_component_json("Owner", pet, Some(json!({"owner": "bogus"})));
    assert!(matches!(
        result,
        Err(SimError::Store(StoreError::Validation { .. }))
    ));
    assert_eq!(sim.get_component::<Owner>(pet).unwrap().owner, Some(owner));
    assert_eq!(sim.get_component::<Owned>(owner).unwrap().owned, vec![pet]);

    sim.add_component_json("Owner", pet, Some(json!({"owner": null})))
        .unwrap();
    assert!(sim.get_component::<Owned>(owner).unwrap().owned.is_empty());
}

#[test]
fn test_attached_children_follow_parent() {
    let mut sim = simulation(Registry::builder().with_builtin_systems());
    let parent = sim.add_entity();
    sim.add_component(parent, Transform::new(10.0, 20.0).with_direction(1.5))
        .unwrap();
    sim.add_component(parent, Velocity { x: 2.0, y: 0.0 }).unwrap();

    let pre = sim.add_entity();
    let post = sim.add_entity();
    for (child, is_post) in [(pre, false), (post, true)] {
        sim.add_component(child, Transform::default()).unwrap();
        sim.add_component(
            child,
            Attach {
                parent: Some(parent),
                offset_x: 5.0,
                offset_y: -1.0,
                copy_direction: true,
                post: is_post,
            },
        )
        .unwrap();
    }
    assert_eq!(
        sim.get_component::<Attached>(parent).unwrap().children,
        vec![pre, post]
    );

    sim.step().unwrap();
    let transforms = sim.transforms().unwrap();
    assert_eq!(transforms.get(parent).unwrap().x, 12.0);
    // Copied before movement ran.
    assert_eq!(transforms.get(pre).unwrap().x, 15.0);
    assert_eq!(transforms.get(post).unwrap().x, 17.0);
    assert_eq!(transforms.get(post).unwrap().y, 19.0);
    assert_eq!(transforms.get(pre).unwrap().direction, 1.5);
}

#[test]
fn test_stale_attach_parent_cleared() {
    let mut sim = simulation(Registry::builder().with_builtin_systems());
    let parent = sim.add_entity();
    sim.add_component(parent, Transform::new(3.0, 4.0)).unwrap();
    let child = sim.add_entity();
    sim.add_component(child, Transform::new(0.0, 0.0)).unwrap();
    sim.add_component(
        child,
        Attach {
            parent: Some(parent),
            ..Attach::default()
        },
    )
    .unwrap();

    sim.remove_entity(parent).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.get_component::<Attach>(child).unwrap().parent, None);
    assert_eq!(sim.transforms().unwrap().get(child).unwrap().x, 0.0);
}

#[test]
fn test_kill_fans_out_to_shooter() {
    let log = Log::default();
    let mut sim = simulation(
        Registry::builder()
            .component::<Bounty>()
            .with_builtin_systems()
            .system(BountySystem {
                log: Rc::clone(&log),
            }),
    );

    let shooter = sim.add_entity();
    sim.add_component(shooter, Bounty::default()).unwrap();
    let projectile = sim.add_entity();
    sim.add_component(
        projectile,
        ShareOnKill {
            entities: vec![shooter],
        },
    )
    .unwrap();
    let victim = sim.add_entity();
    sim.add_component(
        victim,
        Health {
            current: 10,
            ..Health::default()
        },
    )
    .unwrap();

    assert!(damage(&mut sim.ctx(), victim, 25, Some(projectile)).unwrap());
    sim.step().unwrap();

    assert!(!sim.is_alive(victim));
    assert_eq!(sim.get_component::<Bounty>(shooter).unwrap().kills, 1);
    let entries = log.borrow();
    assert_eq!(entries.len(), 1);
    let (_, reacting, context) = entries[0];
    assert_eq!(reacting, shooter);
    assert_eq!(context.owner, Some(shooter));
    assert_eq!(context.killed_entity, Some(victim));
    assert_eq!(context.kill_source, Some(projectile));

    let stats = *sim.get_component::<KillStats>(sim.core_entity()).unwrap();
    assert_eq!(stats, KillStats { kills: 1, deaths: 1 });
    assert!(sim.mod_context().is_none());
}

#[test]
fn test_category_override_reacts_through_run_mods() {
    let log = Log::default();
    let mut sim = simulation(Registry::builder().with_builtin_systems().system(Lifesteal {
        log: Rc::clone(&log),
    }));
    let killer = sim.add_entity();
    sim.add_component(
        killer,
        Health {
            current: 20,
            ..Health::default()
        },
    )
    .unwrap();
    let victim = sim.add_entity();

    sim.step().unwrap();
    assert!(log.borrow().is_empty());

    propagate_kill(&mut sim.ctx(), killer, victim).unwrap();
    {
        let entries = log.borrow();
        assert_eq!(entries.len(), 1);
        let (name, reacting, context) = entries[0];
        assert_eq!((name, reacting), ("lifesteal", killer));
        assert_eq!(context.killed_entity, Some(victim));
    }
    assert_eq!(sim.get_component::<Health>(killer).unwrap().current, 100);

    let stats = *sim.get_component::<KillStats>(sim.core_entity()).unwrap();
    assert_eq!(stats.kills, 1);
}

#[test]
fn test_reactive_systems_skip_frame_pipeline() {
    let log = Log::default();
    let mut sim = simulation(
        Registry::builder()
            .component::<Bounty>()
            .with_builtin_systems()
            .system(BountySystem {
                log: Rc::clone(&log),
            }),
    );
    let shooter = sim.add_entity();
    sim.add_component(shooter, Bounty::default()).unwrap();
    for _ in 0..3 {
        sim.step().unwrap();
    }
    assert!(log.borrow().is_empty());
}

#[test]
fn test_run_mods_orders_by_depth_and_dedupes() {
    let log = Log::default();
    let mut sim = simulation(
        Registry::builder()
            .component::<LastWords>()
            .component::<Epitaph>()
            .system(Recorder::<LastWords>::new("late", 20.0, &log))
            .system(Recorder::<Epitaph>::new("early", 10.0, &log)),
    );
    let first = sim.add_entity();
    let second = sim.add_entity();
    sim.add_component(first, LastWords {}).unwrap();
    sim.add_component(first, Epitaph {}).unwrap();
    sim.add_component(second, LastWords {}).unwrap();

    let context = ModContext {
        killed_entity: Some(first),
        ..ModContext::default()
    };
    sim.run_mods(&[first, second, first], Category::OnDeath, context)
        .unwrap();

    let calls: Vec<(&str, Entity)> = log.borrow().iter().map(|(n, e, _)| (*n, *e)).collect();
    assert_eq!(
        calls,
        vec![("early", first), ("late", first), ("late", second)]
    );
    assert!(log.borrow().iter().all(|(_, e, c)| c.owner == Some(*e)));

    log.borrow_mut().clear();
    sim.run_mods(&[first], Category::OnKill, context).unwrap();
    assert!(log.borrow().is_empty());
}
