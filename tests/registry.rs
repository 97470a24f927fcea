use ecs_core::engine::config::RegistryConfig;
use ecs_core::engine::component::Bundle;
use ecs_core::engine::error::{ECSError, RegistryError};
use ecs_core::engine::manager::Registry;
use ecs_core::engine::types::ComponentSet;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position { x: f32 }

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity { v: f32 }

#[derive(Debug, Clone, PartialEq)]
struct Name(String);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Frozen;

fn sorted_xs(registry: &mut Registry) -> Vec<f32> {
    let mut xs = Vec::new();
    registry.for_each1::<Position>(|_, position| xs.push(position.x)).unwrap();
    xs.sort_by(f32::total_cmp);
    xs
}

#[test]
fn position_velocity_scenario() {
    let mut registry = Registry::new();

    let e1 = registry.create_entity().unwrap();
    registry.add_component(e1, Position { x: 1.0 }).unwrap();
    let e2 = registry.create_entity().unwrap();
    registry.add_component(e2, Position { x: 2.0 }).unwrap();
    registry.add_component(e2, Velocity { v: 1.0 }).unwrap();

    let mut seen = Vec::new();
    registry
        .for_each1::<Position>(|entity, position| seen.push((entity, position.x)))
        .unwrap();
    seen.sort_by(|a, b| a.1.total_cmp(&b.1));
    assert_eq!(seen, vec![(e1, 1.0), (e2, 2.0)]);

    let mut moving = Vec::new();
    registry
        .for_each2::<Position, Velocity>(|entity, _, _| moving.push(entity))
        .unwrap();
    assert_eq!(moving, vec![e2]);

    let mut reversed = Vec::new();
    registry
        .for_each2::<Velocity, Position>(|entity, _, _| reversed.push(entity))
        .unwrap();
    assert_eq!(reversed, vec![e2]);
}

#[test]
fn add_then_get_and_set_union() {
    let mut registry = Registry::new();
    let entity = registry.create_entity().unwrap();
    assert_eq!(registry.component_set_of(entity), Ok(ComponentSet::new()));
    assert_eq!(registry.archetype_of(entity), Ok(None));

    registry.add_component(entity, Velocity { v: 3.0 }).unwrap();
    registry.add_component(entity, Position { x: 4.0 }).unwrap();

    let position = registry.component_id_of::<Position>().unwrap();
    let velocity = registry.component_id_of::<Velocity>().unwrap();
    assert_eq!(
        registry.component_set_of(entity),
        Ok(ComponentSet::from_ids([position, velocity]))
    );
    assert_eq!(registry.get_component::<Position>(entity), Ok(&Position { x: 4.0 }));
    assert_eq!(registry.get_component::<Velocity>(entity), Ok(&Velocity { v: 3.0 }));

    registry.get_component_mut::<Position>(entity).unwrap().x = 8.0;
    assert_eq!(registry.get_component::<Position>(entity), Ok(&Position { x: 8.0 }));
}

#[test]
fn duplicate_add_is_rejected_and_leaves_value() {
    let mut registry = Registry::new();
    let entity = registry.create_entity().unwrap();
    registry.add_component(entity, Position { x: 1.0 }).unwrap();

    assert_eq!(
        registry.add_component(entity, Position { x: 2.0 }),
        Err(ECSError::DuplicateComponent {
            entity,
            component: std::any::type_name::<Position>(),
        })
    );
    assert_eq!(registry.get_component::<Position>(entity), Ok(&Position { x: 1.0 }));
}

#[test]
fn add_remove_round_trip_keeps_other_components() {
    let mut registry = Registry::new();
    let entity = registry.create_entity().unwrap();
    registry.add_component(entity, Position { x: 1.5 }).unwrap();
    registry.add_component(entity, Name("probe".into())).unwrap();
    let before = registry.component_set_of(entity).unwrap();

    registry.add_component(entity, Velocity { v: -2.0 }).unwrap();
    assert_eq!(registry.remove_component::<Velocity>(entity), Ok(Velocity { v: -2.0 }));

    assert_eq!(registry.component_set_of(entity), Ok(before));
    assert_eq!(registry.get_component::<Position>(entity), Ok(&Position { x: 1.5 }));
    assert_eq!(registry.get_component::<Name>(entity), Ok(&Name("probe".into())));
    assert!(!registry.has_component::<Velocity>(entity));
}

#[test]
fn remove_errors() {
    let mut registry = Registry::new();
    let entity = registry.create_entity().unwrap();

    assert_eq!(
        registry.remove_component::<Position>(entity),
        Err(ECSError::MissingArchetype(entity))
    );

    registry.add_component(entity, Position { x: 0.0 }).unwrap();
    assert!(matches!(
        registry.remove_component::<Velocity>(entity),
        Err(ECSError::ComponentNotFound { .. })
    ));
    registry.register_component::<Velocity>().unwrap();
    assert!(matches!(
        registry.remove_component::<Velocity>(entity),
        Err(ECSError::ComponentNotFound { .. })
    ));
}

#[test]
fn removing_last_component_keeps_entity_alive() {
    let mut registry = Registry::new();
    let entity = registry.create_entity().unwrap();
    registry.add_component(entity, Name("solo".into())).unwrap();
    let set = registry.component_set_of(entity).unwrap();

    assert_eq!(registry.remove_component::<Name>(entity), Ok(Name("solo".into())));
    assert!(registry.is_alive(entity));
    assert_eq!(registry.archetype_of(entity), Ok(None));
    assert_eq!(registry.find_archetype(&set), None);
    assert_eq!(registry.archetype_count(), 0);

    registry.add_component(entity, Name("again".into())).unwrap();
    assert_eq!(registry.get_component::<Name>(entity), Ok(&Name("again".into())));
}

#[test]
fn destroyed_entity_is_unknown_everywhere() {
    let mut registry = Registry::new();
    let entity = registry.create_entity().unwrap();
    registry.add_component(entity, Position { x: 1.0 }).unwrap();
    registry.destroy_entity(entity).unwrap();

    assert!(!registry.is_alive(entity));
    assert_eq!(registry.get_component::<Position>(entity), Err(ECSError::UnknownEntity(entity)));
    assert_eq!(registry.add_component(entity, Velocity { v: 0.0 }), Err(ECSError::UnknownEntity(entity)));
    assert_eq!(registry.remove_component::<Position>(entity), Err(ECSError::UnknownEntity(entity)));
    assert_eq!(registry.destroy_entity(entity), Err(ECSError::UnknownEntity(entity)));
    assert_eq!(registry.component_set_of(entity), Err(ECSError::UnknownEntity(entity)));
    assert!(!registry.has_component::<Position>(entity));

    let reused = registry.create_entity().unwrap();
    assert_eq!(reused.slot(), entity.slot());
    assert_ne!(reused.generation(), entity.generation());
    assert_eq!(registry.get_component::<Position>(entity), Err(ECSError::UnknownEntity(entity)));
    assert!(matches!(
        registry.get_component::<Position>(reused),
        Err(ECSError::ComponentNotFound { .. })
    ));
}

#[test]
fn empty_archetypes_leave_the_index() {
    let mut registry = Registry::new();
    let a = registry.create_entity().unwrap();
    let b = registry.create_entity().unwrap();
    registry.add_component(a, Position { x: 1.0 }).unwrap();
    registry.add_component(b, Position { x: 2.0 }).unwrap();
    registry.add_component(b, Velocity { v: 1.0 }).unwrap();

    let position = registry.component_id_of::<Position>().unwrap();
    let velocity = registry.component_id_of::<Velocity>().unwrap();
    let both = ComponentSet::from_ids([position, velocity]);
    let only_position = ComponentSet::single(position);
    assert_eq!(registry.archetype_count(), 2);
    assert_eq!(registry.matching_archetypes(&only_position).len(), 2);

    registry.destroy_entity(b).unwrap();
    assert_eq!(registry.find_archetype(&both), None);
    assert_eq!(registry.matching_archetypes(&only_position).len(), 1);
    assert_eq!(registry.archetype_count(), 1);

    registry.add_component(a, Velocity { v: 5.0 }).unwrap();
    assert_eq!(registry.find_archetype(&only_position), None);
    assert!(registry.find_archetype(&both).is_some());
    assert_eq!(registry.archetype_count(), 1);
}

#[test]
fn swap_remove_keeps_neighbours_intact() {
    let mut registry = Registry::new();
    let entities: Vec<_> = (0..5)
        .map(|i| {
            let e = registry.create_entity().unwrap();
            registry.add_component(e, Position { x: i as f32 }).unwrap();
            e
        })
        .collect();

    registry.destroy_entity(entities[1]).unwrap();
    registry.add_component(entities[3], Velocity { v: 0.0 }).unwrap();

    for (i, &e) in entities.iter().enumerate() {
        if i == 1 {
            continue;
        }
        assert_eq!(registry.get_component::<Position>(e), Ok(&Position { x: i as f32 }));
    }
    assert_eq!(sorted_xs(&mut registry), vec![0.0, 2.0, 3.0, 4.0]);
}

#[test]
fn spawn_places_entity_in_matching_archetype() {
    let mut registry = Registry::new();
    let spawned = registry
        .spawn(Bundle::new().with(Velocity { v: 1.0 }).with(Position { x: 2.0 }))
        .unwrap();
    let built = registry.create_entity().unwrap();
    registry.add_component(built, Position { x: 3.0 }).unwrap();
    registry.add_component(built, Velocity { v: 4.0 }).unwrap();

    assert_eq!(registry.archetype_of(spawned), registry.archetype_of(built));
    assert_eq!(registry.get_component::<Velocity>(spawned), Ok(&Velocity { v: 1.0 }));

    let empty = registry.spawn(Bundle::new()).unwrap();
    assert_eq!(registry.archetype_of(empty), Ok(None));
}

#[test]
fn spawn_rejects_duplicate_types() {
    let mut registry = Registry::new();
    let result = registry.spawn(Bundle::new().with(Position { x: 0.0 }).with(Position { x: 1.0 }));

    assert_eq!(
        result,
        Err(ECSError::DuplicateBundleComponent { component: std::any::type_name::<Position>() })
    );
    assert_eq!(registry.component_id_of::<Position>(), None);
    assert_eq!(registry.entity_count(), 0);
    assert_eq!(registry.archetype_count(), 0);
}

#[test]
fn duplicate_bundle_is_reported_before_frozen_registry() {
    let mut registry = Registry::new();
    registry.freeze_components();

    let result = registry.spawn(Bundle::new().with(Velocity { v: 0.0 }).with(Velocity { v: 1.0 }));
    assert!(matches!(result, Err(ECSError::DuplicateBundleComponent { .. })));
    assert!(registry.types().is_empty());
}

#[test]
fn queries_reject_aliasing_and_skip_unknown_types() {
    let mut registry = Registry::new();
    let entity = registry.create_entity().unwrap();
    registry.add_component(entity, Position { x: 0.0 }).unwrap();

    assert_eq!(
        registry.for_each2::<Position, Position>(|_, _, _| {}),
        Err(ECSError::AliasedQuery)
    );

    let mut visited = 0;
    registry
        .for_each2::<Position, Name>(|_, _, _| visited += 1)
        .unwrap();
    assert_eq!(visited, 0);
}

#[test]
fn queries_mutate_in_place() {
    let mut registry = Registry::new();
    for i in 0..3 {
        let bundle = Bundle::new()
            .with(Position { x: i as f32 })
            .with(Velocity { v: 10.0 });
        registry.spawn(bundle).unwrap();
    }
    let lone = registry.create_entity().unwrap();
    registry.add_component(lone, Position { x: 100.0 }).unwrap();

    registry
        .for_each2::<Position, Velocity>(|_, position, velocity| position.x += velocity.v)
        .unwrap();
    assert_eq!(sorted_xs(&mut registry), vec![10.0, 11.0, 12.0, 100.0]);
}

#[test]
fn wide_queries_visit_only_full_matches() {
    #[derive(Debug, PartialEq)]
    struct Mass(f32);

    let mut registry = Registry::new();
    let full = registry
        .spawn(
            Bundle::new()
                .with(Position { x: 1.0 })
                .with(Velocity { v: 2.0 })
                .with(Mass(3.0))
                .with(Name("full".into())),
        )
        .unwrap();
    registry
        .spawn(Bundle::new().with(Position { x: 0.0 }).with(Velocity { v: 0.0 }).with(Mass(0.0)))
        .unwrap();

    let mut hits = Vec::new();
    registry
        .for_each4::<Name, Mass, Velocity, Position>(|entity, name, mass, velocity, position| {
            position.x = mass.0 * velocity.v;
            hits.push((entity, name.0.clone()));
        })
        .unwrap();
    assert_eq!(hits, vec![(full, "full".to_string())]);
    assert_eq!(registry.get_component::<Position>(full), Ok(&Position { x: 6.0 }));

    let mut count = 0;
    registry.for_each3::<Mass, Velocity, Position>(|_, _, _, _| count += 1).unwrap();
    assert_eq!(count, 2);
}

#[test]
fn frozen_types_and_config() {
    let mut registry = Registry::with_config(RegistryConfig {
        initial_entity_capacity: 4,
        component_capacity: 1,
    })
    .unwrap();
    let entity = registry.create_entity().unwrap();
    registry.add_component(entity, Position { x: 0.0 }).unwrap();
    assert_eq!(
        registry.add_component(entity, Velocity { v: 0.0 }),
        Err(ECSError::Registry(RegistryError::CapacityExceeded { capacity: 1 }))
    );

    let mut registry = Registry::new();
    registry.register_component::<Position>().unwrap();
    registry.freeze_components();
    let entity = registry.create_entity().unwrap();
    registry.add_component(entity, Position { x: 0.0 }).unwrap();
    assert!(matches!(
        registry.add_component(entity, Frozen),
        Err(ECSError::Registry(RegistryError::Frozen { .. }))
    ));
    assert_eq!(registry.component_set_of(entity).map(|set| set.len()), Ok(1));

    assert!(matches!(
        Registry::with_config(RegistryConfig { component_capacity: 0, ..Default::default() }),
        Err(ECSError::Config(_))
    ));
}

#[test]
fn enumeration_covers_all_entities() {
    let mut registry = Registry::new();
    let bare = registry.create_entity().unwrap();
    let placed = registry.spawn(Bundle::new().with(Position { x: 0.0 })).unwrap();

    let mut all: Vec<_> = registry.entities().collect();
    all.sort();
    assert_eq!(all, vec![bare, placed]);
    assert_eq!(registry.entity_count(), 2);

    let stored: Vec<_> = registry
        .archetypes()
        .flat_map(|(_, archetype)| archetype.entities().to_vec())
        .collect();
    assert_eq!(stored, vec![placed]);
}

#[test]
fn get_components_borrows_several_columns() {
    let mut registry = Registry::new();
    let entity = registry
        .spawn(
            Bundle::new()
                .with(Position { x: 1.0 })
                .with(Velocity { v: 2.0 })
                .with(Name("walker".into())),
        )
        .unwrap();

    let (velocity, position) = registry.get_components2::<Velocity, Position>(entity).unwrap();
    position.x += velocity.v;
    assert_eq!(registry.get_component::<Position>(entity), Ok(&Position { x: 3.0 }));

    let (name, position, velocity) = registry
        .get_components3::<Name, Position, Velocity>(entity)
        .unwrap();
    assert_eq!((name.0.as_str(), position.x, velocity.v), ("walker", 3.0, 2.0));
}

#[test]
fn get_components_errors() {
    let mut registry = Registry::new();
    let bare = registry.create_entity().unwrap();
    let moving = registry.create_entity().unwrap();
    registry.add_component(moving, Position { x: 0.0 }).unwrap();

    assert_eq!(
        registry.get_components2::<Position, Velocity>(bare).err(),
        Some(ECSError::ComponentNotFound { entity: bare, component: std::any::type_name::<Position>() })
    );
    assert_eq!(
        registry.get_components2::<Position, Velocity>(moving).err(),
        Some(ECSError::ComponentNotFound { entity: moving, component: std::any::type_name::<Velocity>() })
    );
    assert_eq!(
        registry.get_components2::<Position, Position>(moving).err(),
        Some(ECSError::AliasedQuery)
    );

    registry.destroy_entity(moving).unwrap();
    assert_eq!(
        registry.get_components2::<Position, Velocity>(moving).err(),
        Some(ECSError::UnknownEntity(moving))
    );
}
