#![allow(dead_code)]

use ecs_core::engine::component::Bundle;
use ecs_core::engine::error::ECSResult;
use ecs_core::engine::manager::Registry;

pub const AGENTS_SMALL: usize = 10_000;
pub const AGENTS_MED: usize = 100_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy)]
pub struct Wealth {
    pub value: f32,
}

/// Builds a registry where every agent has `Position` and `Velocity`, and every
/// other agent also has `Wealth`.
pub fn setup_registry(agent_count: usize) -> ECSResult<Registry> {
    let mut registry = Registry::new();
    registry.register_component::<Position>()?;
    registry.register_component::<Velocity>()?;
    registry.register_component::<Wealth>()?;
    registry.freeze_components();

    for i in 0..agent_count {
        let mut bundle = Bundle::new()
            .with(Position { x: i as f32, y: 0.0 })
            .with(Velocity { dx: 1.0, dy: 0.5 });
        if i % 2 == 0 {
            bundle.insert(Wealth { value: 1.0 });
        }
        registry.spawn(bundle)?;
    }
    Ok(registry)
}
