mod pos_world;
mod setups;
mod steps;

pub use pos_world::PosWorld;
