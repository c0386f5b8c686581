use cucumber::given;

use crate::{cucumber::PosWorld, support::fixtures::TestSystem};

#[given("a fresh install")]
async fn fresh_database(world: &mut PosWorld) {
    world.system = Some(TestSystem::new().await);
}

#[given("a fresh install with strict status transitions")]
async fn fresh_strict_database(world: &mut PosWorld) {
    world.system = Some(TestSystem::strict().await);
}
