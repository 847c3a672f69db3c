//! Player collision and motion against the world box set.
#![forbid(unsafe_code)]

mod body;
mod collide;
mod motion;
mod probe;
mod registry;

pub use body::{MotionParams, MoveIntent, PlayerBody};
pub use collide::{CollisionResolver, HORIZONTAL_EPS, PROBE_MARGIN, STEP_EPS, VerticalContact};
pub use motion::{MotionIntegrator, StepReport, VELOCITY_DEADZONE};
pub use probe::{OpenSpace, SPAWN_LIFT, TerrainProbe, TerrainQuery};
pub use registry::{
    AabbOwner, MIN_USER_BLOCK, RayHit, WorldAabb, WorldGeometryRegistry, default_presets, raycast_boxes,
};
