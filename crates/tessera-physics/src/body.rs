use serde::Deserialize;
use tessera_geom::Vec3;

/// Tunables for the walking body. All lengths in world units, times in seconds.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MotionParams {
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f64,
    #[serde(default = "default_run_multiplier")]
    pub run_multiplier: f64,
    #[serde(default = "default_jump_strength")]
    pub jump_strength: f64,
    #[serde(default = "default_step_height")]
    pub step_height: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,
    #[serde(default = "default_max_delta")]
    pub max_delta: f64,
    #[serde(default = "default_fall_floor")]
    pub fall_floor: f64,
}
fn default_walk_speed() -> f64 {
    10.0
}
fn default_run_multiplier() -> f64 {
    1.8
}
fn default_jump_strength() -> f64 {
    11.5
}
fn default_step_height() -> f64 {
    1.0
}
fn default_radius() -> f64 {
    0.45
}
fn default_height() -> f64 {
    1.75
}
fn default_gravity() -> f64 {
    30.0
}
fn default_acceleration() -> f64 {
    20.0
}
fn default_max_delta() -> f64 {
    0.05
}
fn default_fall_floor() -> f64 {
    -64.0
}
impl Default for MotionParams {
    fn default() -> Self {
        Self {
            walk_speed: default_walk_speed(),
            run_multiplier: default_run_multiplier(),
            jump_strength: default_jump_strength(),
            step_height: default_step_height(),
            radius: default_radius(),
            height: default_height(),
            gravity: default_gravity(),
            acceleration: default_acceleration(),
            max_delta: default_max_delta(),
            fall_floor: default_fall_floor(),
        }
    }
}

#[inline]
fn at_least(v: f64, min: f64, fallback: f64) -> f64 {
    if v.is_finite() { v.max(min) } else { fallback }
}

impl MotionParams {
    pub const MIN_WALK_SPEED: f64 = 0.1;
    pub const MIN_RUN_MULTIPLIER: f64 = 1.0;
    pub const MIN_JUMP_STRENGTH: f64 = 0.1;
    pub const MIN_STEP_HEIGHT: f64 = 0.0;

    /// Clamps each value to its floor; non-finite values fall back to defaults.
    pub fn sanitized(self) -> Self {
        let d = MotionParams::default();
        Self {
            walk_speed: at_least(self.walk_speed, Self::MIN_WALK_SPEED, d.walk_speed),
            run_multiplier: at_least(self.run_multiplier, Self::MIN_RUN_MULTIPLIER, d.run_multiplier),
            jump_strength: at_least(self.jump_strength, Self::MIN_JUMP_STRENGTH, d.jump_strength),
            step_height: at_least(self.step_height, Self::MIN_STEP_HEIGHT, d.step_height),
            radius: at_least(self.radius, 0.05, d.radius),
            height: at_least(self.height, 0.5, d.height),
            gravity: at_least(self.gravity, 0.0, d.gravity),
            acceleration: at_least(self.acceleration, 0.1, d.acceleration),
            max_delta: at_least(self.max_delta, 1e-3, d.max_delta).min(0.25),
            fall_floor: if self.fall_floor.is_finite() {
                self.fall_floor
            } else {
                d.fall_floor
            },
        }
    }
}

/// Held input for one frame. `view_dir` only contributes its horizontal part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveIntent {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub run: bool,
    pub jump: bool,
    pub view_dir: Vec3,
}

impl Default for MoveIntent {
    fn default() -> Self {
        Self {
            forward: false,
            back: false,
            left: false,
            right: false,
            run: false,
            jump: false,
            view_dir: Vec3::new(0.0, 0.0, -1.0),
        }
    }
}

impl MoveIntent {
    #[inline]
    pub fn forward_axis(&self) -> f64 {
        f64::from(u8::from(self.forward)) - f64::from(u8::from(self.back))
    }

    #[inline]
    pub fn right_axis(&self) -> f64 {
        f64::from(u8::from(self.right)) - f64::from(u8::from(self.left))
    }

    /// Unit forward/right pair on the ground plane; degenerate views face -Z.
    pub fn basis(&self) -> (Vec3, Vec3) {
        let h = self.view_dir.horizontal();
        let fwd = if h.is_finite() && h.length_sq() > 1e-12 {
            h.normalized()
        } else {
            Vec3::new(0.0, 0.0, -1.0)
        };
        let right = fwd.cross(Vec3::UP);
        (fwd, right)
    }
}

/// Kinematic state of the player. `position` is at the feet, centred in X/Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub can_jump: bool,
}

impl PlayerBody {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            can_jump: false,
        }
    }

    #[inline]
    pub fn feet(&self) -> f64 {
        self.position.y
    }

    #[inline]
    pub fn head(&self, height: f64) -> f64 {
        self.position.y + height
    }

    #[inline]
    pub fn eye(&self, height: f64) -> Vec3 {
        Vec3::new(self.position.x, self.position.y + height, self.position.z)
    }
}
