use crate::body::{MotionParams, MoveIntent, PlayerBody};
use crate::collide::{CollisionResolver, VerticalContact};
use crate::probe::TerrainQuery;
use crate::registry::{WorldAabb, raycast_boxes};
use tessera_geom::Vec3;

/// Residual speeds below this snap to zero.
pub const VELOCITY_DEADZONE: f64 = 1e-3;

#[inline]
fn approach(cur: f64, target: f64, max_step: f64) -> f64 {
    if cur < target {
        target.min(cur + max_step)
    } else if cur > target {
        target.max(cur - max_step)
    } else {
        cur
    }
}

#[inline]
fn deadzone(v: f64) -> f64 {
    if v.abs() < VELOCITY_DEADZONE { 0.0 } else { v }
}

/// What happened during one [`MotionIntegrator::tick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub dt: f64,
    pub contact: VerticalContact,
    pub snapped: bool,
    pub collided: bool,
    pub stepped: bool,
    pub recovered: bool,
}

impl StepReport {
    fn new(dt: f64) -> Self {
        Self {
            dt,
            contact: VerticalContact::None,
            snapped: false,
            collided: false,
            stepped: false,
            recovered: false,
        }
    }

    pub fn grounded(&self) -> bool {
        self.contact == VerticalContact::Landed || self.snapped || self.stepped
    }
}

pub struct MotionIntegrator {
    params: MotionParams,
    resolver: CollisionResolver,
}

impl Default for MotionIntegrator {
    fn default() -> Self {
        Self::new(MotionParams::default())
    }
}

impl MotionIntegrator {
    pub fn new(params: MotionParams) -> Self {
        let params = params.sanitized();
        let resolver = CollisionResolver::from_params(&params);
        Self { params, resolver }
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    pub fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    pub fn set_params(&mut self, params: MotionParams) {
        *self = Self::new(params);
    }

    /// Advances `body` by one frame.
    ///
    /// Order: input and gravity, vertical move and resolve, fall recovery,
    /// ground snap, horizontal move and resolve, then a step-up (after a
    /// collision) or a forward probe (otherwise). Feet that end up under a
    /// heightfield are lifted back onto it last.
    pub fn tick(
        &self,
        body: &mut PlayerBody,
        intent: &MoveIntent,
        dt: f64,
        boxes: &[WorldAabb],
        terrain: &dyn TerrainQuery,
    ) -> StepReport {
        let p = &self.params;
        let dt = if dt.is_finite() { dt.clamp(0.0, p.max_delta) } else { 0.0 };
        let mut report = StepReport::new(dt);

        if !body.position.is_finite() || !body.velocity.is_finite() {
            self.recover(body, terrain);
            report.recovered = true;
            return report;
        }

        let speed = p.walk_speed * if intent.run { p.run_multiplier } else { 1.0 };
        let max_step = speed * p.acceleration * dt;
        let (fwd, right) = intent.basis();
        let (sf, sr) = (intent.forward_axis(), intent.right_axis());

        let mut vf = approach(body.velocity.dot(fwd), sf * speed, max_step);
        let mut vr = approach(body.velocity.dot(right), sr * speed, max_step);
        let damping = (1.0 - 8.0 * dt).max(0.8);
        if sf == 0.0 {
            vf *= damping;
        }
        if sr == 0.0 {
            vr *= damping;
        }
        let (vf, vr) = (deadzone(vf), deadzone(vr));

        let mut vy = body.velocity.y;
        if intent.jump && body.can_jump {
            vy = p.jump_strength;
            body.can_jump = false;
        }
        vy -= p.gravity * dt;
        body.velocity = fwd * vf + right * vr + Vec3::UP * vy;

        let prev_feet = body.feet();
        let prev_head = body.head(p.height);
        body.position.y += body.velocity.y * dt;
        report.contact = self.resolver.resolve_vertical(body, prev_feet, prev_head, boxes);

        if body.position.y < p.fall_floor {
            self.recover(body, terrain);
            report.recovered = true;
            return report;
        }

        let eye = body.eye(p.height);
        let box_hit = raycast_boxes(boxes, eye, Vec3::DOWN, p.height).map(|h| h.distance);
        let ground = match (box_hit, terrain.ground_distance(eye)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(d) = ground {
            if d < p.height {
                body.position.y += p.height - d;
                body.velocity.y = 0.0;
                body.can_jump = true;
                report.snapped = true;
            }
        }

        body.position.x += body.velocity.x * dt;
        body.position.z += body.velocity.z * dt;
        report.collided = self.resolver.resolve_horizontal(body, boxes);
        report.stepped = if report.collided {
            self.resolver.attempt_step_up(body, boxes)
        } else {
            let heading = body.velocity.horizontal();
            self.resolver.attempt_step_up_probe(body, heading, boxes)
        };

        // The horizontal move can carry the feet into a rising heightfield.
        if let Some(d) = terrain.ground_distance(body.position) {
            if d < 0.0 {
                body.position.y -= d;
                body.velocity.y = body.velocity.y.max(0.0);
                body.can_jump = true;
                report.snapped = true;
            }
        }
        report
    }

    fn recover(&self, body: &mut PlayerBody, terrain: &dyn TerrainQuery) {
        let spawn = terrain.spawn_point();
        log::info!(
            "body left the world at ({:.1}, {:.1}, {:.1}); respawning at ({:.1}, {:.1}, {:.1})",
            body.position.x,
            body.position.y,
            body.position.z,
            spawn.x,
            spawn.y,
            spawn.z
        );
        body.position = spawn;
        body.velocity = Vec3::ZERO;
        body.can_jump = false;
    }
}
