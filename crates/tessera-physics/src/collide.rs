use crate::body::{MotionParams, PlayerBody};
use crate::registry::WorldAabb;
use tessera_geom::{Aabb, Vec3};

/// Vertical slack when deciding whether a box spans the body.
pub const HORIZONTAL_EPS: f64 = 1e-2;
/// Tolerance on step tops; also the lift added when a step is taken.
pub const STEP_EPS: f64 = 1e-3;
/// How far past the radius the directional probe looks.
pub const PROBE_MARGIN: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalContact {
    None,
    /// Feet came to rest on a box top.
    Landed,
    /// Head struck a box underside.
    Bumped,
}

/// Resolves a cylinder body against world boxes. Boxes are inflated by the
/// body radius in X/Z so the body itself can be treated as a vertical segment.
#[derive(Clone, Copy, Debug)]
pub struct CollisionResolver {
    pub radius: f64,
    pub height: f64,
    pub step_height: f64,
}

impl CollisionResolver {
    pub fn new(radius: f64, height: f64, step_height: f64) -> Self {
        Self {
            radius,
            height,
            step_height: step_height.max(0.0),
        }
    }

    pub fn from_params(p: &MotionParams) -> Self {
        Self::new(p.radius, p.height, p.step_height)
    }

    #[inline]
    fn footprint(&self, b: &Aabb) -> Aabb {
        b.inflated_xz(self.radius)
    }

    #[inline]
    fn spans_body(b: &Aabb, feet: f64, head: f64) -> bool {
        b.overlaps_y(feet, head, HORIZONTAL_EPS)
    }

    /// Clamps a swept vertical move. Compares this frame's feet/head against
    /// the previous frame's, so a box is only hit when a face was crossed.
    pub fn resolve_vertical(
        &self,
        body: &mut PlayerBody,
        prev_feet: f64,
        prev_head: f64,
        boxes: &[WorldAabb],
    ) -> VerticalContact {
        let (x, z) = (body.position.x, body.position.z);
        let feet = body.position.y;
        let head = feet + self.height;
        let vy = body.velocity.y;

        if vy < 0.0 {
            let mut top: Option<f64> = None;
            for b in boxes {
                let fp = self.footprint(&b.bounds);
                if !fp.contains_xz(x, z) {
                    continue;
                }
                if prev_feet >= fp.max.y && feet < fp.max.y {
                    top = Some(top.map_or(fp.max.y, |t: f64| t.max(fp.max.y)));
                }
            }
            if let Some(t) = top {
                body.position.y = t;
                body.velocity.y = 0.0;
                body.can_jump = true;
                return VerticalContact::Landed;
            }
        } else if vy > 0.0 {
            let mut bottom: Option<f64> = None;
            for b in boxes {
                let fp = self.footprint(&b.bounds);
                if !fp.contains_xz(x, z) {
                    continue;
                }
                if prev_head <= fp.min.y && head > fp.min.y {
                    bottom = Some(bottom.map_or(fp.min.y, |m: f64| m.min(fp.min.y)));
                }
            }
            if let Some(m) = bottom {
                body.position.y = m - self.height;
                body.velocity.y = 0.0;
                body.can_jump = false;
                return VerticalContact::Bumped;
            }
        }
        VerticalContact::None
    }

    /// Greedy push-out, one box at a time in input order. Each overlapping box
    /// moves the body to its nearest inflated face on whichever axis needs
    /// the smaller push, and zeroes velocity on that axis.
    pub fn resolve_horizontal(&self, body: &mut PlayerBody, boxes: &[WorldAabb]) -> bool {
        let feet = body.position.y;
        let head = feet + self.height;
        let mut collided = false;
        for b in boxes {
            if !Self::spans_body(&b.bounds, feet, head) {
                continue;
            }
            let fp = self.footprint(&b.bounds);
            let p = &mut body.position;
            if !fp.contains_xz(p.x, p.z) {
                continue;
            }
            let dx_left = (p.x - fp.min.x).abs();
            let dx_right = (fp.max.x - p.x).abs();
            let dz_near = (p.z - fp.min.z).abs();
            let dz_far = (fp.max.z - p.z).abs();
            if dx_left.min(dx_right) < dz_near.min(dz_far) {
                p.x = if dx_left < dx_right { fp.min.x } else { fp.max.x };
                body.velocity.x = 0.0;
            } else {
                p.z = if dz_near < dz_far { fp.min.z } else { fp.max.z };
                body.velocity.z = 0.0;
            }
            collided = true;
        }
        collided
    }

    pub fn has_horizontal_overlap(&self, position: Vec3, boxes: &[WorldAabb]) -> bool {
        let feet = position.y;
        let head = feet + self.height;
        boxes.iter().any(|b| {
            Self::spans_body(&b.bounds, feet, head)
                && self.footprint(&b.bounds).contains_xz(position.x, position.z)
        })
    }

    /// Highest box top under the footprint at `(x, z)` reachable from `feet`.
    fn best_step_top(&self, x: f64, z: f64, feet: f64, boxes: &[WorldAabb]) -> Option<f64> {
        let reach = feet + self.step_height + STEP_EPS;
        boxes
            .iter()
            .filter(|b| self.footprint(&b.bounds).contains_xz(x, z))
            .map(|b| b.bounds.max.y)
            .filter(|&top| top + STEP_EPS >= feet && top <= reach)
            .fold(None, |best: Option<f64>, top| Some(best.map_or(top, |t| t.max(top))))
    }

    fn try_raise(&self, body: &mut PlayerBody, top: f64, boxes: &[WorldAabb]) -> bool {
        if top <= body.position.y + STEP_EPS {
            return false;
        }
        let raised = Vec3::new(body.position.x, top + STEP_EPS, body.position.z);
        if self.has_horizontal_overlap(raised, boxes) {
            return false;
        }
        body.position = raised;
        body.velocity.y = 0.0;
        body.can_jump = true;
        true
    }

    /// After a horizontal collision, climbs onto the highest top within step
    /// reach under the current footprint. Leaves the body untouched on failure.
    pub fn attempt_step_up(&self, body: &mut PlayerBody, boxes: &[WorldAabb]) -> bool {
        let p = body.position;
        match self.best_step_top(p.x, p.z, p.y, boxes) {
            Some(top) => self.try_raise(body, top, boxes),
            None => false,
        }
    }

    /// Same as [`Self::attempt_step_up`] but samples the footprint slightly ahead
    /// along `dir`, so a ledge can be climbed before contact.
    pub fn attempt_step_up_probe(&self, body: &mut PlayerBody, dir: Vec3, boxes: &[WorldAabb]) -> bool {
        let flat = dir.horizontal();
        if !flat.is_finite() || flat.length_sq() < 1e-6 {
            return false;
        }
        let ahead = body.position + flat.normalized() * (self.radius + PROBE_MARGIN);
        match self.best_step_top(ahead.x, ahead.z, body.position.y, boxes) {
            Some(top) => self.try_raise(body, top, boxes),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AabbOwner;

    fn boxed(min: (f64, f64, f64), max: (f64, f64, f64)) -> WorldAabb {
        WorldAabb {
            bounds: Aabb::new(Vec3::new(min.0, min.1, min.2), Vec3::new(max.0, max.1, max.2)),
            owner: AabbOwner::Static(0),
        }
    }

    fn resolver() -> CollisionResolver {
        CollisionResolver::new(0.45, 1.75, 1.0)
    }

    #[test]
    fn landing_picks_highest_crossed_top() {
        let boxes = [
            boxed((-1.0, -1.0, -1.0), (1.0, 0.0, 1.0)),
            boxed((-1.0, -1.0, -1.0), (1.0, 0.5, 1.0)),
        ];
        let mut b = PlayerBody::new(Vec3::new(0.0, -0.2, 0.0));
        b.velocity.y = -5.0;
        let c = resolver().resolve_vertical(&mut b, 1.0, 2.75, &boxes);
        assert_eq!(c, VerticalContact::Landed);
        assert_eq!(b.position.y, 0.5);
        assert_eq!(b.velocity.y, 0.0);
        assert!(b.can_jump);
    }

    #[test]
    fn head_bump_clamps_below_ceiling() {
        let boxes = [boxed((-1.0, 3.0, -1.0), (1.0, 4.0, 1.0))];
        let mut b = PlayerBody::new(Vec3::new(0.0, 1.5, 0.0));
        b.velocity.y = 4.0;
        b.can_jump = true;
        let c = resolver().resolve_vertical(&mut b, 1.0, 2.75, &boxes);
        assert_eq!(c, VerticalContact::Bumped);
        assert!((b.position.y - 1.25).abs() < 1e-12);
        assert!(!b.can_jump);
    }

    #[test]
    fn push_out_takes_shorter_axis() {
        let boxes = [boxed((2.0, 0.0, -2.0), (4.0, 3.0, 2.0))];
        let mut b = PlayerBody::new(Vec3::new(1.8, 0.0, 0.5));
        b.velocity = Vec3::new(3.0, 0.0, 1.0);
        assert!(resolver().resolve_horizontal(&mut b, &boxes));
        assert!((b.position.x - 1.55).abs() < 1e-12);
        assert_eq!(b.position.z, 0.5);
        assert_eq!(b.velocity.x, 0.0);
        assert_eq!(b.velocity.z, 1.0);
    }

    #[test]
    fn box_below_feet_is_ignored_horizontally() {
        let boxes = [boxed((-5.0, -1.0, -5.0), (5.0, 0.0, 5.0))];
        let mut b = PlayerBody::new(Vec3::new(0.0, 0.0, 0.0));
        assert!(!resolver().resolve_horizontal(&mut b, &boxes));
        assert!(!resolver().has_horizontal_overlap(b.position, &boxes));
    }

    #[test]
    fn step_up_reverts_when_blocked_above() {
        let boxes = [
            boxed((2.0, 0.0, -2.0), (4.0, 0.5, 2.0)),
            boxed((2.0, 1.0, -2.0), (4.0, 5.0, 2.0)),
        ];
        let mut b = PlayerBody::new(Vec3::new(1.55, 0.0, 0.0));
        let before = b;
        assert!(!resolver().attempt_step_up(&mut b, &boxes));
        assert_eq!(b, before);
    }

    #[test]
    fn probe_climbs_before_contact() {
        let boxes = [boxed((2.0, 0.0, -2.0), (4.0, 0.6, 2.0))];
        let mut b = PlayerBody::new(Vec3::new(1.2, 0.0, 0.0));
        assert!(resolver().attempt_step_up_probe(&mut b, Vec3::new(1.0, 0.0, 0.0), &boxes));
        assert!((b.position.y - 0.601).abs() < 1e-9);
        assert!(!resolver().attempt_step_up_probe(&mut b, Vec3::ZERO, &boxes));
    }
}
