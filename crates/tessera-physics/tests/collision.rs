use proptest::prelude::*;
use tessera_geom::{Aabb, Vec3};
use tessera_physics::{
    AabbOwner, MotionIntegrator, MotionParams, MoveIntent, OpenSpace, PlayerBody, TerrainQuery, WorldAabb,
};

fn solid(min: Vec3, max: Vec3, i: usize) -> WorldAabb {
    WorldAabb {
        bounds: Aabb::new(min, max),
        owner: AabbOwner::Static(i),
    }
}

fn floor() -> WorldAabb {
    solid(Vec3::new(-50.0, -1.0, -50.0), Vec3::new(50.0, 0.0, 50.0), 0)
}

fn open() -> OpenSpace {
    OpenSpace {
        spawn: Vec3::new(0.0, 4.0, 0.0),
    }
}

/// Heightfield rising along +x with a fixed slope.
struct Ramp {
    slope: f64,
}

impl Ramp {
    fn height(&self, x: f64) -> f64 {
        (x * self.slope).max(0.0)
    }
}

impl TerrainQuery for Ramp {
    fn ground_distance(&self, origin: Vec3) -> Option<f64> {
        Some(origin.y - self.height(origin.x))
    }

    fn spawn_point(&self) -> Vec3 {
        Vec3::new(0.0, 2.0, 0.0)
    }
}

fn forward_along(dir: Vec3) -> MoveIntent {
    MoveIntent {
        forward: true,
        view_dir: dir,
        ..MoveIntent::default()
    }
}

fn step_course(h: f64) -> Vec<WorldAabb> {
    vec![floor(), solid(Vec3::new(2.0, 0.0, -2.0), Vec3::new(4.0, h, 2.0), 1)]
}

#[test]
fn low_ledge_is_climbed_in_one_tick() {
    let m = MotionIntegrator::default();
    let boxes = step_course(0.9);
    let mut b = PlayerBody::new(Vec3::new(1.5, 0.0, 0.0));
    let r = m.tick(&mut b, &forward_along(Vec3::new(1.0, 0.0, 0.0)), 0.05, &boxes, &open());
    assert!(r.collided);
    assert!(r.stepped);
    assert!((b.position.y - 0.9).abs() < 0.01, "feet at {}", b.position.y);

    // Settles onto the ledge top on the next frame.
    m.tick(&mut b, &forward_along(Vec3::new(1.0, 0.0, 0.0)), 0.05, &boxes, &open());
    assert!((b.position.y - 0.9).abs() < 1e-9);
}

#[test]
fn tall_ledge_blocks() {
    let m = MotionIntegrator::default();
    let boxes = step_course(1.2);
    let mut b = PlayerBody::new(Vec3::new(1.5, 0.0, 0.0));
    for _ in 0..5 {
        m.tick(&mut b, &forward_along(Vec3::new(1.0, 0.0, 0.0)), 0.05, &boxes, &open());
        assert_eq!(b.position.y, 0.0);
        assert!(b.position.x <= 1.55 + 1e-12);
    }
}

#[test]
fn step_height_is_configurable() {
    let m = MotionIntegrator::new(MotionParams {
        step_height: 1.5,
        ..MotionParams::default()
    });
    let boxes = step_course(1.2);
    let mut b = PlayerBody::new(Vec3::new(1.5, 0.0, 0.0));
    let r = m.tick(&mut b, &forward_along(Vec3::new(1.0, 0.0, 0.0)), 0.05, &boxes, &open());
    assert!(r.stepped);
    assert!(b.position.y > 1.19);
}

#[test]
fn fall_through_is_recovered_to_spawn() {
    let m = MotionIntegrator::default();
    let mut b = PlayerBody::new(Vec3::new(3.0, -100.0, 7.0));
    b.velocity = Vec3::new(2.0, -40.0, 1.0);
    let r = m.tick(&mut b, &MoveIntent::default(), 0.016, &[floor()], &open());
    assert!(r.recovered);
    assert_eq!(b.position, open().spawn);
    assert_eq!(b.velocity, Vec3::ZERO);
}

#[test]
fn running_up_a_steep_ramp_stays_on_the_surface() {
    let m = MotionIntegrator::default();
    let ramp = Ramp { slope: 3.0 };
    let mut b = PlayerBody::new(Vec3::new(-2.0, 0.0, 0.0));
    let run = MoveIntent {
        run: true,
        ..forward_along(Vec3::new(1.0, 0.0, 0.0))
    };
    for _ in 0..80 {
        let r = m.tick(&mut b, &run, 0.05, &[], &ramp);
        assert!(!r.recovered);
        assert!(b.position.y >= ramp.height(b.position.x) - 1e-9);
    }
    assert!(b.position.x > 10.0, "stalled at x={}", b.position.x);
}

#[test]
fn falling_body_lands_on_platform() {
    let m = MotionIntegrator::default();
    let boxes = [floor(), solid(Vec3::new(-3.0, 0.1, -13.0), Vec3::new(3.0, 1.1, -7.0), 1)];
    let mut b = PlayerBody::new(Vec3::new(0.0, 6.0, -10.0));
    for _ in 0..60 {
        m.tick(&mut b, &MoveIntent::default(), 0.05, &boxes, &open());
    }
    assert!((b.position.y - 1.1).abs() < 1e-9);
    assert!(b.can_jump);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn walking_into_a_wall_never_penetrates(angle in 0.0f64..std::f64::consts::TAU, run in any::<bool>()) {
        let m = MotionIntegrator::default();
        let wall = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 10.0, 1.0));
        let boxes = [floor(), solid(wall.min, wall.max, 1)];
        let hull = wall.inflated_xz(m.params().radius);

        let start = Vec3::new(angle.cos() * 6.0, 0.0, angle.sin() * 6.0);
        let mut b = PlayerBody::new(start);
        let intent = MoveIntent {
            run,
            ..forward_along(-start)
        };
        for _ in 0..40 {
            m.tick(&mut b, &intent, 0.05, &boxes, &open());
            prop_assert!(!hull.contains_xz_strict(b.position.x, b.position.z),
                "inside at ({}, {})", b.position.x, b.position.z);
            prop_assert_eq!(b.position.y, 0.0);
        }
    }
}
