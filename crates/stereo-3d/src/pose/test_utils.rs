use glam::{DMat3, DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Two calibrated views of a random point cloud.
pub(crate) struct TwoViewScene {
    pub x1: Vec<DVec2>,
    pub x2: Vec<DVec2>,
    pub fundamental: DMat3,
}

fn skew(t: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, t.z, -t.y),
        DVec3::new(-t.z, 0.0, t.x),
        DVec3::new(t.y, -t.x, 0.0),
    )
}

fn project(k: &DMat3, p: DVec3) -> DVec2 {
    let q = *k * p;
    DVec2::new(q.x / q.z, q.y / q.z)
}

pub(crate) fn two_view_scene(num_points: usize, seed: u64) -> TwoViewScene {
    let k = DMat3::from_cols(
        DVec3::new(500.0, 0.0, 0.0),
        DVec3::new(0.0, 500.0, 0.0),
        DVec3::new(320.0, 240.0, 1.0),
    );
    let rotation = DMat3::from_rotation_y(0.08) * DMat3::from_rotation_x(0.03);
    let translation = DVec3::new(-0.6, 0.05, 0.1);

    let mut rng = StdRng::seed_from_u64(seed);
    let (x1, x2) = (0..num_points)
        .map(|_| {
            let p = DVec3::new(
                rng.random_range(-2.0..2.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(4.0..9.0),
            );
            (project(&k, p), project(&k, rotation * p + translation))
        })
        .unzip();

    let k_inv = k.inverse();
    let fundamental = k_inv.transpose() * skew(translation) * rotation * k_inv;

    TwoViewScene {
        x1,
        x2,
        fundamental,
    }
}
