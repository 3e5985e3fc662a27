use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stack_registration::*;

fn random_affine(rng: &mut StdRng) -> Matrix3 {
    Matrix3::from_rows(
        [rng.gen_range(0.7..1.3), rng.gen_range(-0.3..0.3), rng.gen_range(-20.0..20.0)],
        [rng.gen_range(-0.3..0.3), rng.gen_range(0.7..1.3), rng.gen_range(-20.0..20.0)],
    )
}

#[test]
fn test_translation_example() {
    let m = estimate(
        TransformFamily::Translation,
        &AnchorSet::new(vec![[0.0, 0.0]]),
        &AnchorSet::new(vec![[5.0, 3.0]]),
    )
    .unwrap();
    assert_eq!(m, Matrix3([[1.0, 0.0, 5.0], [0.0, 1.0, 3.0], [0.0, 0.0, 1.0]]));
}

#[test]
fn test_affine_round_trip_on_random_maps() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let truth = random_affine(&mut rng);
        let (width, height) = (rng.gen_range(64..1024), rng.gen_range(64..1024));
        let anchors = TransformFamily::Affine.canonical_anchors(width, height);
        let moved = anchors.warped(&truth);
        let fitted = TransformFamily::Affine.estimate(&anchors, &moved).unwrap();
        assert!(fitted.max_abs_diff(&truth) < 1e-8, "{fitted:?} vs {truth:?}");
    }
}

#[test]
fn test_every_family_recovers_identity() {
    for family in TransformFamily::ALL {
        let anchors = family.canonical_anchors(320, 240);
        let m = family.estimate(&anchors, &anchors).unwrap();
        assert!(m.max_abs_diff(&Matrix3::identity()) < 1e-9, "{family}: {m:?}");
    }
}

#[test]
fn test_rigid_body_round_trip_on_random_rotations() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..50 {
        let angle: f64 = rng.gen_range(-1.0..1.0);
        let truth = Matrix3::from_rows(
            [angle.cos(), -angle.sin(), rng.gen_range(-30.0..30.0)],
            [angle.sin(), angle.cos(), rng.gen_range(-30.0..30.0)],
        );
        let anchors = TransformFamily::RigidBody.canonical_anchors(200, 160);
        let fitted = TransformFamily::RigidBody
            .estimate(&anchors, &anchors.warped(&truth))
            .unwrap();
        assert!(fitted.max_abs_diff(&truth) < 1e-9, "{fitted:?} vs {truth:?}");
    }
}

#[test]
fn test_composition_order_applies_local_after_global() {
    let global = Matrix3::translation(3.0, 0.0);
    let local = Matrix3::from_rows([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]);
    let composed = local.compose(&global);
    // (1, 0) -> (4, 0) -> (0, 4)
    assert_eq!(composed.apply([1.0, 0.0]), [0.0, 4.0]);
}
