use meshmend_core::index::{normalize, Rebase};
use meshmend_core::normals::{self, NormalDecision, MAX_MEAN_LENGTH, MIN_MEAN_LENGTH};
use meshmend_core::{FramingMode, Geometry, IndexBuffer, RepairController, View};
use proptest::prelude::*;

fn positions() -> impl Strategy<Value = Vec<f32>> {
    (1usize..20).prop_flat_map(|n| prop::collection::vec(-1.0e4f32..1.0e4, n * 3))
}

fn geometry(positions: Vec<f32>) -> Geometry {
    let count = positions.len() / 3;
    Geometry::build(Some(positions), IndexBuffer::sequential(count).unwrap(), None, None).unwrap()
}

fn bits(values: &[f32]) -> Vec<u32> {
    values.iter().map(|v| v.to_bits()).collect()
}

proptest! {
    #[test]
    fn rebase_is_noop_when_min_is_zero(mut values in prop::collection::vec(0u32..100_000, 1..60)) {
        values[0] = 0;
        let mut buffer = IndexBuffer::from_values(values.clone());
        prop_assert_eq!(buffer.rebase_to_zero(), Ok(Rebase::AlreadyZeroBased));
        prop_assert_eq!(buffer.to_vec(), values);
    }

    #[test]
    fn rebase_shifts_by_one_and_keeps_differences(values in prop::collection::vec(1u32..100_000, 1..60)) {
        let mut buffer = IndexBuffer::from_values(values.clone());
        let rebased = matches!(buffer.rebase_to_zero(), Ok(Rebase::Rebased { .. }));
        prop_assert!(rebased, "expected the buffer to be rebased");

        let after = buffer.to_vec();
        for (a, b) in values.iter().zip(&after) {
            prop_assert_eq!(*a - 1, *b);
        }
        for w in values.windows(2).zip(after.windows(2)) {
            let (before, after) = w;
            prop_assert_eq!(
                i64::from(before[1]) - i64::from(before[0]),
                i64::from(after[1]) - i64::from(after[0])
            );
        }
    }

    #[test]
    fn width_follows_max_index(values in prop::collection::vec(0u32..200_000, 3..30)) {
        let len = values.len() / 3 * 3;
        let raw: Vec<f64> = values[..len].iter().map(|&v| f64::from(v)).collect();
        let out = normalize(Some(&raw), 200_000).unwrap();
        let max = values[..len].iter().copied().max().unwrap_or(0);
        prop_assert_eq!(out.buffer.width().bytes(), if max <= 65_535 { 2 } else { 4 });
    }

    #[test]
    fn swap_yz_twice_is_identity(positions in positions()) {
        let mut g = geometry(positions.clone());
        let mut view = View::new(800, 500, FramingMode::Fit);
        let mut controller = RepairController::new(&mut g, &mut view);
        controller.swap_yz();
        controller.swap_yz();
        prop_assert_eq!(bits(g.positions()), bits(&positions));
    }

    #[test]
    fn flip_x_twice_is_identity(positions in positions()) {
        let mut g = geometry(positions.clone());
        let mut view = View::new(800, 500, FramingMode::Fit);
        let mut controller = RepairController::new(&mut g, &mut view);
        controller.flip_x();
        controller.flip_x();
        prop_assert_eq!(bits(g.positions()), bits(&positions));
    }

    #[test]
    fn normals_band_decides_acceptance(length in 0.0f32..5.0, n in 1usize..10) {
        let raw: Vec<f32> = (0..n).flat_map(|_| [0.0, 0.0, length]).collect();
        let mean = normals::mean_length(&raw);
        let decision = normals::validate(Some(raw), n);
        let in_band = (MIN_MEAN_LENGTH..=MAX_MEAN_LENGTH).contains(&mean);
        prop_assert_eq!(matches!(decision, NormalDecision::Accepted(_)), in_band);
    }

    #[test]
    fn framing_is_stable(positions in positions()) {
        let mut g = geometry(positions);
        let mut view = View::new(800, 500, FramingMode::Fit);
        let bounds = g.compute_bounding_box().unwrap();
        let first = view.frame(&bounds);
        let framing = view.framing;
        prop_assert_eq!(view.frame(&bounds), first);
        prop_assert_eq!(view.framing, framing);
    }
}
