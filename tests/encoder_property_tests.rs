use moonlite::phase::BitPattern;
use moonlite::phase::encoder::{encodable_patterns, encode, rotate_amount};
use proptest::prelude::*;

/// Fractions that are not within rounding noise of a half-step boundary.
fn clear_fraction() -> impl Strategy<Value = f64> {
    (0.0..1.0f64).prop_filter("near a rounding boundary", |f| {
        let scaled = (f * 12.0).fract();
        (scaled - 0.5).abs() > 1e-6
    })
}

proptest! {
    #[test]
    fn test_pattern_fits_six_bits(fraction in any::<f64>()) {
        prop_assert!(encode(fraction).bits() <= BitPattern::MASK);
        prop_assert!(rotate_amount(fraction) < 12);
    }

    #[test]
    fn test_every_output_is_encodable(fraction in any::<f64>()) {
        prop_assert!(encodable_patterns().contains(&encode(fraction)));
    }

    #[test]
    fn test_error_sentinel_never_produced(fraction in any::<f64>()) {
        prop_assert_ne!(encode(fraction), BitPattern::new(0b001100));
    }

    #[test]
    fn test_whole_months_do_not_change_pattern(fraction in clear_fraction(), months in -5i32..5) {
        prop_assert_eq!(encode(fraction), encode(fraction + f64::from(months)));
    }

    #[test]
    fn test_matches_rotation_of_template(fraction in clear_fraction()) {
        let expected_rotation = (12 - (fraction * 12.0).round_ties_even() as u32) % 12;
        prop_assert_eq!(rotate_amount(fraction), expected_rotation);
        prop_assert_eq!(encode(fraction), encodable_patterns()[expected_rotation as usize]);
    }

    #[test]
    fn test_lit_count_follows_rotation(fraction in clear_fraction()) {
        let rotation = rotate_amount(fraction);
        let lit = encode(fraction).bits().count_ones();
        let expected = if rotation <= 6 { rotation } else { 12 - rotation };
        prop_assert_eq!(lit, expected);
    }
}

#[test]
fn test_half_steps_pick_even_rotation() {
    // Odd eighths land exactly on half twelfths: 1.5, 4.5, 7.5, 10.5
    for (eighths, rounded) in [(1, 2), (3, 4), (5, 8), (7, 10)] {
        let fraction = f64::from(eighths) / 8.0;
        assert_eq!(rotate_amount(fraction), (12 - rounded) % 12, "fraction {fraction}");
    }
}

#[test]
fn test_reference_points() {
    assert_eq!(encode(0.0), BitPattern::OFF);
    assert_eq!(encode(0.5), BitPattern::FULL);
    assert_eq!(encode(0.75), BitPattern::new(0b000111));
    assert_eq!(encode(0.25), BitPattern::new(0b111000));
}
