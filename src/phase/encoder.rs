//! Fraction-of-lunar-month to illumination mask.
//!
//! The moon is modeled as a ring of twelve slices of which six face us. At
//! new moon the lit half (bits 6-11) is entirely on the far side; as the
//! month progresses the ring turns left one slice per twelfth of a month,
//! bringing lit slices into the visible window (bits 0-5) from the right.

use super::BitPattern;

const RING_BITS: u32 = 12;
const RING_MASK: u16 = 0x0FFF;

/// Lit half of the ring at new moon.
const NEW_MOON_RING: u16 = 0b1111_1100_0000;

/// Rotation, in twelfths, for a fraction of a month remaining until the next
/// new moon. Always in `0..12`, for any input.
pub fn rotate_amount(fraction: f64) -> u32 {
    // Ties go to the even step. NaN casts to 0 and infinities saturate, so
    // the cast is total
    let ring = i64::from(RING_BITS);
    let steps = ((fraction * f64::from(RING_BITS)).round_ties_even() as i64).rem_euclid(ring);
    ((ring - steps) % ring) as u32
}

fn rotate_left(ring: u16, amount: u32) -> u16 {
    let amount = amount % RING_BITS;
    ((ring << amount) | (ring >> (RING_BITS - amount))) & RING_MASK
}

/// Encode the fraction of a synodic month remaining until the next new moon
/// as the visible six-slice pattern.
pub fn encode(fraction: f64) -> BitPattern {
    let ring = rotate_left(NEW_MOON_RING, rotate_amount(fraction));
    BitPattern::new((ring & u16::from(BitPattern::MASK)) as u8)
}

/// Every pattern [`encode`] can produce, in rotation order.
pub fn encodable_patterns() -> [BitPattern; 12] {
    let mut patterns = [BitPattern::OFF; 12];
    for (amount, slot) in patterns.iter_mut().enumerate() {
        let ring = rotate_left(NEW_MOON_RING, amount as u32);
        *slot = BitPattern::new((ring & u16::from(BitPattern::MASK)) as u8);
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_moon_is_dark() {
        assert_eq!(rotate_amount(0.0), 0);
        assert_eq!(encode(0.0), BitPattern::OFF);
    }

    #[test]
    fn test_half_month_is_full() {
        assert_eq!(rotate_amount(0.5), 6);
        assert_eq!(encode(0.5), BitPattern::FULL);
    }

    #[test]
    fn test_whole_month_remaining_is_dark() {
        // Just after a new moon the next one is a full month away
        assert_eq!(encode(1.0), BitPattern::OFF);
        assert_eq!(encode(0.98), BitPattern::OFF);
    }

    #[test]
    fn test_waxing_lights_right_side_first() {
        // 11/12 of a month to go: one slice, rightmost
        assert_eq!(encode(11.0 / 12.0), BitPattern::new(0b000001));
        // 9/12 to go: first quarter
        assert_eq!(encode(0.75), BitPattern::new(0b000111));
    }

    #[test]
    fn test_waning_keeps_left_side_last() {
        // A quarter month to go: last quarter
        assert_eq!(encode(0.25), BitPattern::new(0b111000));
        // One twelfth to go: only the leftmost slice
        assert_eq!(encode(1.0 / 12.0), BitPattern::new(0b100000));
    }

    #[test]
    fn test_half_steps_round_to_even() {
        // 4.5 twelfths rounds down to 4, 7.5 up to 8
        assert_eq!(rotate_amount(0.375), 8);
        assert_eq!(encode(0.375), BitPattern::new(0b111100));
        assert_eq!(rotate_amount(0.625), 4);
        assert_eq!(encode(0.625), BitPattern::new(0b001111));
        assert_eq!(rotate_amount(0.125), 10);
    }

    #[test]
    fn test_out_of_range_fractions_are_normalized() {
        assert_eq!(encode(-0.25), encode(0.75));
        assert_eq!(encode(1.5), encode(0.5));
        assert_eq!(encode(-3.0), BitPattern::OFF);
        assert!(rotate_amount(-7.3) < 12);
    }

    #[test]
    fn test_non_finite_fractions_do_not_panic() {
        assert!(rotate_amount(f64::NAN) < 12);
        assert!(rotate_amount(f64::INFINITY) < 12);
        assert!(rotate_amount(f64::NEG_INFINITY) < 12);
        let _ = encode(f64::NAN);
    }

    #[test]
    fn test_encodable_patterns_are_contiguous_runs() {
        let expected = [
            0b000000, 0b000001, 0b000011, 0b000111, 0b001111, 0b011111, 0b111111, 0b111110,
            0b111100, 0b111000, 0b110000, 0b100000,
        ];
        let actual: Vec<u8> = encodable_patterns().iter().map(|p| p.bits()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_rotate_left_wraps_within_ring() {
        assert_eq!(rotate_left(0b1000_0000_0000, 1), 0b0000_0000_0001);
        assert_eq!(rotate_left(NEW_MOON_RING, 12), NEW_MOON_RING);
    }
}
