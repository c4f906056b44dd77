use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::Rate;

/// Number of explicitly projected years.
pub const PROJECTION_YEARS: u32 = 10;

/// Year at which the near-term glide path (and the margin ramp) completes.
pub const RAMP_YEARS: u32 = 5;

/// Build the per-year revenue growth glide path.
///
/// Years 1-5 move linearly from `y1_growth` to `y5_growth`; years 6-10 move
/// linearly from `y5_growth` to `terminal_growth`, so year 10 lands on the
/// terminal rate and the perpetuity period starts without a cliff.
/// Negative rates are accepted (contraction).
pub fn generate_growth_curve(y1_growth: Rate, y5_growth: Rate, terminal_growth: Rate) -> Vec<Rate> {
    (1..=PROJECTION_YEARS)
        .map(|year| growth_rate_for_year(y1_growth, y5_growth, terminal_growth, year))
        .collect()
}

/// Growth rate for a single 1-based year on the glide path.
pub fn growth_rate_for_year(y1_growth: Rate, y5_growth: Rate, terminal_growth: Rate, year: u32) -> Rate {
    if year <= RAMP_YEARS {
        let step = Decimal::from(year.saturating_sub(1));
        y1_growth - (y1_growth - y5_growth) * step / dec!(4)
    } else {
        let step = Decimal::from(year.min(PROJECTION_YEARS) - RAMP_YEARS);
        y5_growth - (y5_growth - terminal_growth) * step / dec!(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_curve_has_ten_years() {
        let curve = generate_growth_curve(dec!(0.15), dec!(0.08), dec!(0.025));
        assert_eq!(curve.len(), PROJECTION_YEARS as usize);
    }

    #[test]
    fn test_anchor_points_are_exact() {
        let curve = generate_growth_curve(dec!(0.15), dec!(0.08), dec!(0.025));
        assert_eq!(curve[0], dec!(0.15));
        assert_eq!(curve[4], dec!(0.08));
        // Year 10 is the end of the 6-10 glide
        assert_eq!(curve[9], dec!(0.025));
    }

    #[test]
    fn test_linear_segments() {
        let curve = generate_growth_curve(dec!(0.15), dec!(0.08), dec!(0.025));
        assert_eq!(
            curve,
            vec![
                dec!(0.15),
                dec!(0.1325),
                dec!(0.115),
                dec!(0.0975),
                dec!(0.08),
                dec!(0.069),
                dec!(0.058),
                dec!(0.047),
                dec!(0.036),
                dec!(0.025),
            ]
        );
    }

    #[test]
    fn test_monotonic_by_segment_when_decelerating() {
        let curve = generate_growth_curve(dec!(0.20), dec!(0.10), dec!(0.03));
        for pair in curve.windows(2) {
            assert!(pair[0] >= pair[1], "{} should be >= {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_accelerating_and_negative_growth() {
        let curve = generate_growth_curve(dec!(-0.05), dec!(0.03), dec!(0.02));
        assert_eq!(curve[0], dec!(-0.05));
        assert_eq!(curve[2], dec!(-0.01));
        assert_eq!(curve[4], dec!(0.03));
        assert!(curve[5] < curve[4]);
    }

    #[test]
    fn test_flat_curve_when_all_anchors_equal() {
        let curve = generate_growth_curve(dec!(0.04), dec!(0.04), dec!(0.04));
        assert!(curve.iter().all(|r| *r == dec!(0.04)));
    }
}
