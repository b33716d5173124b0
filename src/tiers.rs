use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Split `total` across consecutive price tiers.
///
/// Each entry in `widths` is the size of a tier relative to the end of the
/// previous one, not an absolute boundary. The result has one bucket per
/// width plus a final unbounded bucket for whatever is left over, so
/// `allocate(2_500_000, &[1_000_000, 1_000_000])` is
/// `[1_000_000, 1_000_000, 500_000]`.
///
/// Lower tiers always fill first. A negative total is a caller error and
/// yields all-zero buckets.
pub fn allocate(total: Decimal, widths: &[u64]) -> Vec<Decimal> {
    let mut buckets = Vec::with_capacity(widths.len() + 1);

    let mut remaining = if total.is_sign_negative() && !total.is_zero() {
        tracing::debug!("Negative usage {total} passed to tier allocation, treating as zero");
        Decimal::ZERO
    } else {
        total
    };

    for &width in widths {
        let width = Decimal::from(width);
        let take = remaining.min(width);
        buckets.push(take);
        remaining -= take;
    }
    buckets.push(remaining);

    buckets
}

/// Like [`allocate`], but for call sites that express tiers as absolute
/// cumulative upper bounds (`[10, 50]` meaning "first 10, then up to 50").
pub fn allocate_from_bounds(total: Decimal, upper_bounds: &[u64]) -> Result<Vec<Decimal>> {
    let mut widths = Vec::with_capacity(upper_bounds.len());
    let mut previous = 0u64;

    for &bound in upper_bounds {
        if bound <= previous {
            return Err(Error::InvalidTierBounds {
                reason: format!(
                    "bounds must be strictly increasing and positive, got {bound} after {previous}"
                ),
            });
        }
        widths.push(bound - previous);
        previous = bound;
    }

    Ok(allocate(total, &widths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_spills_into_unbounded_tier() {
        let buckets = allocate(dec!(2500000), &[1_000_000, 1_000_000]);
        assert_eq!(buckets, vec![dec!(1000000), dec!(1000000), dec!(500000)]);
    }

    #[test]
    fn test_stays_in_first_tier() {
        let buckets = allocate(dec!(500), &[1_000_000, 1_000_000]);
        assert_eq!(buckets, vec![dec!(500), dec!(0), dec!(0)]);
    }

    #[test]
    fn test_zero_total() {
        let buckets = allocate(Decimal::ZERO, &[10, 20, 30]);
        assert_eq!(buckets.len(), 4);
        assert!(buckets.iter().all(|b| b.is_zero()));
    }

    #[test]
    fn test_no_tiers_is_single_bucket() {
        assert_eq!(allocate(dec!(42.5), &[]), vec![dec!(42.5)]);
    }

    #[test]
    fn test_fractional_total_lands_on_boundary() {
        let buckets = allocate(dec!(512000.75), &[512_000, 1_536_000]);
        assert_eq!(buckets, vec![dec!(512000), dec!(0.75), dec!(0)]);
    }

    #[test]
    fn test_exact_boundary_leaves_next_tier_empty() {
        let buckets = allocate(dec!(100), &[100, 100]);
        assert_eq!(buckets, vec![dec!(100), dec!(0), dec!(0)]);
    }

    #[test]
    fn test_negative_total_is_all_zero() {
        let buckets = allocate(dec!(-5), &[10]);
        assert_eq!(buckets, vec![dec!(0), dec!(0)]);
    }

    #[test]
    fn test_buckets_sum_and_fill_sequentially() {
        let widths = [10_240, 40_960, 102_400, 358_400, 536_576, 4_194_304];
        for total in [
            dec!(0),
            dec!(1),
            dec!(10240),
            dec!(10240.5),
            dec!(99999.125),
            dec!(5242880),
            dec!(7000000.01),
        ] {
            let buckets = allocate(total, &widths);
            assert_eq!(buckets.len(), widths.len() + 1);
            assert_eq!(buckets.iter().copied().sum::<Decimal>(), total);
            assert!(buckets.iter().all(|b| !b.is_sign_negative()));

            for i in 0..widths.len() {
                if !buckets[i + 1].is_zero() {
                    assert_eq!(buckets[i], Decimal::from(widths[i]), "total {total}, tier {i}");
                }
            }
        }
    }

    #[test]
    fn test_from_bounds_matches_widths() {
        let from_bounds = allocate_from_bounds(dec!(60000), &[10_240, 51_200]).unwrap();
        assert_eq!(from_bounds, allocate(dec!(60000), &[10_240, 40_960]));
    }

    #[test]
    fn test_from_bounds_rejects_unordered() {
        let err = allocate_from_bounds(dec!(1), &[100, 50]).unwrap_err();
        assert!(matches!(err, Error::InvalidTierBounds { .. }));
        assert!(allocate_from_bounds(dec!(1), &[0]).is_err());
    }
}
