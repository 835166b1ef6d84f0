//! Fixed-point arithmetic for relative sizes.
//!
//! A share is measured in hundredths of a percent, so the shares of all
//! children of a container sum to exactly [`TOTAL`]. Percentages only appear
//! at the edges (documents and the public API), converted with [`to_percent`].

/// Sum of the shares of a container's children (100%).
pub const TOTAL: u32 = 10_000;

const PER_PERCENT: f64 = 100.0;

/// Resolution at which percentages are weighted before apportioning.
const WEIGHT_SCALE: f64 = 1_000_000.0;

pub fn to_percent(share: u32) -> f64 { f64::from(share) / PER_PERCENT }

/// Converts a percentage delta to the nearest whole share delta.
pub fn delta_from_percent(percent: f64) -> i64 { (percent * PER_PERCENT).round() as i64 }

pub fn delta_to_percent(delta: i64) -> f64 { delta as f64 / PER_PERCENT }

/// Splits [`TOTAL`] evenly, earlier children absorbing the remainder.
pub fn equal(count: usize) -> Vec<u32> { apportion(&vec![1; count], TOTAL) }

/// Scales `shares` so they sum to [`TOTAL`] while keeping their proportions.
///
/// All-zero input falls back to an equal split.
pub fn rescale(shares: &[u32]) -> Vec<u32> {
    let weights: Vec<u64> = shares.iter().copied().map(u64::from).collect();
    apportion(&weights, TOTAL)
}

/// Normalizes caller-supplied percentages to shares.
///
/// The values need not sum to 100, but they must be finite, non-negative, and
/// not all zero. On failure the reason is returned.
pub fn from_percentages(values: &[f64]) -> Result<Vec<u32>, &'static str> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err("sizes must be finite");
    }
    if values.iter().any(|&v| v < 0.0) {
        return Err("sizes must not be negative");
    }
    if !values.is_empty() && values.iter().all(|&v| v == 0.0) {
        return Err("sizes must not all be zero");
    }
    let weights: Vec<u64> = values.iter().map(|v| (v * WEIGHT_SCALE).round() as u64).collect();
    Ok(apportion(&weights, TOTAL))
}

/// Returns the shares after inserting a new child at `index`.
///
/// The newcomer gets an equal share; existing children split the rest in
/// their current proportions.
pub fn insert(shares: &[u32], index: usize) -> Vec<u32> {
    let count = shares.len() + 1;
    let new_share = TOTAL / count as u32;
    let weights: Vec<u64> = shares.iter().copied().map(u64::from).collect();
    let mut out = apportion(&weights, TOTAL - new_share);
    out.insert(index.min(shares.len()), new_share);
    out
}

/// Moves the boundary between `shares[boundary]` and `shares[boundary + 1]`.
///
/// A positive `delta` grows the left side. Neither side is pushed below
/// `floor`, and a side already under the floor is never shrunk further.
/// Returns the delta actually applied.
pub fn move_boundary(shares: &mut [u32], boundary: usize, delta: i64, floor: u32) -> i64 {
    let left = i64::from(shares[boundary]);
    let right = i64::from(shares[boundary + 1]);
    let floor = i64::from(floor);
    let applied = delta.clamp(-(left - floor).max(0), (right - floor).max(0));
    shares[boundary] = (left + applied) as u32;
    shares[boundary + 1] = (right - applied) as u32;
    applied
}

/// Largest-remainder apportionment of `total` by `weights`.
///
/// Ties go to the earlier index, which keeps the result deterministic.
fn apportion(weights: &[u64], total: u32) -> Vec<u32> {
    if weights.is_empty() {
        return Vec::new();
    }
    let sum: u128 = weights.iter().copied().map(u128::from).sum();
    if sum == 0 {
        return apportion(&vec![1; weights.len()], total);
    }

    let total_wide = u128::from(total);
    let mut out = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (i, &w) in weights.iter().enumerate() {
        let scaled = u128::from(w) * total_wide;
        out.push((scaled / sum) as u32);
        remainders.push((scaled % sum, i));
    }

    let assigned: u32 = out.iter().sum();
    let leftover = (total - assigned) as usize;
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, i) in remainders.iter().take(leftover) {
        out[i] += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(shares: &[u32]) -> u32 { shares.iter().sum() }

    #[test]
    fn equal_split() {
        assert_eq!(equal(0), Vec::<u32>::new());
        assert_eq!(equal(1), [10_000]);
        assert_eq!(equal(2), [5_000, 5_000]);
        assert_eq!(equal(3), [3_334, 3_333, 3_333]);
        assert_eq!(sum(&equal(7)), TOTAL);
    }

    #[test]
    fn percentages_are_kept_exactly() {
        assert_eq!(from_percentages(&[30.0, 70.0]).unwrap(), [3_000, 7_000]);
        assert_eq!(from_percentages(&[25.0, 25.0, 50.0]).unwrap(), [2_500, 2_500, 5_000]);
        assert_eq!(from_percentages(&[33.33, 33.33, 33.34]).unwrap(), [3_333, 3_333, 3_334]);
        assert_eq!(from_percentages(&[]).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn percentages_are_normalized() {
        assert_eq!(from_percentages(&[1.0, 1.0]).unwrap(), [5_000, 5_000]);
        assert_eq!(from_percentages(&[1.0, 3.0]).unwrap(), [2_500, 7_500]);
        assert_eq!(from_percentages(&[0.0, 2.0]).unwrap(), [0, 10_000]);
        assert_eq!(sum(&from_percentages(&[1.0, 1.0, 1.0]).unwrap()), TOTAL);
    }

    #[test]
    fn invalid_percentages() {
        assert!(from_percentages(&[-1.0, 101.0]).is_err());
        assert!(from_percentages(&[f64::NAN, 50.0]).is_err());
        assert!(from_percentages(&[f64::INFINITY]).is_err());
        assert!(from_percentages(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn rescale_keeps_proportions() {
        assert_eq!(rescale(&[2_500, 5_000]), [3_333, 6_667]);
        assert_eq!(rescale(&[3_000, 3_000]), [5_000, 5_000]);
        assert_eq!(rescale(&[0, 0]), [5_000, 5_000]);
        assert_eq!(rescale(&[10_000]), [10_000]);
    }

    #[test]
    fn insert_gives_equal_share() {
        assert_eq!(insert(&[], 0), [10_000]);
        assert_eq!(insert(&[10_000], 1), [5_000, 5_000]);
        assert_eq!(insert(&[5_000, 5_000], 0), [3_333, 3_334, 3_333]);
        assert_eq!(insert(&[2_000, 8_000], 2), [1_333, 5_334, 3_333]);
        assert_eq!(sum(&insert(&[2_000, 8_000], 1)), TOTAL);
    }

    #[test]
    fn move_boundary_respects_floor() {
        let mut shares = vec![5_000, 5_000];
        assert_eq!(move_boundary(&mut shares, 0, 2_000, 500), 2_000);
        assert_eq!(shares, [7_000, 3_000]);

        assert_eq!(move_boundary(&mut shares, 0, 9_000, 500), 2_500);
        assert_eq!(shares, [9_500, 500]);

        assert_eq!(move_boundary(&mut shares, 0, -20_000, 500), -9_000);
        assert_eq!(shares, [500, 9_500]);
    }

    #[test]
    fn percent_deltas() {
        assert_eq!(delta_from_percent(12.5), 1_250);
        assert_eq!(delta_from_percent(-0.004), 0);
        assert_eq!(delta_to_percent(-1_250), -12.5);
    }

    #[test]
    fn move_boundary_below_floor_never_shrinks() {
        let mut shares = vec![200, 9_600, 200];
        assert_eq!(move_boundary(&mut shares, 0, -100, 500), 0);
        assert_eq!(shares, [200, 9_600, 200]);
        assert_eq!(move_boundary(&mut shares, 1, 100, 500), 0);
        assert_eq!(move_boundary(&mut shares, 1, -400, 500), -400);
        assert_eq!(shares, [200, 9_200, 600]);
        assert_eq!(sum(&shares), TOTAL);
    }
}
