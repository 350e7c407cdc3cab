//! CubeCL kernels for the device cumulant reduction.

use cubecl::prelude::*;

/// Reduce contiguous point ranges to nine partial sums each.
///
/// Thread `t` owns points `[t * points_per_thread, (t + 1) * points_per_thread)`
/// (clamped to `num_points`), so no atomics are needed.
///
/// # Inputs
/// - `points`: [N * 3] point coordinates (x, y, z) flattened
/// - `num_points`: number of points N
/// - `points_per_thread`: points reduced by one thread
///
/// # Outputs
/// - `partials`: [T * 9] per-thread sums `[Σx, Σy, Σz, Σxx, Σxy, Σxz, Σyy, Σyz, Σzz]`
#[cube(launch_unchecked)]
pub fn cumulant_partials_kernel<F: Float>(
    points: &Array<F>,
    num_points: u32,
    points_per_thread: u32,
    partials: &mut Array<F>,
) {
    let thread = ABSOLUTE_POS;
    let start = thread * points_per_thread;

    if start >= num_points {
        terminate!();
    }

    let mut end = start + points_per_thread;
    if end > num_points {
        end = num_points;
    }

    let mut sx = F::new(0.0);
    let mut sy = F::new(0.0);
    let mut sz = F::new(0.0);
    let mut sxx = F::new(0.0);
    let mut sxy = F::new(0.0);
    let mut sxz = F::new(0.0);
    let mut syy = F::new(0.0);
    let mut syz = F::new(0.0);
    let mut szz = F::new(0.0);

    // Bounded loop; CubeCL handles `for` over a range better than `break`
    let range_len = end - start;
    for offset in 0..range_len {
        let base = (start + offset) * 3;
        let x = points[base];
        let y = points[base + 1];
        let z = points[base + 2];

        sx += x;
        sy += y;
        sz += z;
        sxx += x * x;
        sxy += x * y;
        sxz += x * z;
        syy += y * y;
        syz += y * z;
        szz += z * z;
    }

    let out = thread * 9;
    partials[out] = sx;
    partials[out + 1] = sy;
    partials[out + 2] = sz;
    partials[out + 3] = sxx;
    partials[out + 4] = sxy;
    partials[out + 5] = sxz;
    partials[out + 6] = syy;
    partials[out + 7] = syz;
    partials[out + 8] = szz;
}
