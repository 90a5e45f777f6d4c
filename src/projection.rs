//! Celestial-sphere projection: (RA, Dec) in degrees to Cartesian unit vectors.
//!
//! The re-registration pipeline matches catalogs in 3D chord space, so every
//! coordinate pair is first mapped onto the unit sphere:
//!
//! ```text
//! x = sin(ra)·cos(dec)
//! y = cos(ra)·cos(dec)
//! z = sin(dec)
//! ```
//!
//! `cos(dec)` is computed as `sqrt(1 − sin²(dec))`, which is valid because
//! declination lies in [−90°, 90°] where the cosine is non-negative.

/// Project a single (RA, Dec) pair in degrees onto the unit sphere.
///
/// For declinations inside [−90°, 90°] the result has unit norm. The radicand
/// of the cos(dec) term is clamped at zero so the poles can never round into a
/// NaN.
#[inline]
pub fn radec_to_xyz(ra_deg: f64, dec_deg: f64) -> [f64; 3] {
    let (sin_ra, cos_ra) = ra_deg.to_radians().sin_cos();
    let sin_dec = dec_deg.to_radians().sin().clamp(-1.0, 1.0);
    let cos_dec = (1.0 - sin_dec * sin_dec).max(0.0).sqrt();
    [sin_ra * cos_dec, cos_ra * cos_dec, sin_dec]
}

/// Project parallel RA/Dec slices element-wise.
///
/// Both slices must have the same length; output order matches input order.
pub fn radec_slice_to_xyz(ra_deg: &[f64], dec_deg: &[f64]) -> Vec<[f64; 3]> {
    assert_eq!(
        ra_deg.len(),
        dec_deg.len(),
        "ra and dec slices must have the same length"
    );
    ra_deg
        .iter()
        .zip(dec_deg)
        .map(|(&ra, &dec)| radec_to_xyz(ra, dec))
        .collect()
}
