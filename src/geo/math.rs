//! Spherical geometry helpers.

/// Mean Earth radius used for every distance in the crate, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6372.8;

/// Great-circle distance between two coordinates in kilometers (haversine formula).
///
/// The `min(1, ..)` clamp keeps `asin` defined when rounding pushes `a` above 1
/// for antipodal points.
///
/// # Example
///
/// ```
/// use geo_kmeans::geo::math::distance;
///
/// let quarter = distance(0.0, 0.0, 0.0, 90.0);
/// assert!((quarter - 10010.37).abs() < 0.01);
/// ```
pub fn distance(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let phi_a = lat_a.to_radians();
    let phi_b = lat_b.to_radians();
    let d_phi = phi_b - phi_a;
    let d_lambda = (lon_b - lon_a).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Circular mean of a set of angles in degrees, `atan2(sum sin, sum cos)`.
///
/// Returns 0 for an empty input. The result lies in [-180, 180].
pub fn circular_mean_degrees<I>(angles: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum_sin, sum_cos) = angles.into_iter().fold((0.0, 0.0), |(s, c), angle: f64| {
        let rad = angle.to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    if sum_sin == 0.0 && sum_cos == 0.0 {
        return 0.0;
    }
    sum_sin.atan2(sum_cos).to_degrees()
}

/// Maps a longitude onto the (-180, 180] branch.
pub fn normalize_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
