use crate::models::GeoPoint;

/// Mean earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers (haversine)
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(7.07, 125.61);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let davao = GeoPoint::new(7.0731, 125.6128);
        let digos = GeoPoint::new(6.7497, 125.3572);
        assert!((distance_km(davao, digos) - distance_km(digos, davao)).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = distance_km(GeoPoint::new(7.0, 125.0), GeoPoint::new(8.0, 125.0));
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn davao_to_digos_is_roughly_45_km() {
        let d = distance_km(GeoPoint::new(7.0731, 125.6128), GeoPoint::new(6.7497, 125.3572));
        assert!((40.0..50.0).contains(&d), "got {d}");
    }
}
