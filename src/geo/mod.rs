use crate::models::courier::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn haversine_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_M * central_angle
}

/// Estimated travel time in whole minutes at the given assumed speed,
/// rounded up.
pub fn travel_time_minutes(distance_m: f64, speed_kmh: f64) -> u64 {
    let meters_per_minute = speed_kmh * 1000.0 / 60.0;
    (distance_m / meters_per_minute).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::{haversine_meters, travel_time_minutes};
    use crate::models::courier::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 53.5511,
            lng: 9.9937,
        };
        let distance = haversine_meters(&p, &p);
        assert!(distance < 1e-6);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint {
            lat: 51.5074,
            lng: -0.1278,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = haversine_meters(&london, &paris);
        assert!((distance - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn travel_time_rounds_up() {
        // 20 km/h is 333.33 m/min, so 1000 m takes 3 full minutes.
        assert_eq!(travel_time_minutes(1_000.0, 20.0), 3);
        assert_eq!(travel_time_minutes(0.0, 20.0), 0);
    }

    #[test]
    fn travel_time_is_monotonic_in_distance() {
        let mut last = 0;
        for meters in (0..20_000).step_by(250) {
            let eta = travel_time_minutes(meters as f64, 20.0);
            assert!(eta >= last);
            last = eta;
        }
    }
}
