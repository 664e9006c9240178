//! Great-circle distance and centroid helpers

use crate::models::Coordinate;

/// Haversine distance in kilometres (Earth radius 6371 km)
#[must_use]
pub fn distance_km(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine::distance(
        haversine::Location {
            latitude: from.latitude(),
            longitude: from.longitude(),
        },
        haversine::Location {
            latitude: to.latitude(),
            longitude: to.longitude(),
        },
        haversine::Units::Kilometers,
    )
}

/// Spherical mean of a non-empty coordinate list.
///
/// Positions are averaged as unit vectors, so groups straddling the
/// antimeridian get a centroid among their members.
#[must_use]
pub fn centroid(coordinates: &[Coordinate]) -> Option<Coordinate> {
    if coordinates.is_empty() {
        return None;
    }
    let (x, y, z) = coordinates.iter().fold((0.0_f64, 0.0_f64, 0.0_f64), |(x, y, z), c| {
        let (lat, lon) = (c.latitude().to_radians(), c.longitude().to_radians());
        (
            x + lat.cos() * lon.cos(),
            y + lat.cos() * lon.sin(),
            z + lat.sin(),
        )
    });
    let horizontal = x.hypot(y);
    if horizontal < 1e-12 && z.abs() < 1e-12 {
        // antipodal members cancel out; fall back to the plain mean
        let n = coordinates.len() as f64;
        let (lat, lon) = coordinates.iter().fold((0.0, 0.0), |(lat, lon), c| {
            (lat + c.latitude(), lon + c.longitude())
        });
        return Some(Coordinate::from_valid(lat / n, lon / n));
    }
    let latitude = z.atan2(horizontal).to_degrees().clamp(-90.0, 90.0);
    let longitude = y.atan2(x).to_degrees().clamp(-180.0, 180.0);
    Some(Coordinate::from_valid(latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (c(33.2382, 131.6126), c(33.5904, 130.4017)),
            (c(-33.8688, 151.2093), c(51.5074, -0.1278)),
            (c(89.9, 179.9), c(-89.9, -179.9)),
            (c(0.0, 0.0), c(0.0, 0.0001)),
        ];
        for (a, b) in pairs {
            assert!((distance_km(&a, &b) - distance_km(&b, &a)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let a = c(35.0116, 135.7681);
        assert!(distance_km(&a, &a).abs() < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // Oita to Fukuoka, roughly 116 km
        let oita = c(33.2382, 131.6126);
        let fukuoka = c(33.5904, 130.4017);
        let d = distance_km(&oita, &fukuoka);
        assert!(d > 110.0 && d < 125.0, "distance was {d}");
    }

    #[test]
    fn test_centroid() {
        assert!(centroid(&[]).is_none());
        let mid = centroid(&[c(0.0, 20.0), c(0.0, 40.0)]).unwrap();
        assert!(mid.latitude().abs() < 1e-9);
        assert!((mid.longitude() - 30.0).abs() < 1e-9);

        let single = centroid(&[c(33.2382, 131.6126)]).unwrap();
        assert!((single.latitude() - 33.2382).abs() < 1e-9);
        assert!((single.longitude() - 131.6126).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_across_antimeridian() {
        let members = [c(0.0, 179.95), c(0.0, -179.95), c(0.0, 179.9)];
        let mid = centroid(&members).unwrap();

        assert!(mid.longitude().abs() > 179.9, "centroid at {}", mid.longitude());
        for member in &members {
            assert!(distance_km(member, &mid) < 15.0);
        }
    }
}
