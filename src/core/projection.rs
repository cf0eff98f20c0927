//! Coordinate reference systems used by the finder.
//!
//! The display side of the map works in spherical Web Mercator, while the detail
//! dataset is published in New York State Plane Long Island (US survey feet). Every
//! transform pivots through geographic coordinates.

use crate::core::{
    extent::Extent,
    geo::{LatLng, Point},
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// US survey feet per metre
const US_FEET_PER_METRE: f64 = 3937.0 / 1200.0;

/// Supported coordinate reference systems
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Projection {
    /// Spherical Web Mercator, metres
    #[default]
    #[serde(rename = "EPSG:3857")]
    WebMercator,
    /// Plain longitude/latitude in degrees (x = lng, y = lat)
    #[serde(rename = "EPSG:4326")]
    Geographic,
    /// NAD83 / New York Long Island, US survey feet
    #[serde(rename = "EPSG:2263")]
    NewYorkLongIsland,
}

impl Projection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::WebMercator => "EPSG:3857",
            Self::Geographic => "EPSG:4326",
            Self::NewYorkLongIsland => "EPSG:2263",
        }
    }

    /// Unprojects a point of this projection to geographic coordinates
    pub fn to_lat_lng(&self, point: Point) -> Result<LatLng> {
        let lat_lng = match self {
            Self::WebMercator => LatLng::from_mercator(point),
            Self::Geographic => LatLng::new(point.y, point.x),
            Self::NewYorkLongIsland => LambertConformalConic::NY_LONG_ISLAND.inverse(point),
        };
        if !lat_lng.lat.is_finite() || !lat_lng.lng.is_finite() {
            return Err(MapError::Projection(format!(
                "cannot unproject ({}, {}) from {}",
                point.x,
                point.y,
                self.code()
            )));
        }
        Ok(lat_lng)
    }

    /// Projects geographic coordinates into this projection
    pub fn from_lat_lng(&self, lat_lng: LatLng) -> Result<Point> {
        if !lat_lng.is_valid() {
            return Err(MapError::Projection(format!(
                "coordinate ({}, {}) is outside the geographic domain",
                lat_lng.lat, lat_lng.lng
            )));
        }
        let point = match self {
            Self::WebMercator => LatLng::new(LatLng::clamp_lat(lat_lng.lat), lat_lng.lng).to_mercator(),
            Self::Geographic => Point::new(lat_lng.lng, lat_lng.lat),
            Self::NewYorkLongIsland => LambertConformalConic::NY_LONG_ISLAND.forward(lat_lng),
        };
        if !point.is_finite() {
            return Err(MapError::Projection(format!(
                "cannot project ({}, {}) into {}",
                lat_lng.lat,
                lat_lng.lng,
                self.code()
            )));
        }
        Ok(point)
    }

    /// Transforms a point from `self` into `target`
    pub fn transform_point(&self, target: Projection, point: Point) -> Result<Point> {
        if *self == target {
            return Ok(point);
        }
        target.from_lat_lng(self.to_lat_lng(point)?)
    }

    /// Transforms a rectangle from `self` into `target`.
    ///
    /// The four corners are transformed and their envelope is returned, which is what
    /// transforming the rectangle as a polygon and taking its extent yields.
    pub fn transform_extent(&self, target: Projection, extent: &Extent) -> Result<Extent> {
        if *self == target {
            return Ok(*extent);
        }
        let mut corners = Vec::with_capacity(4);
        for corner in extent.corners() {
            corners.push(self.transform_point(target, corner)?);
        }
        Extent::enclosing(&corners)
            .ok_or_else(|| MapError::Projection("empty corner set".to_string()))
    }
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Ellipsoidal Lambert Conformal Conic with two standard parallels
#[derive(Debug, Clone, Copy)]
struct LambertConformalConic {
    semi_major: f64,
    inverse_flattening: f64,
    standard_parallel_1: f64,
    standard_parallel_2: f64,
    latitude_of_origin: f64,
    central_meridian: f64,
    false_easting: f64,
    false_northing: f64,
    units_per_metre: f64,
}

/// Derived cone constants
struct Cone {
    e: f64,
    n: f64,
    af: f64,
    rho0: f64,
}

impl LambertConformalConic {
    /// EPSG:2263 on GRS80
    const NY_LONG_ISLAND: Self = Self {
        semi_major: 6378137.0,
        inverse_flattening: 298.257222101,
        standard_parallel_1: 41.0 + 2.0 / 60.0,
        standard_parallel_2: 40.0 + 40.0 / 60.0,
        latitude_of_origin: 40.0 + 10.0 / 60.0,
        central_meridian: -74.0,
        false_easting: 300000.0,
        false_northing: 0.0,
        units_per_metre: US_FEET_PER_METRE,
    };

    fn cone(&self) -> Cone {
        let f = 1.0 / self.inverse_flattening;
        let e = (2.0 * f - f * f).sqrt();
        let phi1 = self.standard_parallel_1.to_radians();
        let phi2 = self.standard_parallel_2.to_radians();
        let m1 = Self::m(e, phi1);
        let m2 = Self::m(e, phi2);
        let t1 = Self::t(e, phi1);
        let t2 = Self::t(e, phi2);
        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let af = self.semi_major * m1 / (n * t1.powf(n));
        let rho0 = af * Self::t(e, self.latitude_of_origin.to_radians()).powf(n);
        Cone { e, n, af, rho0 }
    }

    fn m(e: f64, phi: f64) -> f64 {
        phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
    }

    fn t(e: f64, phi: f64) -> f64 {
        let es = e * phi.sin();
        (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
    }

    fn forward(&self, lat_lng: LatLng) -> Point {
        let cone = self.cone();
        let rho = cone.af * Self::t(cone.e, lat_lng.lat.to_radians()).powf(cone.n);
        let theta = cone.n * (lat_lng.lng - self.central_meridian).to_radians();
        let x = self.false_easting + rho * theta.sin();
        let y = self.false_northing + cone.rho0 - rho * theta.cos();
        Point::new(x * self.units_per_metre, y * self.units_per_metre)
    }

    fn inverse(&self, point: Point) -> LatLng {
        let cone = self.cone();
        let x = point.x / self.units_per_metre - self.false_easting;
        let y = cone.rho0 - (point.y / self.units_per_metre - self.false_northing);
        let rho = cone.n.signum() * x.hypot(y);
        let theta = (cone.n.signum() * x).atan2(cone.n.signum() * y);
        let t = (rho / cone.af).powf(1.0 / cone.n);
        let lng = theta / cone.n + self.central_meridian.to_radians();

        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..15 {
            let es = cone.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(cone.e / 2.0)).atan();
            let converged = (next - phi).abs() < 1e-12;
            phi = next;
            if converged {
                break;
            }
        }
        LatLng::new(phi.to_degrees(), lng.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_plane_forward_matches_published_coordinates() {
        // Poletop in Brooklyn published with x_coord 989062, y_coord 160733
        let point = Projection::NewYorkLongIsland
            .from_lat_lng(LatLng::new(40.60785, -73.98267))
            .unwrap();
        assert!((point.x - 989062.0).abs() < 1.0);
        assert!((point.y - 160733.0).abs() < 1.0);
    }

    #[test]
    fn test_state_plane_round_trip() {
        let original = LatLng::new(40.75, -73.9);
        let projected = Projection::NewYorkLongIsland.from_lat_lng(original).unwrap();
        let back = Projection::NewYorkLongIsland.to_lat_lng(projected).unwrap();
        assert!((back.lat - original.lat).abs() < 1e-8);
        assert!((back.lng - original.lng).abs() < 1e-8);
    }

    #[test]
    fn test_mercator_to_state_plane() {
        let mercator = Point::new(-8235713.151926797, 4954670.571044415);
        let point = Projection::WebMercator
            .transform_point(Projection::NewYorkLongIsland, mercator)
            .unwrap();
        assert!((point.x - 989062.0).abs() < 1.0);
        assert!((point.y - 160733.0).abs() < 1.0);
    }

    #[test]
    fn test_identity_transform_is_exact() {
        let extent = Extent::from_coords(1.5, 2.5, 3.5, 4.5);
        let same = Projection::WebMercator
            .transform_extent(Projection::WebMercator, &extent)
            .unwrap();
        assert_eq!(same, extent);
    }

    #[test]
    fn test_transform_extent_takes_corner_envelope() {
        let extent = Extent::from_coords(-8240000.0, 4950000.0, -8230000.0, 4960000.0);
        let projected = Projection::WebMercator
            .transform_extent(Projection::NewYorkLongIsland, &extent)
            .unwrap();
        assert!(projected.is_valid());
        for corner in extent.corners() {
            let p = Projection::WebMercator
                .transform_point(Projection::NewYorkLongIsland, corner)
                .unwrap();
            assert!(projected.contains_point(&p));
        }
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let result = Projection::WebMercator
            .transform_point(Projection::NewYorkLongIsland, Point::new(f64::NAN, 0.0));
        assert!(matches!(result, Err(MapError::Projection(_))));
    }

    #[test]
    fn test_projection_serde_codes() {
        let json = serde_json::to_string(&Projection::NewYorkLongIsland).unwrap();
        assert_eq!(json, "\"EPSG:2263\"");
        let parsed: Projection = serde_json::from_str("\"EPSG:3857\"").unwrap();
        assert_eq!(parsed, Projection::WebMercator);
    }
}
