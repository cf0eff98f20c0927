use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in projected coordinates, `[minX, minY, maxX, maxY]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min: Point,
    pub max: Point,
}

impl Extent {
    /// Creates a new extent from two corner points
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Creates an extent from individual coordinates
    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    /// Creates an extent from a center point and size
    pub fn from_center_and_size(center: Point, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        Self::from_coords(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    /// Smallest extent enclosing all of `points`, or `None` for an empty slice
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut extent = Extent::new(*first, *first);
        for point in rest {
            extent.extend(point);
        }
        Some(extent)
    }

    /// Gets the width of the extent
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Gets the height of the extent
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Gets the center point of the extent
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Checks if the extent contains a point (edges inclusive)
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Checks if `other` lies entirely inside this extent, all four bounds inclusive
    pub fn contains_extent(&self, other: &Extent) -> bool {
        self.min.x <= other.min.x
            && other.max.x <= self.max.x
            && self.min.y <= other.min.y
            && other.max.y <= self.max.y
    }

    /// Checks if the extent intersects with another extent
    pub fn intersects(&self, other: &Extent) -> bool {
        !(other.max.x < self.min.x
            || other.min.x > self.max.x
            || other.max.y < self.min.y
            || other.min.y > self.max.y)
    }

    /// Extends the extent to include a point
    pub fn extend(&mut self, point: &Point) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// Returns a new extent with every bound pushed outwards by `margin`
    pub fn padded(&self, margin: f64) -> Extent {
        Extent::from_coords(
            self.min.x - margin,
            self.min.y - margin,
            self.max.x + margin,
            self.max.y + margin,
        )
    }

    /// Checks if the extent is valid (min <= max)
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Gets the four corner points of the extent
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,                           // bottom-left
            Point::new(self.max.x, self.min.y), // bottom-right
            self.max,                           // top-right
            Point::new(self.min.x, self.max.y), // top-left
        ]
    }

    /// `[minX, minY, maxX, maxY]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }
}

impl From<[f64; 4]> for Extent {
    fn from(bounds: [f64; 4]) -> Self {
        Extent::from_coords(bounds[0], bounds[1], bounds[2], bounds[3])
    }
}
