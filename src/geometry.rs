#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Point2d {
    pub x_coord: f64,
    pub y_coord: f64,
}

impl Point2d {
    pub fn new(x_coord: f64, y_coord: f64) -> Point2d {
        Point2d{x_coord, y_coord}
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.x_coord, self.y_coord]
    }

    pub fn minus(&self, other: &Point2d) -> Point2d {
        Point2d::new(self.x_coord - other.x_coord, self.y_coord - other.y_coord)
    }

    pub fn euclidean_distance(&self, other: &Point2d) -> f64 {
        let diff = self.minus(other);
        (diff.x_coord.powi(2) + diff.y_coord.powi(2)).sqrt()
    }

    /// Angle of the vector from `origin` to this point, in radians in [0, 2pi).
    pub fn angle_from(&self, origin: &Point2d) -> f64 {
        let diff = self.minus(origin);
        let angle = diff.y_coord.atan2(diff.x_coord);
        if angle < 0. {
            return angle + 2. * std::f64::consts::PI;
        }
        return angle;
    }
}


/// Returns the centre of the axis-aligned bounding box of the points, or None if there are none.
pub fn bounding_box_centre<'a, II>(points: II) -> Option<Point2d>
    where II: IntoIterator<Item = &'a Point2d>
{
    let mut bounds: Option<(Point2d, Point2d)> = None;
    for point in points {
        bounds = match bounds {
            None => Some((*point, *point)),
            Some((low, high)) => Some((
                Point2d::new(low.x_coord.min(point.x_coord), low.y_coord.min(point.y_coord)),
                Point2d::new(high.x_coord.max(point.x_coord), high.y_coord.max(point.y_coord)),
            )),
        };
    }
    bounds.map(|(low, high)| Point2d::new((low.x_coord + high.x_coord) / 2.,
                                          (low.y_coord + high.y_coord) / 2.))
}
