use crate::domain::point::Point;

/// Annotates points with a duration derived from the straight-line distance
/// to the last known position. Feed rate is in units per minute, the
/// resulting time in seconds.
#[derive(Debug)]
pub struct TimeTransformer {
    position: Point,
}

impl Default for TimeTransformer {
    fn default() -> Self {
        TimeTransformer::new(0.0, 0.0, 0.0)
    }
}

impl TimeTransformer {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        TimeTransformer {
            position: Point {
                x: Some(x),
                y: Some(y),
                z: Some(z),
                ..Point::default()
            },
        }
    }

    pub fn transform(&mut self, point: &mut Point) {
        if point.time.is_none() {
            let distance = self.distance_to(point);
            if distance == 0.0 {
                // Convention preserved from the device protocol: with no
                // motion the feed rate field is a literal duration.
                point.time = point.f;
            } else {
                point.time = point.f.map(|f| distance * 60.0 / f);
            }
        }
        self.set_position(point.x, point.y, point.z);
    }

    pub fn set_position(&mut self, x: Option<f64>, y: Option<f64>, z: Option<f64>) {
        if x.is_some() {
            self.position.x = x;
        }
        if y.is_some() {
            self.position.y = y;
        }
        if z.is_some() {
            self.position.z = z;
        }
    }

    pub fn reset(&mut self) {
        self.set_position(Some(0.0), Some(0.0), Some(0.0));
    }

    fn distance_to(&self, point: &Point) -> f64 {
        let mut squared = 0.0;
        if let (Some(x), Some(px)) = (point.x, self.position.x) {
            squared += (x - px).powi(2);
        }
        if let (Some(y), Some(py)) = (point.y, self.position.y) {
            squared += (y - py).powi(2);
        }
        if let (Some(z), Some(pz)) = (point.z, self.position.z) {
            squared += (z - pz).powi(2);
        }
        squared.sqrt()
    }
}
