/// Unit of motion/extrusion/temperature data flowing through the pipeline.
///
/// Every field is optional; a point only carries the axes and volumes the
/// descriptor named. `e1`/`e2` and `time` are derived by the pipeline stages.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Point {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub e: Option<f64>,
    pub e1: Option<f64>,
    pub e2: Option<f64>,
    pub t: Option<f64>,
    pub f: Option<f64>,
    pub time: Option<f64>,
}

impl Point {
    pub fn new() -> Self {
        Point::default()
    }

    /// Pure motion point, as synthesized for "move to waste-water position".
    pub fn move_point(x: f64, y: f64, z: f64, f: f64) -> Self {
        Point {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            f: Some(f),
            ..Point::default()
        }
    }

    pub fn extrusion(e: f64, time: f64) -> Self {
        Point {
            e: Some(e),
            time: Some(time),
            ..Point::default()
        }
    }

    pub fn has_motion(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some()
    }

    pub fn has_extrusion(&self) -> bool {
        self.e1.is_some() || self.e2.is_some()
    }
}
