//! Translation of pipeline points into device line-protocol instructions.
//!
//! A point yields zero, one, or two instructions: a motion code for the
//! motion controller and an extrusion code for the extruder. Devices
//! acknowledge each line with a literal `ok`.

use crate::domain::point::Point;

pub const ACK: &str = "ok";
pub const HOME: &str = "G28";

/// Issued once at controller start: home, millimeter units, absolute
/// positioning, relative extrusion mode.
pub const INIT_SEQUENCE: [&str; 4] = ["G28", "G21", "G90", "M83"];

/// Motion instruction built from the axes and feed rate present on the point.
pub fn motion_code(point: &Point) -> Option<String> {
    if !point.has_motion() {
        return None;
    }
    let mut code = String::from("G1");
    if let Some(x) = point.x {
        code.push_str(&format!(" X{x}"));
    }
    if let Some(y) = point.y {
        code.push_str(&format!(" Y{y}"));
    }
    if let Some(z) = point.z {
        code.push_str(&format!(" Z{z}"));
    }
    if let Some(f) = point.f {
        code.push_str(&format!(" F{f}"));
    }
    Some(code)
}

/// Extrusion instruction built from the split volumes and duration.
pub fn extrusion_code(point: &Point) -> Option<String> {
    if !point.has_extrusion() {
        return None;
    }
    let e1 = point.e1.unwrap_or(0.0);
    let e2 = point.e2.unwrap_or(0.0);
    let time = point.time.unwrap_or(0.0);
    Some(format!("H1 A{e1} B{e2} T{time}"))
}
