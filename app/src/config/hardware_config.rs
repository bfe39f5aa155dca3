use serde::Deserialize;

/// Flat hardware descriptor as written in `config.toml`. Which fields are
/// required depends on `kind`; the wiring pass validates them.
#[derive(Deserialize, Debug, Clone)]
pub struct HardwareEntry {
    pub name: String,
    pub kind: String,
    /// Name of the hardware this entry depends on (smoothie/extruder → uart).
    pub dev: Option<String>,
    pub path: Option<String>,
    pub baud: Option<u32>,
    pub kp: Option<f64>,
    pub ki: Option<f64>,
    pub kd: Option<f64>,
}
