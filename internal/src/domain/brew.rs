use crate::domain::point::Point;

/// One queued unit of work: the ordered steps of a single brew.
#[derive(Debug, Clone, PartialEq)]
pub struct BrewRequest {
    pub steps: Vec<BrewStep>,
}

impl BrewRequest {
    pub fn new(steps: Vec<BrewStep>) -> Self {
        BrewRequest { steps }
    }
}

/// Closed set of brew commands; each variant maps to exactly one executable
/// step in the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum BrewStep {
    Wait { seconds: u64 },
    Calibration,
    WasteWater,
    Mix { target_temperature: f64 },
    Home,
    Points(Vec<Point>),
}

impl BrewStep {
    pub fn name(&self) -> &'static str {
        match self {
            BrewStep::Wait { .. } => "wait",
            BrewStep::Calibration => "calibration",
            BrewStep::WasteWater => "waste_water",
            BrewStep::Mix { .. } => "mix",
            BrewStep::Home => "home",
            BrewStep::Points(_) => "points",
        }
    }
}
