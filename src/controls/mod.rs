pub use action::{ControlAction, TargetAttribute};
pub use conditional_control::{ConditionalControl, MonitoredSource};
pub use control_enum::ControlEnum;
pub use control_trait::{Control, ControlContext};
pub use time_control::{TimeControl, TimeFlag};

//List all the submodules here
pub mod action;
pub mod conditional_control;
pub mod control_enum;
pub mod control_trait;
pub mod time_control;

/// Comparison operation used by conditional controls and attribute
/// queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl Comparison {
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Greater => value > threshold,
            Comparison::GreaterEqual => value >= threshold,
            Comparison::Less => value < threshold,
            Comparison::LessEqual => value <= threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Greater => "ABOVE",
            Comparison::GreaterEqual => "ABOVE_EQ",
            Comparison::Less => "BELOW",
            Comparison::LessEqual => "BELOW_EQ",
        }
    }

    pub fn from_str(s: &str) -> Option<Comparison> {
        match s.to_ascii_uppercase().as_str() {
            "ABOVE" => Some(Comparison::Greater),
            "ABOVE_EQ" => Some(Comparison::GreaterEqual),
            "BELOW" => Some(Comparison::Less),
            "BELOW_EQ" => Some(Comparison::LessEqual),
            _ => None,
        }
    }
}
