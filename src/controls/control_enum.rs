use crate::controls::action::ControlAction;
use crate::controls::conditional_control::ConditionalControl;
use crate::controls::control_trait::{Control, ControlContext};
use crate::controls::time_control::TimeControl;
use crate::network::WaterNetwork;

#[derive(Clone, Debug)]
pub enum ControlEnum {
    Time(TimeControl),
    Conditional(ConditionalControl),
}

impl ControlEnum {
    pub fn is_time_control(&self) -> bool {
        matches!(self, ControlEnum::Time(_))
    }

    pub fn action(&self) -> &ControlAction {
        match self {
            ControlEnum::Time(control) => &control.action,
            ControlEnum::Conditional(control) => &control.action,
        }
    }

    /// Reset run-scoped state (trigger promotion, crossing history) at
    /// the start of a run.
    pub fn arm(&mut self, start_clocktime_sec: f64) {
        match self {
            ControlEnum::Time(control) => control.arm(start_clocktime_sec),
            ControlEnum::Conditional(control) => control.arm(),
        }
    }
}

impl Control for ControlEnum {
    fn is_action_required(&self, ctx: &ControlContext) -> (bool, f64) {
        match self {
            ControlEnum::Time(control) => control.is_action_required(ctx),
            ControlEnum::Conditional(control) => control.is_action_required(ctx),
        }
    }

    fn fire(&mut self, network: &mut WaterNetwork) {
        match self {
            ControlEnum::Time(control) => control.fire(network),
            ControlEnum::Conditional(control) => control.fire(network),
        }
    }

    fn inform_successful_step(&mut self, ctx: &ControlContext) {
        match self {
            ControlEnum::Time(control) => control.inform_successful_step(ctx),
            ControlEnum::Conditional(control) => control.inform_successful_step(ctx),
        }
    }

    fn priority(&self) -> i32 {
        match self {
            ControlEnum::Time(control) => control.priority(),
            ControlEnum::Conditional(control) => control.priority(),
        }
    }
}
