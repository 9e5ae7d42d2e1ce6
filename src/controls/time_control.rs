use crate::controls::action::{ControlAction, TargetAttribute};
use crate::controls::control_trait::{Control, ControlContext};
use crate::network::WaterNetwork;

pub const SECONDS_PER_DAY: f64 = 86400.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeFlag {
    /// Trigger time is seconds since the start of the simulation.
    SimTime,
    /// Trigger time is seconds since 12:00 AM on day 0; may exceed one
    /// day.
    ShiftedTime,
}

/*
Fires an action once (or daily) when the simulated time reaches the
trigger time.
 */
#[derive(Clone, Debug)]
pub struct TimeControl {
    pub trigger_sec: f64,
    pub time_flag: TimeFlag,
    pub daily: bool,
    pub action: ControlAction,
    pub priority: i32,
    complete: bool,
}

impl TimeControl {
    pub fn new(
        trigger_sec: f64,
        time_flag: TimeFlag,
        daily: bool,
        action: ControlAction,
    ) -> TimeControl {
        TimeControl {
            trigger_sec,
            time_flag,
            daily,
            action,
            priority: 0,
            complete: false,
        }
    }

    pub fn with_target(
        trigger_sec: f64,
        time_flag: TimeFlag,
        daily: bool,
        link_id: usize,
        attribute: TargetAttribute,
    ) -> TimeControl {
        TimeControl::new(trigger_sec, time_flag, daily, ControlAction::new(link_id, attribute))
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Re-arm at the start of a run. A shifted-time trigger that is
    /// already in the past at the simulation start clock is promoted by
    /// one day.
    pub fn arm(&mut self, start_clocktime_sec: f64) {
        self.complete = false;
        if self.time_flag == TimeFlag::ShiftedTime && self.trigger_sec < start_clocktime_sec {
            self.trigger_sec += SECONDS_PER_DAY;
        }
    }
}

impl Control for TimeControl {
    fn is_action_required(&self, ctx: &ControlContext) -> (bool, f64) {
        if self.complete {
            return (false, 0.0);
        }
        let now = match self.time_flag {
            TimeFlag::SimTime => ctx.sim_time_sec,
            TimeFlag::ShiftedTime => ctx.shifted_time_sec,
        };
        if self.trigger_sec <= now {
            (true, now - self.trigger_sec)
        } else {
            (false, 0.0)
        }
    }

    fn fire(&mut self, network: &mut WaterNetwork) {
        self.action.apply(network);
        if self.daily {
            self.trigger_sec += SECONDS_PER_DAY;
        } else {
            self.complete = true;
        }
    }

    fn inform_successful_step(&mut self, _ctx: &ControlContext) {
        // Time controls keep no history
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
