use dyn_clone::{clone_trait_object, DynClone};

use crate::network::WaterNetwork;

/*
Read-only view of the simulation handed to controls when they are asked
whether they want to fire. Heads and flows are the current hydraulic
solution, indexed by node id and link id.
 */
pub struct ControlContext<'a> {
    pub sim_time_sec: f64,
    /// Seconds since 12:00 AM on day 0 (sim time + start clock offset).
    pub shifted_time_sec: f64,
    pub network: &'a WaterNetwork,
    pub heads: &'a [f64],
    pub flows: &'a [f64],
}

pub trait Control: DynClone {
    /// Does this control want to fire now? The second element is how far
    /// back (in seconds) from the current simulated time the triggering
    /// crossing actually occurred; a value within the solver tolerance
    /// means "fire now, no rewind needed".
    fn is_action_required(&self, ctx: &ControlContext) -> (bool, f64);

    /// Apply the control's action to the network. Only called between
    /// solver iterations.
    fn fire(&mut self, network: &mut WaterNetwork);

    /// Called after every accepted (sub-)step so the control can record
    /// the history it needs for crossing interpolation.
    fn inform_successful_step(&mut self, ctx: &ControlContext);

    /// Tie-break when several controls fire at the same instant: the
    /// higher-priority action prevails.
    fn priority(&self) -> i32;
}

clone_trait_object!(Control);
