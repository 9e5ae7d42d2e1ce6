use crate::controls::action::{ControlAction, TargetAttribute};
use crate::controls::control_trait::{Control, ControlContext};
use crate::controls::Comparison;
use crate::network::WaterNetwork;

/// Hydraulic quantity a conditional control monitors. Tank levels are
/// the common case: tank-feeding pumps are pulsed by a pair of level
/// controls.
#[derive(Clone, Copy, Debug)]
pub enum MonitoredSource {
    /// Water level above the tank bottom at the given node id.
    TankLevel(usize),
    /// Total head at the given node id.
    NodeHead(usize),
    /// Pressure at the given node id.
    NodePressure(usize),
    /// Flow through the given link id.
    LinkFlow(usize),
}

impl MonitoredSource {
    pub fn value(&self, ctx: &ControlContext) -> f64 {
        match self {
            MonitoredSource::TankLevel(node_id) => {
                let elevation = match ctx.network.nodes[*node_id].as_tank() {
                    Some(tank) => tank.elevation,
                    None => 0.0,
                };
                ctx.heads[*node_id] - elevation
            }
            MonitoredSource::NodeHead(node_id) => ctx.heads[*node_id],
            MonitoredSource::NodePressure(node_id) => {
                ctx.network.nodes[*node_id].pressure(ctx.heads[*node_id])
            }
            MonitoredSource::LinkFlow(link_id) => ctx.flows[*link_id],
        }
    }
}

/*
Fires an action when a monitored quantity crosses a threshold. The
crossing time inside the step is estimated by linear interpolation
between the previous accepted value and the current one, and reported
back to the driver as a backtrack.
 */
#[derive(Clone, Debug)]
pub struct ConditionalControl {
    pub source: MonitoredSource,
    pub comparison: Comparison,
    pub threshold: f64,
    pub action: ControlAction,
    pub priority: i32,
    prev_time_sec: Option<f64>,
    prev_value: Option<f64>,
}

impl ConditionalControl {
    pub fn new(
        source: MonitoredSource,
        comparison: Comparison,
        threshold: f64,
        action: ControlAction,
    ) -> ConditionalControl {
        ConditionalControl {
            source,
            comparison,
            threshold,
            action,
            priority: 0,
            prev_time_sec: None,
            prev_value: None,
        }
    }

    pub fn with_target(
        source: MonitoredSource,
        comparison: Comparison,
        threshold: f64,
        link_id: usize,
        attribute: TargetAttribute,
    ) -> ConditionalControl {
        ConditionalControl::new(source, comparison, threshold, ControlAction::new(link_id, attribute))
    }

    /// Clear the crossing-interpolation history at the start of a run.
    pub fn arm(&mut self) {
        self.prev_time_sec = None;
        self.prev_value = None;
    }
}

impl Control for ConditionalControl {
    fn is_action_required(&self, ctx: &ControlContext) -> (bool, f64) {
        let value = self.source.value(ctx);
        if !self.comparison.compare(value, self.threshold) {
            return (false, 0.0);
        }
        // The condition holds but applying the action would change
        // nothing (e.g. the link is already closed): nothing to do.
        // This is what keeps a satisfied condition from re-firing.
        if !self.action.would_change(ctx.network) {
            return (false, 0.0);
        }

        let (prev_t, prev_v) = match (self.prev_time_sec, self.prev_value) {
            (Some(t), Some(v)) => (t, v),
            // No history yet (first timestep): fire now
            _ => return (true, 0.0),
        };
        if self.comparison.compare(prev_v, self.threshold) {
            // Already past the threshold at the last accepted step;
            // there is no crossing inside this step to rewind to.
            return (true, 0.0);
        }
        let dv = value - prev_v;
        if dv.abs() < f64::EPSILON {
            return (true, 0.0);
        }
        // Linear interpolation of the crossing time
        let t_cross = prev_t + (self.threshold - prev_v) * (ctx.sim_time_sec - prev_t) / dv;
        let backtrack = (ctx.sim_time_sec - t_cross).clamp(0.0, ctx.sim_time_sec - prev_t);
        (true, backtrack)
    }

    fn fire(&mut self, network: &mut WaterNetwork) {
        self.action.apply(network);
    }

    fn inform_successful_step(&mut self, ctx: &ControlContext) {
        self.prev_time_sec = Some(ctx.sim_time_sec);
        self.prev_value = Some(self.source.value(ctx));
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
