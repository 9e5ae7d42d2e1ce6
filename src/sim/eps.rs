use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nalgebra::DVector;

use crate::controls::{Control, ControlContext, ControlEnum};
use crate::network::{DemandModel, LinkEnum, LinkStatus, NodeEnum, WaterNetwork};
use crate::sim::results::{EventKind, ResultsStore};
use crate::solver::assembly::wagner;
use crate::solver::newton::{solve_damped, NewtonSolution};
use crate::solver::{Assembler, NewtonConfig, StateLayout, StepInputs};

/// Crossings closer than this to the end of a step fire in place
/// rather than rewinding the step.
const BACKTRACK_TOLERANCE_SEC: f64 = 1e-2;
/// Fixed-point limit on control firings within one hydraulic step.
const MAX_CONTROL_PASSES: usize = 10;
/// Re-solve limit for check-valve status flips within one solve.
const MAX_CV_PASSES: usize = 10;
/// Flow/head tolerance for check-valve state switching.
const CV_TOLERANCE: f64 = 1e-8;
/// Slack on tank level bounds before clamping kicks in.
const LEVEL_TOLERANCE: f64 = 1e-9;

/*
==========
EPS DRIVER
==========

The outer time loop: quasi-steady hydraulic solutions at each hydraulic
timestep, stitched together by explicit-Euler tank level integration.
Per step:

    refresh demands and reservoir heads (pattern lookups)
    fire due time controls
    solve the hydraulics (re-solving on check-valve flips)
    ask conditional controls; rewind to the interpolated crossing time
        and re-solve when one reports a backtrack
    clamp tank levels, advance tank heads (converged steps only)
    append a row to the results store

The solver sees the network as an immutable snapshot; controls get the
mutable reference, and only between solver calls.
 */
pub struct EpsSimulator {
    pub network: WaterNetwork,
    pub newton_config: NewtonConfig,
    controls: Vec<ControlEnum>,
    cancel_flag: Option<Arc<AtomicBool>>,
    quiet: bool,
}

impl EpsSimulator {
    pub fn new(network: WaterNetwork) -> EpsSimulator {
        EpsSimulator {
            network,
            newton_config: NewtonConfig::default(),
            controls: vec![],
            cancel_flag: None,
            quiet: false,
        }
    }

    /// Install a flag that, when set, stops the run at the next step
    /// boundary. The partial results store is returned intact.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel_flag = Some(flag);
    }

    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    pub fn run(&mut self) -> Result<ResultsStore, String> {
        self.network.validate()?;
        self.network.reset_initial_status();

        let options = self.network.options.clone();
        let start_clock = options.start_clocktime_sec as f64;

        // Controls operate on a run-scoped working copy so a finished
        // run leaves the network's configured controls untouched.
        self.controls = self.network.controls.clone();
        for control in &mut self.controls {
            control.arm(start_clock);
        }

        let assembler = Assembler::new(&self.network)?;
        let layout = assembler.layout;
        let n_timesteps = options.num_timesteps();
        let dt_sec = options.hydraulic_step_sec as f64;

        // Boundary-value schedules for the whole horizon
        let mut demand_schedule = Vec::with_capacity(n_timesteps);
        let mut reservoir_schedule = Vec::with_capacity(n_timesteps);
        for step in 0..n_timesteps {
            let t_sec = step as u64 * options.hydraulic_step_sec;
            let mut demands = vec![0.0; layout.num_nodes];
            for (node_id, junction) in self.network.junctions() {
                demands[node_id] = self.network.junction_demand(junction, t_sec);
            }
            let mut heads = Vec::with_capacity(layout.num_reservoirs);
            for (_, reservoir) in self.network.reservoirs() {
                heads.push(self.network.reservoir_head(reservoir, t_sec));
            }
            demand_schedule.push(demands);
            reservoir_schedule.push(heads);
        }

        let mut results = ResultsStore::new(&self.network);
        let mut x = layout.initial_state(&self.network);
        let mut last_tank_head: Vec<f64> = self
            .network
            .tank_node_ids()
            .iter()
            .filter_map(|&node_id| self.network.nodes[node_id].as_tank())
            .map(|tank| tank.elevation + tank.init_level)
            .collect();
        let mut cv_closed = vec![false; layout.num_links];

        for step in 0..n_timesteps {
            if let Some(flag) = &self.cancel_flag {
                if flag.load(Ordering::Relaxed) {
                    if !self.quiet {
                        println!("Simulation cancelled at step {}; returning partial results", step);
                    }
                    break;
                }
            }

            let t_sec = step as u64 * options.hydraulic_step_sec;
            let t_now = t_sec as f64;
            let t_prev = if step == 0 { t_now } else { t_now - dt_sec };
            let first_timestep = step == 0;
            if !self.quiet {
                println!("Running hydraulic step at t = {} s ...", t_sec);
            }

            self.fire_due_time_controls(t_now, start_clock, &x, &layout);

            let (x_step, converged, oscillated) = self.advance_step(
                &assembler,
                &layout,
                &x,
                &last_tank_head,
                &demand_schedule[step],
                &reservoir_schedule[step],
                first_timestep,
                t_prev,
                t_now,
                start_clock,
                &mut cv_closed,
            );
            x = x_step;

            if oscillated {
                results.record_event(
                    t_sec,
                    EventKind::ControlOscillation,
                    "Controls kept firing after the per-step limit; state accepted as-is",
                );
                if !self.quiet {
                    eprintln!("Warning: control oscillation at t = {} s", t_sec);
                }
            }
            if !converged {
                results.record_event(
                    t_sec,
                    EventKind::StepNotConverged,
                    "Hydraulic solve did not converge; best-effort state recorded",
                );
                if !self.quiet {
                    eprintln!("Warning: hydraulic solve did not converge at t = {} s", t_sec);
                }
            }

            self.finish_tanks(&layout, &mut x, &mut last_tank_head, t_sec, converged, &mut results);

            {
                let ctx = control_context(&self.network, &layout, &x, t_now, start_clock);
                for control in &mut self.controls {
                    control.inform_successful_step(&ctx);
                }
            }

            record_step(
                &self.network,
                &layout,
                &x,
                &demand_schedule[step],
                t_sec,
                converged,
                &mut results,
            );
        }

        Ok(results)
    }

    /*
    Fire every time control whose trigger has been reached. Firing can
    re-arm a daily control, so the scan repeats until nothing is due.
     */
    fn fire_due_time_controls(
        &mut self,
        t_now: f64,
        start_clock: f64,
        x: &DVector<f64>,
        layout: &StateLayout,
    ) {
        loop {
            let mut due: Vec<(usize, i32)> = vec![];
            {
                let ctx = control_context(&self.network, layout, x, t_now, start_clock);
                for (i, control) in self.controls.iter().enumerate() {
                    if !control.is_time_control() {
                        continue;
                    }
                    let (required, _) = control.is_action_required(&ctx);
                    if required {
                        due.push((i, control.priority()));
                    }
                }
            }
            if due.is_empty() {
                break;
            }
            // Ascending priority: the highest-priority action fires
            // last and therefore wins any conflict
            due.sort_by(|a, b| a.1.cmp(&b.1));
            for (i, _) in due {
                self.controls[i].fire(&mut self.network);
            }
        }
    }

    /*
    Solve one hydraulic step, honouring conditional-control crossings.
    When a control reports a crossing inside the step, the step is
    discarded, re-solved up to the interpolated crossing time, the
    control fires there, and the remainder of the step is solved again.
    The smallest reported backtrack wins each pass; the whole dance is
    bounded to prevent oscillation.
     */
    #[allow(clippy::too_many_arguments)]
    fn advance_step(
        &mut self,
        assembler: &Assembler,
        layout: &StateLayout,
        x_checkpoint: &DVector<f64>,
        last_tank_head: &[f64],
        demands: &[f64],
        reservoir_heads: &[f64],
        first_timestep: bool,
        t_prev: f64,
        t_now: f64,
        start_clock: f64,
        cv_closed: &mut Vec<bool>,
    ) -> (DVector<f64>, bool, bool) {
        let mut seg_start = t_prev;
        let mut seg_tank_head = last_tank_head.to_vec();
        let mut warm = x_checkpoint.clone();
        let mut passes = 0;

        loop {
            let dt_seg = (t_now - seg_start).max(0.0);
            let sol = solve_hydraulics(
                &self.network,
                assembler,
                &self.newton_config,
                warm.clone(),
                demands,
                reservoir_heads,
                &seg_tank_head,
                dt_seg,
                first_timestep,
                cv_closed,
            );

            let mut pending: Vec<(usize, f64, i32)> = vec![];
            {
                let ctx = control_context(&self.network, layout, &sol.x, t_now, start_clock);
                for (i, control) in self.controls.iter().enumerate() {
                    let (required, backtrack) = control.is_action_required(&ctx);
                    if required {
                        pending.push((i, backtrack, control.priority()));
                    }
                }
            }

            if pending.is_empty() {
                return (sol.x, sol.converged, false);
            }
            if passes >= MAX_CONTROL_PASSES {
                return (sol.x, sol.converged, true);
            }
            passes += 1;

            let min_backtrack = pending
                .iter()
                .fold(f64::INFINITY, |acc, &(_, bt, _)| acc.min(bt));

            if min_backtrack <= BACKTRACK_TOLERANCE_SEC {
                // Crossing is at (or effectively at) the end of the
                // step: fire in place and re-solve the same segment.
                let mut due: Vec<(usize, i32)> = pending
                    .iter()
                    .filter(|&&(_, bt, _)| bt <= BACKTRACK_TOLERANCE_SEC)
                    .map(|&(i, _, priority)| (i, priority))
                    .collect();
                due.sort_by(|a, b| a.1.cmp(&b.1));
                for (i, _) in due {
                    self.controls[i].fire(&mut self.network);
                }
                warm = sol.x;
                continue;
            }

            // Rewind: re-solve the shorter sub-step ending at the
            // crossing, fire there, then resume toward t_now.
            let t_cross = (t_now - min_backtrack).max(seg_start);
            let dt_cross = t_cross - seg_start;
            let sol_cross = solve_hydraulics(
                &self.network,
                assembler,
                &self.newton_config,
                warm.clone(),
                demands,
                reservoir_heads,
                &seg_tank_head,
                dt_cross,
                first_timestep,
                cv_closed,
            );

            let mut winners: Vec<(usize, i32)> = pending
                .iter()
                .filter(|&&(_, bt, _)| (bt - min_backtrack).abs() <= BACKTRACK_TOLERANCE_SEC)
                .map(|&(i, _, priority)| (i, priority))
                .collect();
            winners.sort_by(|a, b| a.1.cmp(&b.1));
            for (i, _) in winners {
                self.controls[i].fire(&mut self.network);
            }

            // Tank heads advance to the crossing state only when the
            // sub-step solve actually converged
            if sol_cross.converged {
                for (tank_idx, &node_id) in self.network.tank_node_ids().iter().enumerate() {
                    seg_tank_head[tank_idx] = sol_cross.x[layout.head(node_id)];
                }
            }
            {
                let ctx = control_context(&self.network, layout, &sol_cross.x, t_cross, start_clock);
                for control in &mut self.controls {
                    control.inform_successful_step(&ctx);
                }
            }
            warm = sol_cross.x;
            seg_start = t_cross;
        }
    }

    /*
    Clamp tank levels to their bounds (zeroing the inflow on a clamp),
    sync the runtime level on the tank objects, and advance the
    last-step tank heads when the step converged.
     */
    fn finish_tanks(
        &mut self,
        layout: &StateLayout,
        x: &mut DVector<f64>,
        last_tank_head: &mut [f64],
        t_sec: u64,
        converged: bool,
        results: &mut ResultsStore,
    ) {
        let tank_node_ids = self.network.tank_node_ids().to_vec();
        for (tank_idx, &node_id) in tank_node_ids.iter().enumerate() {
            let (name, elevation, min_level, max_level) =
                match self.network.nodes[node_id].as_tank() {
                    Some(tank) => (
                        tank.name.clone(),
                        tank.elevation,
                        tank.min_level,
                        tank.max_level,
                    ),
                    None => continue,
                };
            let mut level = x[layout.head(node_id)] - elevation;
            if level > max_level + LEVEL_TOLERANCE {
                level = max_level;
                x[layout.head(node_id)] = elevation + max_level;
                x[layout.tank_inflow(tank_idx)] = 0.0;
                results.record_event(
                    t_sec,
                    EventKind::TankBoundReached,
                    &format!("Tank '{}' reached its maximum level", name),
                );
            } else if level < min_level - LEVEL_TOLERANCE {
                level = min_level;
                x[layout.head(node_id)] = elevation + min_level;
                x[layout.tank_inflow(tank_idx)] = 0.0;
                results.record_event(
                    t_sec,
                    EventKind::TankBoundReached,
                    &format!("Tank '{}' reached its minimum level", name),
                );
            }
            if converged {
                last_tank_head[tank_idx] = x[layout.head(node_id)];
            }
            if let Some(tank) = self.network.nodes[node_id].as_tank_mut() {
                tank.level = level;
            }
        }
    }
}

/// Read-only control view over the current solution.
fn control_context<'a>(
    network: &'a WaterNetwork,
    layout: &StateLayout,
    x: &'a DVector<f64>,
    sim_time_sec: f64,
    start_clock: f64,
) -> ControlContext<'a> {
    let xs = x.as_slice();
    ControlContext {
        sim_time_sec,
        shifted_time_sec: sim_time_sec + start_clock,
        network,
        heads: &xs[layout.head(0)..layout.head(0) + layout.num_nodes],
        flows: &xs[0..layout.num_links],
    }
}

/// Closed mask for the current network state: explicitly closed links,
/// pumps in outage, and check valves held shut by reverse flow.
fn effective_closed(network: &WaterNetwork, cv_closed: &[bool]) -> Vec<bool> {
    network
        .links
        .iter()
        .enumerate()
        .map(|(link_id, link)| match link {
            LinkEnum::Pump(pump) => pump.status == LinkStatus::Closed || pump.outage,
            _ => {
                link.status() == LinkStatus::Closed
                    || (link.status() == LinkStatus::CheckValve && cv_closed[link_id])
            }
        })
        .collect()
}

/*
One hydraulic solve, iterating on check-valve status: a CV pipe that
came back with reverse flow is closed and the system re-solved; a CV
pipe held shut reopens once the head gradient across it turns
favourable.
 */
#[allow(clippy::too_many_arguments)]
fn solve_hydraulics(
    network: &WaterNetwork,
    assembler: &Assembler,
    config: &NewtonConfig,
    x0: DVector<f64>,
    demands: &[f64],
    reservoir_heads: &[f64],
    last_tank_head: &[f64],
    dt_sec: f64,
    first_timestep: bool,
    cv_closed: &mut Vec<bool>,
) -> NewtonSolution {
    let layout = assembler.layout;
    let mut pass = 0;
    loop {
        let closed = effective_closed(network, cv_closed);
        let inputs = StepInputs {
            demands,
            reservoir_heads,
            last_tank_head,
            dt_sec,
            first_timestep,
            closed: &closed,
        };
        let mut sol = solve_damped(x0.clone(), config, |x| assembler.assemble(network, x, &inputs));

        // Closed links carry exactly zero flow and loss; snap away the
        // linear-solve roundoff so downstream consumers can rely on it
        for (link_id, &is_closed) in closed.iter().enumerate() {
            if is_closed {
                sol.x[layout.flow(link_id)] = 0.0;
                sol.x[layout.headloss(link_id)] = 0.0;
            }
        }

        let mut changed = false;
        for (link_id, pipe) in network.pipes() {
            if pipe.status != LinkStatus::CheckValve {
                continue;
            }
            if !cv_closed[link_id] {
                if sol.x[layout.flow(link_id)] < -CV_TOLERANCE {
                    cv_closed[link_id] = true;
                    changed = true;
                }
            } else {
                let gradient =
                    sol.x[layout.head(pipe.start_node)] - sol.x[layout.head(pipe.end_node)];
                if gradient > CV_TOLERANCE {
                    cv_closed[link_id] = false;
                    changed = true;
                }
            }
        }

        pass += 1;
        if !changed || pass >= MAX_CV_PASSES {
            return sol;
        }
    }
}

/*
Append one results row from the accepted solution. Junction demand is
the delivered demand (identical to the requested demand except in
pressure-driven mode); tank and reservoir "demand" are the solved tank
inflow and reservoir supply variables.
 */
fn record_step(
    network: &WaterNetwork,
    layout: &StateLayout,
    x: &DVector<f64>,
    demands: &[f64],
    t_sec: u64,
    converged: bool,
    results: &mut ResultsStore,
) {
    let mut demand = vec![0.0; layout.num_nodes];
    let mut head = vec![0.0; layout.num_nodes];
    let mut pressure = vec![0.0; layout.num_nodes];

    let mut tank_idx = 0;
    let mut reservoir_idx = 0;
    for (node_id, node) in network.nodes.iter().enumerate() {
        let h = x[layout.head(node_id)];
        head[node_id] = h;
        pressure[node_id] = node.pressure(h);
        match node {
            NodeEnum::Junction(junction) => {
                demand[node_id] = match network.options.demand_model {
                    DemandModel::DemandDriven => demands[node_id],
                    DemandModel::PressureDriven => {
                        let p = h - junction.elevation;
                        let (fraction, _) =
                            wagner(p, junction.minimum_pressure, junction.nominal_pressure);
                        demands[node_id] * fraction
                    }
                };
            }
            NodeEnum::Tank(_) => {
                demand[node_id] = x[layout.tank_inflow(tank_idx)];
                tank_idx += 1;
            }
            NodeEnum::Reservoir(_) => {
                demand[node_id] = x[layout.reservoir_demand(reservoir_idx)];
                reservoir_idx += 1;
            }
        }
    }

    let mut flowrate = vec![0.0; layout.num_links];
    let mut velocity = vec![0.0; layout.num_links];
    for (link_id, link) in network.links.iter().enumerate() {
        let q = x[layout.flow(link_id)];
        flowrate[link_id] = q;
        velocity[link_id] = match link {
            LinkEnum::Pipe(pipe) => {
                4.0 * q.abs() / (std::f64::consts::PI * pipe.diameter * pipe.diameter)
            }
            _ => 0.0,
        };
    }

    results.push_step(t_sec, &demand, &head, &pressure, &flowrate, &velocity, converged);
}
