use nalgebra::DVector;
use sprs::TriMat;

use crate::network::{DemandModel, LinkEnum, NetworkError, NodeEnum, WaterNetwork};
use crate::solver::headloss::{pipe_resistance, unit_headloss, unit_headloss_deriv};
use crate::solver::layout::StateLayout;

const GRAVITY: f64 = 9.81;

/*
================================
RESIDUAL / JACOBIAN BLOCK LAYOUT
================================

Columns follow the state vector (see layout.rs). Rows are assembled in
this fixed order, with one shared row counter exactly as the residual
blocks are concatenated:

    node balance             N rows   (node id order)
    link head-loss           L - C rows  (link id order, closed skipped)
    link head-difference     L - C rows  (link id order, closed skipped)
    tank evolution           T rows   (tank order)
    reservoir head fixing    R rows   (reservoir order)
    closed-link flow = 0     C rows   (link id order)
    closed-link headloss = 0 C rows   (link id order)

Total rows = N + 2L + T + R, matching the state length. The two closed-
link blocks are the replacements for the head-loss and head-difference
rows the closed links vacated.
 */

/// Per-step boundary values handed to the assembler. Demands are full
/// (pattern-scaled) junction demands indexed by node id; reservoir
/// heads and last tank heads are indexed in state-vector order.
pub struct StepInputs<'a> {
    pub demands: &'a [f64],
    pub reservoir_heads: &'a [f64],
    pub last_tank_head: &'a [f64],
    pub dt_sec: f64,
    pub first_timestep: bool,
    pub closed: &'a [bool],
}

enum LinkModel {
    Pipe { resistance: f64 },
    Pump { a: f64, b: f64, c: f64 },
    Valve { minor_coeff: f64 },
}

enum NodeKind {
    Junction {
        elevation: f64,
        minimum_pressure: f64,
        nominal_pressure: f64,
    },
    Tank {
        tank_idx: usize,
    },
    Reservoir {
        reservoir_idx: usize,
    },
}

struct TankRow {
    node_id: usize,
    area: f64,
    elevation: f64,
    init_level: f64,
}

/*
Precomputed, immutable view of the network used to evaluate the
hydraulic equations. Built once per run; link status and pump speed are
read live from the network at evaluation time since controls may change
them between solves.
 */
pub struct Assembler {
    pub layout: StateLayout,
    node_links: Vec<Vec<(usize, bool)>>,
    link_models: Vec<LinkModel>,
    node_kinds: Vec<NodeKind>,
    tank_rows: Vec<TankRow>,
    reservoir_nodes: Vec<usize>,
    demand_model: DemandModel,
}

impl Assembler {
    pub fn new(network: &WaterNetwork) -> Result<Assembler, NetworkError> {
        let layout = StateLayout::for_network(network);

        // Incident links per node, with the orientation flag
        let mut node_links: Vec<Vec<(usize, bool)>> = vec![vec![]; network.num_nodes()];
        for (link_id, link) in network.links.iter().enumerate() {
            node_links[link.start_node()].push((link_id, true));
            node_links[link.end_node()].push((link_id, false));
        }

        let mut link_models = Vec::with_capacity(network.num_links());
        for link in &network.links {
            let model = match link {
                LinkEnum::Pipe(pipe) => LinkModel::Pipe {
                    resistance: pipe_resistance(pipe.roughness, pipe.diameter, pipe.length),
                },
                LinkEnum::Pump(pump) => {
                    let (a, b, c) = network.pump_curve_coefficients(pump)?;
                    LinkModel::Pump { a, b, c }
                }
                LinkEnum::Valve(valve) => {
                    let d2 = valve.diameter * valve.diameter;
                    LinkModel::Valve {
                        minor_coeff: 8.0 * valve.minor_loss
                            / (GRAVITY * std::f64::consts::PI * std::f64::consts::PI * d2 * d2),
                    }
                }
            };
            link_models.push(model);
        }

        let mut node_kinds = Vec::with_capacity(network.num_nodes());
        let mut tank_counter = 0;
        let mut reservoir_counter = 0;
        for node in &network.nodes {
            let kind = match node {
                NodeEnum::Junction(junction) => NodeKind::Junction {
                    elevation: junction.elevation,
                    minimum_pressure: junction.minimum_pressure,
                    nominal_pressure: junction.nominal_pressure,
                },
                NodeEnum::Tank(_) => {
                    let kind = NodeKind::Tank {
                        tank_idx: tank_counter,
                    };
                    tank_counter += 1;
                    kind
                }
                NodeEnum::Reservoir(_) => {
                    let kind = NodeKind::Reservoir {
                        reservoir_idx: reservoir_counter,
                    };
                    reservoir_counter += 1;
                    kind
                }
            };
            node_kinds.push(kind);
        }

        let mut tank_rows = Vec::with_capacity(network.num_tanks());
        for &node_id in network.tank_node_ids() {
            if let Some(tank) = network.nodes[node_id].as_tank() {
                tank_rows.push(TankRow {
                    node_id,
                    area: tank.area(),
                    elevation: tank.elevation,
                    init_level: tank.init_level,
                });
            }
        }

        Ok(Assembler {
            layout,
            node_links,
            link_models,
            node_kinds,
            tank_rows,
            reservoir_nodes: network.reservoir_node_ids().to_vec(),
            demand_model: network.options.demand_model,
        })
    }

    /// Evaluate the residual vector and analytic Jacobian at the trial
    /// state x.
    pub fn assemble(
        &self,
        network: &WaterNetwork,
        x: &DVector<f64>,
        inputs: &StepInputs,
    ) -> (DVector<f64>, TriMat<f64>) {
        let layout = &self.layout;
        let n = layout.len();
        let mut residual = DVector::zeros(n);
        let mut jac = TriMat::new((n, n));
        let mut row = 0;

        // Node balance
        for node_id in 0..layout.num_nodes {
            let mut expr = 0.0;
            for &(link_id, node_is_start) in &self.node_links[node_id] {
                if node_is_start {
                    expr -= x[layout.flow(link_id)];
                    jac.add_triplet(row, layout.flow(link_id), -1.0);
                } else {
                    expr += x[layout.flow(link_id)];
                    jac.add_triplet(row, layout.flow(link_id), 1.0);
                }
            }
            match self.node_kinds[node_id] {
                NodeKind::Junction {
                    elevation,
                    minimum_pressure,
                    nominal_pressure,
                } => {
                    let full_demand = inputs.demands[node_id];
                    match self.demand_model {
                        DemandModel::DemandDriven => {
                            residual[row] = expr - full_demand;
                        }
                        DemandModel::PressureDriven => {
                            let pressure = x[layout.head(node_id)] - elevation;
                            let (fraction, d_fraction) =
                                wagner(pressure, minimum_pressure, nominal_pressure);
                            residual[row] = expr - full_demand * fraction;
                            if d_fraction != 0.0 {
                                jac.add_triplet(
                                    row,
                                    layout.head(node_id),
                                    -full_demand * d_fraction,
                                );
                            }
                        }
                    }
                }
                NodeKind::Tank { tank_idx } => {
                    residual[row] = expr - x[layout.tank_inflow(tank_idx)];
                    jac.add_triplet(row, layout.tank_inflow(tank_idx), -1.0);
                }
                NodeKind::Reservoir { reservoir_idx } => {
                    residual[row] = expr - x[layout.reservoir_demand(reservoir_idx)];
                    jac.add_triplet(row, layout.reservoir_demand(reservoir_idx), -1.0);
                }
            }
            row += 1;
        }

        // Link head-loss
        for link_id in 0..layout.num_links {
            if inputs.closed[link_id] {
                continue;
            }
            let q = x[layout.flow(link_id)];
            match self.link_models[link_id] {
                LinkModel::Pipe { resistance } => {
                    residual[row] = resistance * unit_headloss(q) - x[layout.headloss(link_id)];
                    jac.add_triplet(
                        row,
                        layout.flow(link_id),
                        resistance * unit_headloss_deriv(q.abs()),
                    );
                }
                LinkModel::Pump { a, b, c } => {
                    let speed = match network.links[link_id].as_pump() {
                        Some(pump) => pump.speed,
                        None => 1.0,
                    };
                    // Affinity-scaled head gain; head "loss" is its
                    // negation. Reduces to -A + B*|Q|^C at speed 1.
                    let s2 = speed * speed;
                    let sc = speed.powf(2.0 - c);
                    let gain = s2 * a - sc * b * q.abs().powf(c);
                    residual[row] = -gain - x[layout.headloss(link_id)];
                    jac.add_triplet(
                        row,
                        layout.flow(link_id),
                        sc * b * c * q.abs().powf(c - 1.0),
                    );
                }
                LinkModel::Valve { minor_coeff } => {
                    residual[row] = minor_coeff * q * q.abs() - x[layout.headloss(link_id)];
                    jac.add_triplet(row, layout.flow(link_id), 2.0 * minor_coeff * q.abs());
                }
            }
            jac.add_triplet(row, layout.headloss(link_id), -1.0);
            row += 1;
        }

        // Link head-difference
        for (link_id, link) in network.links.iter().enumerate() {
            if inputs.closed[link_id] {
                continue;
            }
            let start = link.start_node();
            let end = link.end_node();
            residual[row] =
                x[layout.headloss(link_id)] - (x[layout.head(start)] - x[layout.head(end)]);
            jac.add_triplet(row, layout.headloss(link_id), 1.0);
            jac.add_triplet(row, layout.head(start), -1.0);
            jac.add_triplet(row, layout.head(end), 1.0);
            row += 1;
        }

        // Tank evolution: Dirichlet on the first step, explicit Euler
        // level update written as a residual afterwards
        for (tank_idx, tank) in self.tank_rows.iter().enumerate() {
            if inputs.first_timestep {
                residual[row] = x[layout.head(tank.node_id)] - (tank.elevation + tank.init_level);
                jac.add_triplet(row, layout.head(tank.node_id), 1.0);
            } else {
                let coeff = inputs.dt_sec / tank.area;
                residual[row] = x[layout.tank_inflow(tank_idx)] * coeff
                    - (x[layout.head(tank.node_id)] - inputs.last_tank_head[tank_idx]);
                jac.add_triplet(row, layout.head(tank.node_id), -1.0);
                jac.add_triplet(row, layout.tank_inflow(tank_idx), coeff);
            }
            row += 1;
        }

        // Reservoir head fixing
        for (reservoir_idx, &node_id) in self.reservoir_nodes.iter().enumerate() {
            residual[row] = x[layout.head(node_id)] - inputs.reservoir_heads[reservoir_idx];
            jac.add_triplet(row, layout.head(node_id), 1.0);
            row += 1;
        }

        // Closed links: flow pinned to zero
        for link_id in 0..layout.num_links {
            if inputs.closed[link_id] {
                residual[row] = x[layout.flow(link_id)];
                jac.add_triplet(row, layout.flow(link_id), 1.0);
                row += 1;
            }
        }

        // Closed links: headloss pinned to zero
        for link_id in 0..layout.num_links {
            if inputs.closed[link_id] {
                residual[row] = x[layout.headloss(link_id)];
                jac.add_triplet(row, layout.headloss(link_id), 1.0);
                row += 1;
            }
        }

        debug_assert_eq!(row, n, "assembled row count must fill the system");
        (residual, jac)
    }
}

/// Wagner pressure-demand fraction and its derivative with respect to
/// pressure: 0 below the minimum pressure, square-root ramp up to the
/// nominal pressure, 1 above it.
pub(crate) fn wagner(pressure: f64, minimum: f64, nominal: f64) -> (f64, f64) {
    if nominal <= minimum {
        return (1.0, 0.0);
    }
    if pressure <= minimum {
        (0.0, 0.0)
    } else if pressure >= nominal {
        (1.0, 0.0)
    } else {
        let span = nominal - minimum;
        let ratio = (pressure - minimum) / span;
        let fraction = ratio.sqrt();
        (fraction, 0.5 / (fraction * span))
    }
}
