use nalgebra::DVector;

use crate::network::WaterNetwork;

/*
Layout of the solver state vector X. The blocks are, in fixed order:

    [ flow; L | headloss; L | head; N | tank_inflow; T | res_demand; R ]

Tank and reservoir blocks follow the insertion order of tanks and
reservoirs in the network (WaterNetwork::tank_node_ids /
reservoir_node_ids). The residual vector produced by the assembler uses
the same total length with its own block ordering; see assembly.rs.
 */
#[derive(Clone, Copy, Debug)]
pub struct StateLayout {
    pub num_links: usize,
    pub num_nodes: usize,
    pub num_tanks: usize,
    pub num_reservoirs: usize,
}

impl StateLayout {
    pub fn for_network(network: &WaterNetwork) -> StateLayout {
        StateLayout {
            num_links: network.num_links(),
            num_nodes: network.num_nodes(),
            num_tanks: network.num_tanks(),
            num_reservoirs: network.num_reservoirs(),
        }
    }

    pub fn len(&self) -> usize {
        2 * self.num_links + self.num_nodes + self.num_tanks + self.num_reservoirs
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flow(&self, link_id: usize) -> usize {
        link_id
    }

    pub fn headloss(&self, link_id: usize) -> usize {
        self.num_links + link_id
    }

    pub fn head(&self, node_id: usize) -> usize {
        2 * self.num_links + node_id
    }

    pub fn tank_inflow(&self, tank_idx: usize) -> usize {
        2 * self.num_links + self.num_nodes + tank_idx
    }

    pub fn reservoir_demand(&self, reservoir_idx: usize) -> usize {
        2 * self.num_links + self.num_nodes + self.num_tanks + reservoir_idx
    }

    /// Warm-start state for the first solve: uniform guesses for flows,
    /// losses and heads, with tank heads pinned at their initial levels.
    pub fn initial_state(&self, network: &WaterNetwork) -> DVector<f64> {
        let mut x = DVector::zeros(self.len());
        for l in 0..self.num_links {
            x[self.flow(l)] = 0.1;
            x[self.headloss(l)] = 10.0;
        }
        for n in 0..self.num_nodes {
            x[self.head(n)] = 200.0;
        }
        for (tank_idx, &node_id) in network.tank_node_ids().iter().enumerate() {
            if let Some(tank) = network.nodes[node_id].as_tank() {
                x[self.head(node_id)] = tank.elevation + tank.init_level;
            }
            x[self.tank_inflow(tank_idx)] = 0.1;
        }
        for r in 0..self.num_reservoirs {
            x[self.reservoir_demand(r)] = 1.0;
        }
        x
    }
}
