use crate::network::{NodeEnum, WaterNetwork};
use crate::sim::results::{LinkColumn, NodeColumn, ResultsStore};

/*
Todini resilience index, per timestep: the ratio of surplus hydraulic
power delivered at junctions (above the power needed at the threshold
pressure h*) to the net power entering the network from reservoirs and
pumps. A verification metric, not a solver input.

The results store must have been produced from the same network, so
that node/link positions line up with the network's integer ids.
 */
pub fn todini(results: &ResultsStore, network: &WaterNetwork, h_star: f64) -> Vec<f64> {
    let mut index = Vec::with_capacity(results.num_timesteps());

    for step in 0..results.num_timesteps() {
        let mut power_out = 0.0;
        let mut power_expected = 0.0;
        let mut power_in_reservoirs = 0.0;

        for (node_id, node) in network.nodes.iter().enumerate() {
            let demand = results.node_value(step, node_id, NodeColumn::Demand);
            let head = results.node_value(step, node_id, NodeColumn::Head);
            match node {
                NodeEnum::Junction(junction) => {
                    power_out += demand * head;
                    power_expected += demand * (junction.elevation + h_star);
                }
                NodeEnum::Reservoir(_) => {
                    // Reservoir demand is negative when the reservoir
                    // supplies the network
                    power_in_reservoirs += -demand * head;
                }
                NodeEnum::Tank(_) => {}
            }
        }

        let mut power_in_pumps = 0.0;
        for (link_id, pump) in network.pumps() {
            let flow = results.link_value(step, link_id, LinkColumn::Flowrate);
            let head_start = results.node_value(step, pump.start_node, NodeColumn::Head);
            let head_end = results.node_value(step, pump.end_node, NodeColumn::Head);
            power_in_pumps += flow.abs() * (head_end - head_start).abs();
        }

        let denominator = power_in_reservoirs + power_in_pumps - power_expected;
        if denominator.abs() < f64::EPSILON {
            index.push(f64::NAN);
        } else {
            index.push((power_out - power_expected) / denominator);
        }
    }

    index
}
