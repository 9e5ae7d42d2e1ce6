use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::network::{LinkStatus, WaterNetwork};
use crate::sim::results::{EventKind, NodeColumn};
use crate::sim::EpsSimulator;
use crate::tests::test_solver::check_mass_balance;

fn reservoir_tank_network(init_level: f64, min_level: f64, max_level: f64) -> WaterNetwork {
    let mut network = WaterNetwork::new("res_tank");
    network.options.duration_sec = 7200;
    network.options.hydraulic_step_sec = 3600;
    network.add_reservoir("r1", 50.0, None).unwrap();
    network
        .add_tank("t1", 0.0, init_level, min_level, max_level, 10.0, 0.0, None)
        .unwrap();
    network
        .add_pipe("p1", "r1", "t1", 500.0, 0.3, 120.0, 0.0, LinkStatus::Open)
        .unwrap();
    network
}

fn run(network: WaterNetwork) -> (WaterNetwork, crate::sim::ResultsStore) {
    let mut simulator = EpsSimulator::new(network);
    simulator.set_quiet(true);
    let results = simulator.run().unwrap();
    (simulator.network.clone(), results)
}

#[test]
fn test_first_step_pins_tank_at_initial_level() {
    let (_, results) = run(reservoir_tank_network(2.0, 0.0, 45.0));
    let level = results.node_at("t1", 0, NodeColumn::Pressure).unwrap();
    assert!((level - 2.0).abs() < 1e-6, "level = {}", level);
}

#[test]
fn test_tank_level_evolution_law() {
    let (network, results) = run(reservoir_tank_network(2.0, 0.0, 45.0));
    assert!(results.all_converged());
    check_mass_balance(&network, &results);

    let tank = network.node("t1").unwrap().as_tank().unwrap();
    let area = tank.area();
    let dt = network.options.hydraulic_step_sec as f64;
    let tank_id = network.node_id("t1").unwrap();

    // level(t) = level(t - dt) + inflow(t)*dt*4/(pi*D^2), every step
    for step in 1..results.num_timesteps() {
        let level_prev = results.node_value(step - 1, tank_id, NodeColumn::Pressure);
        let level = results.node_value(step, tank_id, NodeColumn::Pressure);
        let inflow = results.node_value(step, tank_id, NodeColumn::Demand);
        let predicted = level_prev + inflow * dt / area;
        assert!(
            (level - predicted).abs() < 1e-5,
            "step {}: level {} predicted {}",
            step,
            level,
            predicted
        );
        assert!(level >= tank.min_level && level <= tank.max_level);
    }

    // The reservoir sits above the tank, so the tank must be filling
    let level_first = results.node_value(0, tank_id, NodeColumn::Pressure);
    let level_last =
        results.node_value(results.num_timesteps() - 1, tank_id, NodeColumn::Pressure);
    assert!(level_last > level_first + 1.0);
}

#[test]
fn test_tank_clamps_at_max_level() {
    let (network, results) = run(reservoir_tank_network(9.5, 0.0, 10.0));
    let tank_id = network.node_id("t1").unwrap();

    let level = results.node_value(1, tank_id, NodeColumn::Pressure);
    assert!((level - 10.0).abs() < 1e-9, "level = {}", level);
    // A clamped tank accepts no more water
    let inflow = results.node_value(1, tank_id, NodeColumn::Demand);
    assert_eq!(inflow, 0.0);
    assert!(results
        .events
        .iter()
        .any(|e| e.kind == EventKind::TankBoundReached));

    let tank = network.node("t1").unwrap().as_tank().unwrap();
    assert!((tank.level - 10.0).abs() < 1e-9);
}

#[test]
fn test_tank_clamps_at_min_level() {
    let mut network = WaterNetwork::new("draining");
    network.options.duration_sec = 3600;
    network.options.hydraulic_step_sec = 3600;
    network.add_reservoir("r1", 0.1, None).unwrap();
    network
        .add_tank("t1", 0.0, 0.5, 0.4, 5.0, 2.0, 0.0, None)
        .unwrap();
    network
        .add_pipe("p1", "t1", "r1", 500.0, 0.3, 120.0, 0.0, LinkStatus::Open)
        .unwrap();

    let (network, results) = run(network);
    let tank_id = network.node_id("t1").unwrap();
    let level = results.node_value(1, tank_id, NodeColumn::Pressure);
    assert!((level - 0.4).abs() < 1e-9, "level = {}", level);
    assert!(results
        .events
        .iter()
        .any(|e| e.kind == EventKind::TankBoundReached));
}

#[test]
fn test_repeated_runs_are_identical() {
    let network = reservoir_tank_network(2.0, 0.0, 45.0);

    let mut simulator = EpsSimulator::new(network.clone());
    simulator.set_quiet(true);
    let first = simulator.run().unwrap();
    let second = simulator.run().unwrap();
    assert!(first.values_equal(&second));

    // A fresh simulator over a clone of the network agrees too
    let mut other = EpsSimulator::new(network);
    other.set_quiet(true);
    let third = other.run().unwrap();
    assert!(first.values_equal(&third));
}

#[test]
fn test_cancellation_returns_partial_results() {
    let network = reservoir_tank_network(2.0, 0.0, 45.0);
    let flag = Arc::new(AtomicBool::new(true));

    let mut simulator = EpsSimulator::new(network);
    simulator.set_quiet(true);
    simulator.set_cancel_flag(Arc::clone(&flag));
    let results = simulator.run().unwrap();

    // Cancelled before the first step: the store exists but is empty
    assert_eq!(results.num_timesteps(), 0);
    assert_eq!(results.node_names().len(), 2);

    // Clearing the flag lets the run proceed normally
    flag.store(false, Ordering::Relaxed);
    let results = simulator.run().unwrap();
    assert_eq!(results.num_timesteps(), 3);
}

#[test]
fn test_demand_pattern_drives_junction_demand() {
    let mut network = WaterNetwork::new("patterned");
    network.options.duration_sec = 7200;
    network.options.hydraulic_step_sec = 3600;
    network.options.pattern_step_sec = 3600;
    network.add_pattern("pat", vec![1.0, 2.0, 0.5]).unwrap();
    network.add_reservoir("r1", 50.0, None).unwrap();
    network.add_junction("j1", 0.0, 0.02, Some("pat")).unwrap();
    network
        .add_pipe("p1", "r1", "j1", 500.0, 0.3, 120.0, 0.0, LinkStatus::Open)
        .unwrap();

    let (network, results) = run(network);
    assert!(results.all_converged());
    check_mass_balance(&network, &results);

    let demand_0 = results.node_at("j1", 0, NodeColumn::Demand).unwrap();
    let demand_1 = results.node_at("j1", 3600, NodeColumn::Demand).unwrap();
    let demand_2 = results.node_at("j1", 7200, NodeColumn::Demand).unwrap();
    assert!((demand_0 - 0.02).abs() < 1e-9);
    assert!((demand_1 - 0.04).abs() < 1e-9);
    assert!((demand_2 - 0.01).abs() < 1e-9);
}

#[test]
fn test_reservoir_head_pattern_is_honoured() {
    let mut network = WaterNetwork::new("head_pattern");
    network.options.duration_sec = 3600;
    network.options.hydraulic_step_sec = 3600;
    network.options.pattern_step_sec = 3600;
    network.add_pattern("hp", vec![1.0, 1.2]).unwrap();
    network.add_reservoir("r1", 50.0, Some("hp")).unwrap();
    network.add_junction("j1", 0.0, 0.02, None).unwrap();
    network
        .add_pipe("p1", "r1", "j1", 500.0, 0.3, 120.0, 0.0, LinkStatus::Open)
        .unwrap();

    let (_, results) = run(network);
    assert!(results.all_converged());
    let head_0 = results.node_at("r1", 0, NodeColumn::Head).unwrap();
    let head_1 = results.node_at("r1", 3600, NodeColumn::Head).unwrap();
    assert!((head_0 - 50.0).abs() < 1e-6);
    assert!((head_1 - 60.0).abs() < 1e-6);
}
