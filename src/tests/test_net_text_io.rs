use crate::controls::ControlEnum;
use crate::io::net_text_io::read_network_string;
use crate::network::{DemandModel, LinkStatus};
use crate::sim::results::LinkColumn;
use crate::sim::EpsSimulator;

const SAMPLE: &str = "
; A small demonstration network, SI units throughout
[TITLE]
demo net

[OPTIONS]
UNITS SI
HEADLOSS H-W
DEMAND_MODEL DD

[TIMES]
DURATION            7200
HYDRAULIC_TIMESTEP  3600
PATTERN_TIMESTEP    3600

[PATTERNS]
weekday  1.0 1.2
weekday  0.8

[CURVES]
pc  HEAD  0.05 30.0

[RESERVOIRS]
r1  50.0

[JUNCTIONS]
; name elevation demand pattern
j1  5.0   0.02  weekday
j2  0.0   0.01

[TANKS]
t1  20.0  2.0  0.0  8.0  12.0  0.0

[PIPES]
p1  r1  j1  500.0  0.3   120.0  0.0  Open
p2  j1  j2  300.0  0.25  120.0  0.0
p3  j1  t1  200.0  0.25  120.0  0.0  CV

[PUMPS]
pu1  r1  j2  pc

[CONTROLS]
LINK p1 CLOSED AT TIME 7200
LINK pu1 CLOSED IF NODE t1 ABOVE 6.5 PRIORITY 2

[COORDINATES]
j1  10.0  20.0
j2  30.0  20.0
";

#[test]
fn test_parse_sample_network() {
    let network = read_network_string(SAMPLE).unwrap();
    assert_eq!(network.name, "demo net");
    assert_eq!(network.num_nodes(), 4);
    assert_eq!(network.num_links(), 4);
    assert_eq!(network.patterns.len(), 1);
    assert_eq!(network.curves.len(), 1);
    assert_eq!(network.controls.len(), 2);
    assert_eq!(network.options.duration_sec, 7200);
    assert_eq!(network.options.demand_model, DemandModel::DemandDriven);

    // Pattern rows with the same name accumulate in file order
    let pattern = network.pattern("weekday").unwrap();
    assert_eq!(pattern.multipliers, vec![1.0, 1.2, 0.8]);

    let p3 = network.link("p3").unwrap().as_pipe().unwrap();
    assert_eq!(p3.base_status, LinkStatus::CheckValve);

    match &network.controls[0] {
        ControlEnum::Time(tc) => assert_eq!(tc.trigger_sec, 7200.0),
        _ => panic!("expected a time control"),
    }
    match &network.controls[1] {
        ControlEnum::Conditional(cc) => {
            assert_eq!(cc.threshold, 6.5);
            assert_eq!(cc.priority, 2);
        }
        _ => panic!("expected a conditional control"),
    }

    assert_eq!(network.coordinates("j1"), Some((10.0, 20.0)));
    assert_eq!(network.coordinates("t1"), None);
}

#[test]
fn test_parsed_network_simulates() {
    let network = read_network_string(SAMPLE).unwrap();
    let mut simulator = EpsSimulator::new(network);
    simulator.set_quiet(true);
    let results = simulator.run().unwrap();
    assert_eq!(results.num_timesteps(), 3);
    // The time control closes p1 on the final step
    assert_eq!(results.link_at("p1", 7200, LinkColumn::Flowrate).unwrap(), 0.0);
}

#[test]
fn test_rejects_unsupported_headloss_formula() {
    let text = "
[OPTIONS]
HEADLOSS D-W
";
    let err = read_network_string(text).unwrap_err();
    assert!(err.contains("head-loss"), "err = {}", err);
}

#[test]
fn test_rejects_unknown_section() {
    let err = read_network_string("[QUALITY]\nfoo 1.0\n").unwrap_err();
    assert!(err.contains("Unknown section"), "err = {}", err);
}

#[test]
fn test_reports_line_numbers() {
    let text = "
[JUNCTIONS]
j1  not_a_number  0.02
";
    let err = read_network_string(text).unwrap_err();
    assert!(err.contains("Line 3"), "err = {}", err);
}

#[test]
fn test_rejects_link_to_unknown_node() {
    let text = "
[JUNCTIONS]
j1  5.0  0.02

[PIPES]
p1  j1  ghost  500.0  0.3  120.0  0.0
";
    let err = read_network_string(text).unwrap_err();
    assert!(err.contains("ghost"), "err = {}", err);
}

#[test]
fn test_rejects_data_before_section() {
    let err = read_network_string("j1 5.0 0.02\n").unwrap_err();
    assert!(err.contains("before the first"), "err = {}", err);
}
