use std::collections::HashMap;

use crate::controls::{Comparison, ControlEnum};
use crate::network::curve::{pump_coefficients, Curve, CurveType};
use crate::network::error::NetworkError;
use crate::network::link::{LinkEnum, LinkStatus, Pipe, Pump, Valve, ValveType};
use crate::network::node::{Junction, NodeEnum, Reservoir, Tank};
use crate::network::options::SimOptions;
use crate::network::pattern::Pattern;

/*
=============
WATER NETWORK
=============

The in-memory model of the piped network: flat vectors of nodes and
links indexed by integer id, with name -> id lookups on the side. The
vectors are append-only; ids are stable for the life of the model. The
model is structurally fixed once a simulation starts - only link status,
pump speed/outage and tank level mutate during a run, and only between
solver calls (the controls subsystem owns those mutations).
 */
#[derive(Clone, Default, Debug)]
pub struct WaterNetwork {
    pub name: String,
    pub nodes: Vec<NodeEnum>,
    pub links: Vec<LinkEnum>,
    pub curves: Vec<Curve>,
    pub patterns: Vec<Pattern>,
    pub controls: Vec<ControlEnum>,
    pub options: SimOptions,

    node_index: HashMap<String, usize>,
    link_index: HashMap<String, usize>,
    curve_index: HashMap<String, usize>,
    pattern_index: HashMap<String, usize>,

    // Node ids of tanks and reservoirs, in insertion order. These define
    // the tank/reservoir ordering of the solver state vector.
    tank_node_ids: Vec<usize>,
    reservoir_node_ids: Vec<usize>,

    // Coordinates are pass-through data for results consumers; the
    // solver never reads them.
    coordinates: Vec<Option<(f64, f64)>>,
}

impl WaterNetwork {
    pub fn new(name: &str) -> WaterNetwork {
        WaterNetwork {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn register_node(&mut self, node: NodeEnum) -> Result<usize, NetworkError> {
        let name = node.name().to_string();
        if self.node_index.contains_key(&name) {
            return Err(NetworkError::DuplicateName(name));
        }
        let id = self.nodes.len();
        match &node {
            NodeEnum::Tank(_) => self.tank_node_ids.push(id),
            NodeEnum::Reservoir(_) => self.reservoir_node_ids.push(id),
            NodeEnum::Junction(_) => {}
        }
        self.nodes.push(node);
        self.coordinates.push(None);
        self.node_index.insert(name, id);
        Ok(id)
    }

    fn register_link(&mut self, link: LinkEnum) -> Result<usize, NetworkError> {
        let name = link.name().to_string();
        if self.link_index.contains_key(&name) {
            return Err(NetworkError::DuplicateName(name));
        }
        let id = self.links.len();
        self.links.push(link);
        self.link_index.insert(name, id);
        Ok(id)
    }

    pub fn add_junction(
        &mut self,
        name: &str,
        elevation: f64,
        base_demand: f64,
        demand_pattern: Option<&str>,
    ) -> Result<usize, NetworkError> {
        self.register_node(NodeEnum::Junction(Junction::new(
            name,
            elevation,
            base_demand,
            demand_pattern,
        )))
    }

    pub fn add_reservoir(
        &mut self,
        name: &str,
        base_head: f64,
        head_pattern: Option<&str>,
    ) -> Result<usize, NetworkError> {
        self.register_node(NodeEnum::Reservoir(Reservoir::new(
            name,
            base_head,
            head_pattern,
        )))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_tank(
        &mut self,
        name: &str,
        elevation: f64,
        init_level: f64,
        min_level: f64,
        max_level: f64,
        diameter: f64,
        min_vol: f64,
        vol_curve: Option<&str>,
    ) -> Result<usize, NetworkError> {
        self.register_node(NodeEnum::Tank(Tank::new(
            name, elevation, init_level, min_level, max_level, diameter, min_vol, vol_curve,
        )))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_pipe(
        &mut self,
        name: &str,
        start_node: &str,
        end_node: &str,
        length: f64,
        diameter: f64,
        roughness: f64,
        minor_loss: f64,
        status: LinkStatus,
    ) -> Result<usize, NetworkError> {
        let (start, end) = self.resolve_endpoints(name, start_node, end_node)?;
        self.register_link(LinkEnum::Pipe(Pipe {
            name: name.to_string(),
            start_node: start,
            end_node: end,
            length,
            diameter,
            roughness,
            minor_loss,
            base_status: status,
            status,
        }))
    }

    pub fn add_pump(
        &mut self,
        name: &str,
        start_node: &str,
        end_node: &str,
        curve_name: &str,
    ) -> Result<usize, NetworkError> {
        let (start, end) = self.resolve_endpoints(name, start_node, end_node)?;
        self.register_link(LinkEnum::Pump(Pump {
            name: name.to_string(),
            start_node: start,
            end_node: end,
            curve_name: curve_name.to_string(),
            base_status: LinkStatus::Open,
            status: LinkStatus::Open,
            base_speed: 1.0,
            speed: 1.0,
            outage: false,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_valve(
        &mut self,
        name: &str,
        start_node: &str,
        end_node: &str,
        diameter: f64,
        valve_type: ValveType,
        setting: f64,
        minor_loss: f64,
    ) -> Result<usize, NetworkError> {
        let (start, end) = self.resolve_endpoints(name, start_node, end_node)?;
        self.register_link(LinkEnum::Valve(Valve {
            name: name.to_string(),
            start_node: start,
            end_node: end,
            diameter,
            valve_type,
            setting,
            minor_loss,
            base_status: LinkStatus::Open,
            status: LinkStatus::Open,
        }))
    }

    fn resolve_endpoints(
        &self,
        link_name: &str,
        start_node: &str,
        end_node: &str,
    ) -> Result<(usize, usize), NetworkError> {
        let start = self
            .node_id(start_node)
            .ok_or_else(|| NetworkError::UnknownNode(start_node.to_string()))?;
        let end = self
            .node_id(end_node)
            .ok_or_else(|| NetworkError::UnknownNode(end_node.to_string()))?;
        if start == end {
            return Err(NetworkError::InvalidNetwork(format!(
                "Link '{}' connects node '{}' to itself",
                link_name, start_node
            )));
        }
        Ok((start, end))
    }

    pub fn add_pattern(&mut self, name: &str, multipliers: Vec<f64>) -> Result<usize, NetworkError> {
        if self.pattern_index.contains_key(name) {
            return Err(NetworkError::DuplicateName(name.to_string()));
        }
        let id = self.patterns.len();
        self.patterns.push(Pattern::new(name, multipliers));
        self.pattern_index.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn add_curve(
        &mut self,
        name: &str,
        curve_type: CurveType,
        points: Vec<(f64, f64)>,
    ) -> Result<usize, NetworkError> {
        if self.curve_index.contains_key(name) {
            return Err(NetworkError::DuplicateName(name.to_string()));
        }
        let id = self.curves.len();
        self.curves.push(Curve::new(name, curve_type, points));
        self.curve_index.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn add_control(&mut self, control: ControlEnum) {
        self.controls.push(control);
    }

    //------------------------------------------------------------------
    // Lookups
    //------------------------------------------------------------------

    pub fn node_id(&self, name: &str) -> Option<usize> {
        self.node_index.get(name).copied()
    }

    pub fn link_id(&self, name: &str) -> Option<usize> {
        self.link_index.get(name).copied()
    }

    pub fn node(&self, name: &str) -> Option<&NodeEnum> {
        self.node_id(name).map(|id| &self.nodes[id])
    }

    pub fn link(&self, name: &str) -> Option<&LinkEnum> {
        self.link_id(name).map(|id| &self.links[id])
    }

    pub fn curve(&self, name: &str) -> Option<&Curve> {
        self.curve_index.get(name).map(|&id| &self.curves[id])
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.pattern_index.get(name).map(|&id| &self.patterns[id])
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn num_tanks(&self) -> usize {
        self.tank_node_ids.len()
    }

    pub fn num_reservoirs(&self) -> usize {
        self.reservoir_node_ids.len()
    }

    pub fn num_junctions(&self) -> usize {
        self.num_nodes() - self.num_tanks() - self.num_reservoirs()
    }

    /// Node ids of all tanks, in state-vector order.
    pub fn tank_node_ids(&self) -> &[usize] {
        &self.tank_node_ids
    }

    /// Node ids of all reservoirs, in state-vector order.
    pub fn reservoir_node_ids(&self) -> &[usize] {
        &self.reservoir_node_ids
    }

    pub fn junctions(&self) -> impl Iterator<Item = (usize, &Junction)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, n)| n.as_junction().map(|j| (id, j)))
    }

    pub fn reservoirs(&self) -> impl Iterator<Item = (usize, &Reservoir)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, n)| n.as_reservoir().map(|r| (id, r)))
    }

    pub fn tanks(&self) -> impl Iterator<Item = (usize, &Tank)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, n)| n.as_tank().map(|t| (id, t)))
    }

    pub fn pipes(&self) -> impl Iterator<Item = (usize, &Pipe)> {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(id, l)| l.as_pipe().map(|p| (id, p)))
    }

    pub fn pumps(&self) -> impl Iterator<Item = (usize, &Pump)> {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(id, l)| l.as_pump().map(|p| (id, p)))
    }

    pub fn valves(&self) -> impl Iterator<Item = (usize, &Valve)> {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(id, l)| l.as_valve().map(|v| (id, v)))
    }

    /// Ids of all links incident to a node.
    pub fn links_for_node(&self, node_id: usize) -> Vec<usize> {
        let mut result = vec![];
        for i in 0..self.links.len() {
            if self.links[i].start_node() == node_id || self.links[i].end_node() == node_id {
                result.push(i);
            }
        }
        result
    }

    //------------------------------------------------------------------
    // Mutators (used by the controls subsystem between solver calls)
    //------------------------------------------------------------------

    pub fn set_link_status(&mut self, link_id: usize, status: LinkStatus) {
        self.links[link_id].set_status(status);
    }

    pub fn set_pump_speed(&mut self, link_id: usize, speed: f64) -> Result<(), NetworkError> {
        match self.links[link_id].as_pump_mut() {
            Some(pump) => {
                pump.speed = speed;
                Ok(())
            }
            None => Err(NetworkError::InvalidNetwork(format!(
                "Link '{}' is not a pump",
                self.links[link_id].name()
            ))),
        }
    }

    pub fn set_pump_outage(&mut self, link_id: usize, outage: bool) -> Result<(), NetworkError> {
        match self.links[link_id].as_pump_mut() {
            Some(pump) => {
                pump.outage = outage;
                Ok(())
            }
            None => Err(NetworkError::InvalidNetwork(format!(
                "Link '{}' is not a pump",
                self.links[link_id].name()
            ))),
        }
    }

    /// Reset runtime state (statuses, pump speeds, tank levels) to the
    /// base configuration. Called at the start of every run.
    pub fn reset_initial_status(&mut self) {
        for link in &mut self.links {
            match link {
                LinkEnum::Pipe(pipe) => pipe.status = pipe.base_status,
                LinkEnum::Pump(pump) => {
                    pump.status = pump.base_status;
                    pump.speed = pump.base_speed;
                    pump.outage = false;
                }
                LinkEnum::Valve(valve) => valve.status = valve.base_status,
            }
        }
        for node in &mut self.nodes {
            if let Some(tank) = node.as_tank_mut() {
                tank.level = tank.init_level;
            }
        }
    }

    //------------------------------------------------------------------
    // Time-dependent boundary values
    //------------------------------------------------------------------

    /// Junction demand at simulation time t: base demand scaled by the
    /// demand pattern (1.0 when no pattern is set).
    pub fn junction_demand(&self, junction: &Junction, t_sec: u64) -> f64 {
        let mult = match &junction.demand_pattern {
            Some(name) => match self.pattern(name) {
                Some(p) => p.multiplier_at(
                    t_sec,
                    self.options.pattern_step_sec,
                    self.options.pattern_start_sec,
                ),
                None => 1.0,
            },
            None => 1.0,
        };
        junction.base_demand * mult
    }

    /// Reservoir total head at simulation time t.
    pub fn reservoir_head(&self, reservoir: &Reservoir, t_sec: u64) -> f64 {
        let mult = match &reservoir.head_pattern {
            Some(name) => match self.pattern(name) {
                Some(p) => p.multiplier_at(
                    t_sec,
                    self.options.pattern_step_sec,
                    self.options.pattern_start_sec,
                ),
                None => 1.0,
            },
            None => 1.0,
        };
        reservoir.base_head * mult
    }

    /// Stored volume (m3) at a given tank level. Uses the tank's volume
    /// curve when one is attached, otherwise the cylindrical relation.
    pub fn tank_volume(&self, tank: &Tank, level: f64) -> f64 {
        match &tank.vol_curve {
            Some(name) => match self.curve(name) {
                Some(curve) => curve.interpolate(level),
                None => tank.area() * level,
            },
            None => tank.area() * level,
        }
    }

    /// Pump curve coefficients (A, B, C) for the relation
    /// `h_gain = A - B*Q^C`, derived from the pump's head curve.
    pub fn pump_curve_coefficients(&self, pump: &Pump) -> Result<(f64, f64, f64), NetworkError> {
        let curve = self
            .curve(&pump.curve_name)
            .ok_or_else(|| NetworkError::UnknownCurve(pump.curve_name.clone()))?;
        pump_coefficients(curve)
    }

    //------------------------------------------------------------------
    // Coordinates (pass-through for results consumers)
    //------------------------------------------------------------------

    pub fn set_coordinates(&mut self, node_name: &str, x: f64, y: f64) -> Result<(), NetworkError> {
        let id = self
            .node_id(node_name)
            .ok_or_else(|| NetworkError::UnknownNode(node_name.to_string()))?;
        self.coordinates[id] = Some((x, y));
        Ok(())
    }

    pub fn coordinates(&self, node_name: &str) -> Option<(f64, f64)> {
        self.node_id(node_name).and_then(|id| self.coordinates[id])
    }

    //------------------------------------------------------------------
    // Attribute queries
    //------------------------------------------------------------------

    /// Names and values of nodes whose named attribute compares true
    /// against the threshold. Nodes without the attribute are skipped.
    pub fn query_node_attribute(
        &self,
        attribute: &str,
        op: Comparison,
        threshold: f64,
    ) -> Vec<(String, f64)> {
        let mut result = vec![];
        for node in &self.nodes {
            let value = match (node, attribute) {
                (NodeEnum::Junction(j), "elevation") => Some(j.elevation),
                (NodeEnum::Junction(j), "base_demand") => Some(j.base_demand),
                (NodeEnum::Reservoir(r), "base_head") => Some(r.base_head),
                (NodeEnum::Tank(t), "elevation") => Some(t.elevation),
                (NodeEnum::Tank(t), "init_level") => Some(t.init_level),
                (NodeEnum::Tank(t), "diameter") => Some(t.diameter),
                _ => None,
            };
            if let Some(v) = value {
                if op.compare(v, threshold) {
                    result.push((node.name().to_string(), v));
                }
            }
        }
        result
    }

    /// Names and values of links whose named attribute compares true
    /// against the threshold.
    pub fn query_link_attribute(
        &self,
        attribute: &str,
        op: Comparison,
        threshold: f64,
    ) -> Vec<(String, f64)> {
        let mut result = vec![];
        for link in &self.links {
            let value = match (link, attribute) {
                (LinkEnum::Pipe(p), "length") => Some(p.length),
                (LinkEnum::Pipe(p), "diameter") => Some(p.diameter),
                (LinkEnum::Pipe(p), "roughness") => Some(p.roughness),
                (LinkEnum::Valve(v), "diameter") => Some(v.diameter),
                (LinkEnum::Valve(v), "setting") => Some(v.setting),
                (LinkEnum::Pump(p), "base_speed") => Some(p.base_speed),
                _ => None,
            };
            if let Some(v) = value {
                if op.compare(v, threshold) {
                    result.push((link.name().to_string(), v));
                }
            }
        }
        result
    }

    //------------------------------------------------------------------
    // Validation
    //------------------------------------------------------------------

    /// Structural validation, run before any simulation. All failures
    /// here are fatal input errors.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.options.hydraulic_step_sec == 0 {
            return Err(NetworkError::InvalidNetwork(
                "Hydraulic timestep must be positive".to_string(),
            ));
        }
        if self.options.pattern_step_sec == 0 {
            return Err(NetworkError::InvalidNetwork(
                "Pattern timestep must be positive".to_string(),
            ));
        }

        for pattern in &self.patterns {
            if pattern.is_empty() {
                return Err(NetworkError::InvalidNetwork(format!(
                    "Pattern '{}' has no multipliers",
                    pattern.name
                )));
            }
        }

        for (_, junction) in self.junctions() {
            if let Some(name) = &junction.demand_pattern {
                if self.pattern(name).is_none() {
                    return Err(NetworkError::UnknownPattern(name.clone()));
                }
            }
        }
        for (_, reservoir) in self.reservoirs() {
            if let Some(name) = &reservoir.head_pattern {
                if self.pattern(name).is_none() {
                    return Err(NetworkError::UnknownPattern(name.clone()));
                }
            }
        }

        for (_, tank) in self.tanks() {
            if tank.diameter <= 0.0 {
                return Err(NetworkError::InvalidNetwork(format!(
                    "Tank '{}' must have a positive diameter",
                    tank.name
                )));
            }
            if tank.min_level > tank.max_level {
                return Err(NetworkError::InvalidNetwork(format!(
                    "Tank '{}' has min_level above max_level",
                    tank.name
                )));
            }
            if tank.init_level < tank.min_level || tank.init_level > tank.max_level {
                return Err(NetworkError::InvalidNetwork(format!(
                    "Tank '{}' initial level is outside [min_level, max_level]",
                    tank.name
                )));
            }
            if let Some(name) = &tank.vol_curve {
                match self.curve(name) {
                    Some(curve) if curve.curve_type == CurveType::Volume => {}
                    Some(_) => {
                        return Err(NetworkError::InvalidCurve(format!(
                            "Curve '{}' on tank '{}' is not a VOLUME curve",
                            name, tank.name
                        )))
                    }
                    None => return Err(NetworkError::UnknownCurve(name.clone())),
                }
            }
        }

        for (_, pump) in self.pumps() {
            let curve = self
                .curve(&pump.curve_name)
                .ok_or_else(|| NetworkError::UnknownCurve(pump.curve_name.clone()))?;
            if curve.curve_type != CurveType::Head {
                return Err(NetworkError::InvalidCurve(format!(
                    "Curve '{}' on pump '{}' is not a HEAD curve",
                    curve.name, pump.name
                )));
            }
            // Rejects multi-point curves and malformed fits
            pump_coefficients(curve)?;
        }

        for link in &self.links {
            if link.base_status() == LinkStatus::CheckValve && link.as_pipe().is_none() {
                return Err(NetworkError::InvalidNetwork(format!(
                    "Link '{}': check-valve status is only valid on pipes",
                    link.name()
                )));
            }
        }

        for control in &self.controls {
            if let Err(msg) = control.action().validate(self) {
                return Err(NetworkError::InvalidNetwork(msg));
            }
            if let ControlEnum::Time(tc) = control {
                if tc.daily && tc.trigger_sec > 86400.0 {
                    return Err(NetworkError::InvalidNetwork(
                        "Daily time controls must trigger within the first day".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
