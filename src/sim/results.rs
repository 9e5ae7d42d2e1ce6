use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_derive::Serialize;
use uuid::Uuid;

use crate::network::WaterNetwork;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeColumn {
    Demand,
    Head,
    Pressure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkColumn {
    Flowrate,
    Velocity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EventKind {
    TankBoundReached,
    StepNotConverged,
    ControlOscillation,
}

/// A non-fatal incident recorded during a run.
#[derive(Clone, Debug, Serialize)]
pub struct SimEvent {
    pub time_sec: u64,
    pub kind: EventKind,
    pub message: String,
}

/// Machine-readable digest of a completed run.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub network_name: String,
    pub run_id: String,
    pub num_timesteps: usize,
    pub converged_steps: usize,
    pub fully_converged: bool,
    pub num_events: usize,
}

/*
=============
RESULTS STORE
=============

Append-only record of the hydraulic solution, one row block per
accepted step. Two sub-tables, both keyed by (name, time): a node table
with demand/head/pressure/type columns and a link table with
flowrate/velocity/type columns. Values are stored step-major in flat
vectors; names and types are seeded from the network when the store is
created, so node/link positions equal the network's integer ids.
 */
#[derive(Clone, Debug)]
pub struct ResultsStore {
    pub run_id: Uuid,
    pub network_name: String,
    pub generated: DateTime<Utc>,
    pub events: Vec<SimEvent>,

    node_names: Vec<String>,
    node_types: Vec<String>,
    link_names: Vec<String>,
    link_types: Vec<String>,
    node_name_index: HashMap<String, usize>,
    link_name_index: HashMap<String, usize>,

    times: Vec<u64>,
    converged: Vec<bool>,
    node_demand: Vec<f64>,
    node_head: Vec<f64>,
    node_pressure: Vec<f64>,
    link_flowrate: Vec<f64>,
    link_velocity: Vec<f64>,
}

impl ResultsStore {
    pub fn new(network: &WaterNetwork) -> ResultsStore {
        let mut node_names = vec![];
        let mut node_types = vec![];
        let mut node_name_index = HashMap::new();
        for (id, node) in network.nodes.iter().enumerate() {
            node_names.push(node.name().to_string());
            node_types.push(node.type_name().to_string());
            node_name_index.insert(node.name().to_string(), id);
        }

        let mut link_names = vec![];
        let mut link_types = vec![];
        let mut link_name_index = HashMap::new();
        for (id, link) in network.links.iter().enumerate() {
            link_names.push(link.name().to_string());
            link_types.push(link.type_name().to_string());
            link_name_index.insert(link.name().to_string(), id);
        }

        ResultsStore {
            run_id: Uuid::new_v4(),
            network_name: network.name.clone(),
            generated: Utc::now(),
            events: vec![],
            node_names,
            node_types,
            link_names,
            link_types,
            node_name_index,
            link_name_index,
            times: vec![],
            converged: vec![],
            node_demand: vec![],
            node_head: vec![],
            node_pressure: vec![],
            link_flowrate: vec![],
            link_velocity: vec![],
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn push_step(
        &mut self,
        time_sec: u64,
        demand: &[f64],
        head: &[f64],
        pressure: &[f64],
        flowrate: &[f64],
        velocity: &[f64],
        converged: bool,
    ) {
        debug_assert_eq!(demand.len(), self.node_names.len());
        debug_assert_eq!(flowrate.len(), self.link_names.len());
        self.times.push(time_sec);
        self.converged.push(converged);
        self.node_demand.extend_from_slice(demand);
        self.node_head.extend_from_slice(head);
        self.node_pressure.extend_from_slice(pressure);
        self.link_flowrate.extend_from_slice(flowrate);
        self.link_velocity.extend_from_slice(velocity);
    }

    pub fn record_event(&mut self, time_sec: u64, kind: EventKind, message: &str) {
        self.events.push(SimEvent {
            time_sec,
            kind,
            message: message.to_string(),
        });
    }

    pub fn num_timesteps(&self) -> usize {
        self.times.len()
    }

    pub fn times(&self) -> &[u64] {
        &self.times
    }

    pub fn node_names(&self) -> &[String] {
        &self.node_names
    }

    pub fn link_names(&self) -> &[String] {
        &self.link_names
    }

    pub fn step_converged(&self, step: usize) -> bool {
        self.converged[step]
    }

    pub fn all_converged(&self) -> bool {
        self.converged.iter().all(|&c| c)
    }

    fn step_of_time(&self, time_sec: u64) -> Option<usize> {
        self.times.iter().position(|&t| t == time_sec)
    }

    /// Node value by (name, time); the tabular access of the results
    /// interface.
    pub fn node_at(&self, name: &str, time_sec: u64, column: NodeColumn) -> Option<f64> {
        let node = *self.node_name_index.get(name)?;
        let step = self.step_of_time(time_sec)?;
        Some(self.node_value(step, node, column))
    }

    /// Link value by (name, time).
    pub fn link_at(&self, name: &str, time_sec: u64, column: LinkColumn) -> Option<f64> {
        let link = *self.link_name_index.get(name)?;
        let step = self.step_of_time(time_sec)?;
        Some(self.link_value(step, link, column))
    }

    /// Node value by (step index, node id). Node ids match the network
    /// the store was created from.
    pub fn node_value(&self, step: usize, node_id: usize, column: NodeColumn) -> f64 {
        let idx = step * self.node_names.len() + node_id;
        match column {
            NodeColumn::Demand => self.node_demand[idx],
            NodeColumn::Head => self.node_head[idx],
            NodeColumn::Pressure => self.node_pressure[idx],
        }
    }

    /// Link value by (step index, link id).
    pub fn link_value(&self, step: usize, link_id: usize, column: LinkColumn) -> f64 {
        let idx = step * self.link_names.len() + link_id;
        match column {
            LinkColumn::Flowrate => self.link_flowrate[idx],
            LinkColumn::Velocity => self.link_velocity[idx],
        }
    }

    pub fn node_type(&self, name: &str) -> Option<&str> {
        let id = *self.node_name_index.get(name)?;
        Some(self.node_types[id].as_str())
    }

    pub fn link_type(&self, name: &str) -> Option<&str> {
        let id = *self.link_name_index.get(name)?;
        Some(self.link_types[id].as_str())
    }

    pub fn node_type_by_id(&self, node_id: usize) -> &str {
        &self.node_types[node_id]
    }

    pub fn link_type_by_id(&self, link_id: usize) -> &str {
        &self.link_types[link_id]
    }

    pub fn summary(&self) -> RunSummary {
        let converged_steps = self.converged.iter().filter(|&&c| c).count();
        RunSummary {
            network_name: self.network_name.clone(),
            run_id: self.run_id.to_string(),
            num_timesteps: self.num_timesteps(),
            converged_steps,
            fully_converged: self.all_converged(),
            num_events: self.events.len(),
        }
    }

    /// Value-wise equality, ignoring the run id and generation stamp.
    /// Two runs of the same simulation must satisfy this exactly.
    pub fn values_equal(&self, other: &ResultsStore) -> bool {
        self.times == other.times
            && self.converged == other.converged
            && self.node_names == other.node_names
            && self.link_names == other.link_names
            && self.node_demand == other.node_demand
            && self.node_head == other.node_head
            && self.node_pressure == other.node_pressure
            && self.link_flowrate == other.link_flowrate
            && self.link_velocity == other.link_velocity
    }
}
