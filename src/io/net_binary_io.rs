use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use chrono::{DateTime, TimeZone, Utc};

use crate::controls::{
    Comparison, ConditionalControl, ControlAction, ControlEnum, MonitoredSource, TargetAttribute,
    TimeControl, TimeFlag,
};
use crate::network::{CurveType, DemandModel, LinkEnum, LinkStatus, NodeEnum, ValveType, WaterNetwork};

const MAGIC: [u8; 4] = *b"AQNB";
const FORMAT_VERSION: u16 = 1;

#[derive(Debug)]
pub enum NetBinaryError {
    IoError(std::io::Error),
    ParseError(String),
    UnsupportedVersion(u16),
}

impl std::fmt::Display for NetBinaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetBinaryError::IoError(e) => write!(f, "IO error: {}", e),
            NetBinaryError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            NetBinaryError::UnsupportedVersion(v) => write!(f, "Unsupported format version: {}", v),
        }
    }
}

impl std::error::Error for NetBinaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetBinaryError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NetBinaryError {
    fn from(error: std::io::Error) -> Self {
        NetBinaryError::IoError(error)
    }
}

impl From<NetBinaryError> for String {
    fn from(error: NetBinaryError) -> Self {
        error.to_string()
    }
}

/// Header metadata available without decoding the whole model.
#[derive(Debug, Clone)]
pub struct NetFileInfo {
    pub name: String,
    pub created: DateTime<Utc>,
    pub num_nodes: usize,
    pub num_links: usize,
}

/*
Single-file binary encoding of a complete network model: magic +
version header, creation timestamp, options, then patterns, curves,
nodes, links, controls and coordinates. Scalars are big-endian;
strings are u32-length-prefixed UTF-8. Links and control targets are
stored by component name so the file does not depend on internal id
assignment.
 */
pub fn write_network(path: &str, network: &WaterNetwork) -> Result<(), NetBinaryError> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    w.write_all(&MAGIC)?;
    write_u16(&mut w, FORMAT_VERSION)?;
    write_i64(&mut w, Utc::now().timestamp())?;
    write_string(&mut w, &network.name)?;

    // Options
    write_u64(&mut w, network.options.duration_sec)?;
    write_u64(&mut w, network.options.hydraulic_step_sec)?;
    write_u64(&mut w, network.options.pattern_step_sec)?;
    write_u64(&mut w, network.options.pattern_start_sec)?;
    write_u64(&mut w, network.options.start_clocktime_sec)?;
    write_u8(
        &mut w,
        match network.options.demand_model {
            DemandModel::DemandDriven => 0,
            DemandModel::PressureDriven => 1,
        },
    )?;

    // Patterns
    write_u32(&mut w, network.patterns.len() as u32)?;
    for pattern in &network.patterns {
        write_string(&mut w, &pattern.name)?;
        write_u32(&mut w, pattern.multipliers.len() as u32)?;
        for &m in &pattern.multipliers {
            write_f64(&mut w, m)?;
        }
    }

    // Curves
    write_u32(&mut w, network.curves.len() as u32)?;
    for curve in &network.curves {
        write_string(&mut w, &curve.name)?;
        write_u8(
            &mut w,
            match curve.curve_type {
                CurveType::Head => 0,
                CurveType::Volume => 1,
                CurveType::Efficiency => 2,
                CurveType::Headloss => 3,
            },
        )?;
        write_u32(&mut w, curve.points.len() as u32)?;
        for &(x, y) in &curve.points {
            write_f64(&mut w, x)?;
            write_f64(&mut w, y)?;
        }
    }

    // Nodes
    write_u32(&mut w, network.nodes.len() as u32)?;
    for node in &network.nodes {
        match node {
            NodeEnum::Junction(junction) => {
                write_u8(&mut w, 0)?;
                write_string(&mut w, &junction.name)?;
                write_f64(&mut w, junction.elevation)?;
                write_f64(&mut w, junction.base_demand)?;
                write_opt_string(&mut w, &junction.demand_pattern)?;
                write_f64(&mut w, junction.minimum_pressure)?;
                write_f64(&mut w, junction.nominal_pressure)?;
            }
            NodeEnum::Reservoir(reservoir) => {
                write_u8(&mut w, 1)?;
                write_string(&mut w, &reservoir.name)?;
                write_f64(&mut w, reservoir.base_head)?;
                write_opt_string(&mut w, &reservoir.head_pattern)?;
            }
            NodeEnum::Tank(tank) => {
                write_u8(&mut w, 2)?;
                write_string(&mut w, &tank.name)?;
                write_f64(&mut w, tank.elevation)?;
                write_f64(&mut w, tank.init_level)?;
                write_f64(&mut w, tank.min_level)?;
                write_f64(&mut w, tank.max_level)?;
                write_f64(&mut w, tank.diameter)?;
                write_f64(&mut w, tank.min_vol)?;
                write_opt_string(&mut w, &tank.vol_curve)?;
            }
        }
    }

    // Links; end nodes by name
    write_u32(&mut w, network.links.len() as u32)?;
    for link in &network.links {
        match link {
            LinkEnum::Pipe(pipe) => {
                write_u8(&mut w, 0)?;
                write_string(&mut w, &pipe.name)?;
                write_string(&mut w, network.nodes[pipe.start_node].name())?;
                write_string(&mut w, network.nodes[pipe.end_node].name())?;
                write_f64(&mut w, pipe.length)?;
                write_f64(&mut w, pipe.diameter)?;
                write_f64(&mut w, pipe.roughness)?;
                write_f64(&mut w, pipe.minor_loss)?;
                write_u8(&mut w, encode_status(pipe.base_status))?;
            }
            LinkEnum::Pump(pump) => {
                write_u8(&mut w, 1)?;
                write_string(&mut w, &pump.name)?;
                write_string(&mut w, network.nodes[pump.start_node].name())?;
                write_string(&mut w, network.nodes[pump.end_node].name())?;
                write_string(&mut w, &pump.curve_name)?;
                write_f64(&mut w, pump.base_speed)?;
            }
            LinkEnum::Valve(valve) => {
                write_u8(&mut w, 2)?;
                write_string(&mut w, &valve.name)?;
                write_string(&mut w, network.nodes[valve.start_node].name())?;
                write_string(&mut w, network.nodes[valve.end_node].name())?;
                write_f64(&mut w, valve.diameter)?;
                write_u8(&mut w, encode_valve_type(valve.valve_type))?;
                write_f64(&mut w, valve.setting)?;
                write_f64(&mut w, valve.minor_loss)?;
            }
        }
    }

    // Controls
    write_u32(&mut w, network.controls.len() as u32)?;
    for control in &network.controls {
        match control {
            ControlEnum::Time(tc) => {
                write_u8(&mut w, 0)?;
                write_action(&mut w, network, &tc.action)?;
                write_f64(&mut w, tc.trigger_sec)?;
                write_u8(&mut w, if tc.time_flag == TimeFlag::SimTime { 0 } else { 1 })?;
                write_u8(&mut w, if tc.daily { 1 } else { 0 })?;
                write_i32(&mut w, tc.priority)?;
            }
            ControlEnum::Conditional(cc) => {
                write_u8(&mut w, 1)?;
                write_action(&mut w, network, &cc.action)?;
                write_source(&mut w, network, &cc.source)?;
                write_u8(
                    &mut w,
                    match cc.comparison {
                        Comparison::Greater => 0,
                        Comparison::GreaterEqual => 1,
                        Comparison::Less => 2,
                        Comparison::LessEqual => 3,
                    },
                )?;
                write_f64(&mut w, cc.threshold)?;
                write_i32(&mut w, cc.priority)?;
            }
        }
    }

    // Coordinates
    let mut coords: Vec<(String, f64, f64)> = vec![];
    for node in &network.nodes {
        if let Some((x, y)) = network.coordinates(node.name()) {
            coords.push((node.name().to_string(), x, y));
        }
    }
    write_u32(&mut w, coords.len() as u32)?;
    for (name, x, y) in coords {
        write_string(&mut w, &name)?;
        write_f64(&mut w, x)?;
        write_f64(&mut w, y)?;
    }

    w.flush()?;
    Ok(())
}

/// Read back a network written by `write_network`.
pub fn read_network(path: &str) -> Result<WaterNetwork, NetBinaryError> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(NetBinaryError::ParseError(
            "Not a network binary file (bad magic)".to_string(),
        ));
    }
    let version = read_u16(&mut r)?;
    if version != FORMAT_VERSION {
        return Err(NetBinaryError::UnsupportedVersion(version));
    }
    let _created = read_i64(&mut r)?;
    let name = read_string(&mut r)?;

    let mut network = WaterNetwork::new(&name);
    network.options.duration_sec = read_u64(&mut r)?;
    network.options.hydraulic_step_sec = read_u64(&mut r)?;
    network.options.pattern_step_sec = read_u64(&mut r)?;
    network.options.pattern_start_sec = read_u64(&mut r)?;
    network.options.start_clocktime_sec = read_u64(&mut r)?;
    network.options.demand_model = match read_u8(&mut r)? {
        0 => DemandModel::DemandDriven,
        1 => DemandModel::PressureDriven,
        v => {
            return Err(NetBinaryError::ParseError(format!(
                "Unknown demand model tag {}",
                v
            )))
        }
    };

    let num_patterns = read_u32(&mut r)? as usize;
    for _ in 0..num_patterns {
        let pattern_name = read_string(&mut r)?;
        let count = read_u32(&mut r)? as usize;
        let mut multipliers = Vec::with_capacity(count);
        for _ in 0..count {
            multipliers.push(read_f64(&mut r)?);
        }
        network
            .add_pattern(&pattern_name, multipliers)
            .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
    }

    let num_curves = read_u32(&mut r)? as usize;
    for _ in 0..num_curves {
        let curve_name = read_string(&mut r)?;
        let curve_type = match read_u8(&mut r)? {
            0 => CurveType::Head,
            1 => CurveType::Volume,
            2 => CurveType::Efficiency,
            3 => CurveType::Headloss,
            v => {
                return Err(NetBinaryError::ParseError(format!(
                    "Unknown curve type tag {}",
                    v
                )))
            }
        };
        let count = read_u32(&mut r)? as usize;
        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let x = read_f64(&mut r)?;
            let y = read_f64(&mut r)?;
            points.push((x, y));
        }
        network
            .add_curve(&curve_name, curve_type, points)
            .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
    }

    let num_nodes = read_u32(&mut r)? as usize;
    for _ in 0..num_nodes {
        match read_u8(&mut r)? {
            0 => {
                let node_name = read_string(&mut r)?;
                let elevation = read_f64(&mut r)?;
                let base_demand = read_f64(&mut r)?;
                let pattern = read_opt_string(&mut r)?;
                let minimum_pressure = read_f64(&mut r)?;
                let nominal_pressure = read_f64(&mut r)?;
                let id = network
                    .add_junction(&node_name, elevation, base_demand, pattern.as_deref())
                    .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
                if let NodeEnum::Junction(junction) = &mut network.nodes[id] {
                    junction.minimum_pressure = minimum_pressure;
                    junction.nominal_pressure = nominal_pressure;
                }
            }
            1 => {
                let node_name = read_string(&mut r)?;
                let base_head = read_f64(&mut r)?;
                let pattern = read_opt_string(&mut r)?;
                network
                    .add_reservoir(&node_name, base_head, pattern.as_deref())
                    .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
            }
            2 => {
                let node_name = read_string(&mut r)?;
                let elevation = read_f64(&mut r)?;
                let init_level = read_f64(&mut r)?;
                let min_level = read_f64(&mut r)?;
                let max_level = read_f64(&mut r)?;
                let diameter = read_f64(&mut r)?;
                let min_vol = read_f64(&mut r)?;
                let vol_curve = read_opt_string(&mut r)?;
                network
                    .add_tank(
                        &node_name,
                        elevation,
                        init_level,
                        min_level,
                        max_level,
                        diameter,
                        min_vol,
                        vol_curve.as_deref(),
                    )
                    .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
            }
            v => {
                return Err(NetBinaryError::ParseError(format!(
                    "Unknown node tag {}",
                    v
                )))
            }
        }
    }

    let num_links = read_u32(&mut r)? as usize;
    for _ in 0..num_links {
        match read_u8(&mut r)? {
            0 => {
                let link_name = read_string(&mut r)?;
                let start = read_string(&mut r)?;
                let end = read_string(&mut r)?;
                let length = read_f64(&mut r)?;
                let diameter = read_f64(&mut r)?;
                let roughness = read_f64(&mut r)?;
                let minor_loss = read_f64(&mut r)?;
                let status = decode_status(read_u8(&mut r)?)?;
                network
                    .add_pipe(
                        &link_name, &start, &end, length, diameter, roughness, minor_loss, status,
                    )
                    .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
            }
            1 => {
                let link_name = read_string(&mut r)?;
                let start = read_string(&mut r)?;
                let end = read_string(&mut r)?;
                let curve_name = read_string(&mut r)?;
                let base_speed = read_f64(&mut r)?;
                let id = network
                    .add_pump(&link_name, &start, &end, &curve_name)
                    .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
                if let Some(pump) = network.links[id].as_pump_mut() {
                    pump.base_speed = base_speed;
                    pump.speed = base_speed;
                }
            }
            2 => {
                let link_name = read_string(&mut r)?;
                let start = read_string(&mut r)?;
                let end = read_string(&mut r)?;
                let diameter = read_f64(&mut r)?;
                let valve_type = decode_valve_type(read_u8(&mut r)?)?;
                let setting = read_f64(&mut r)?;
                let minor_loss = read_f64(&mut r)?;
                network
                    .add_valve(
                        &link_name, &start, &end, diameter, valve_type, setting, minor_loss,
                    )
                    .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
            }
            v => {
                return Err(NetBinaryError::ParseError(format!(
                    "Unknown link tag {}",
                    v
                )))
            }
        }
    }

    let num_controls = read_u32(&mut r)? as usize;
    for _ in 0..num_controls {
        match read_u8(&mut r)? {
            0 => {
                let action = read_action(&mut r, &network)?;
                let trigger = read_f64(&mut r)?;
                let flag = if read_u8(&mut r)? == 0 {
                    TimeFlag::SimTime
                } else {
                    TimeFlag::ShiftedTime
                };
                let daily = read_u8(&mut r)? != 0;
                let priority = read_i32(&mut r)?;
                let mut control = TimeControl::new(trigger, flag, daily, action);
                control.priority = priority;
                network.add_control(ControlEnum::Time(control));
            }
            1 => {
                let action = read_action(&mut r, &network)?;
                let source = read_source(&mut r, &network)?;
                let comparison = match read_u8(&mut r)? {
                    0 => Comparison::Greater,
                    1 => Comparison::GreaterEqual,
                    2 => Comparison::Less,
                    3 => Comparison::LessEqual,
                    v => {
                        return Err(NetBinaryError::ParseError(format!(
                            "Unknown comparison tag {}",
                            v
                        )))
                    }
                };
                let threshold = read_f64(&mut r)?;
                let priority = read_i32(&mut r)?;
                let mut control = ConditionalControl::new(source, comparison, threshold, action);
                control.priority = priority;
                network.add_control(ControlEnum::Conditional(control));
            }
            v => {
                return Err(NetBinaryError::ParseError(format!(
                    "Unknown control tag {}",
                    v
                )))
            }
        }
    }

    let num_coords = read_u32(&mut r)? as usize;
    for _ in 0..num_coords {
        let node_name = read_string(&mut r)?;
        let x = read_f64(&mut r)?;
        let y = read_f64(&mut r)?;
        network
            .set_coordinates(&node_name, x, y)
            .map_err(|e| NetBinaryError::ParseError(String::from(e)))?;
    }

    Ok(network)
}

/// Read the header without decoding the model body.
pub fn read_info(path: &str) -> Result<NetFileInfo, NetBinaryError> {
    let network = read_network(path)?;
    let file = File::open(path)?;
    let mut r = BufReader::new(file);
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    let _version = read_u16(&mut r)?;
    let created_sec = read_i64(&mut r)?;
    let created = match Utc.timestamp_opt(created_sec, 0) {
        chrono::LocalResult::Single(dt) => dt,
        _ => DateTime::<Utc>::UNIX_EPOCH,
    };
    Ok(NetFileInfo {
        name: network.name.clone(),
        created,
        num_nodes: network.num_nodes(),
        num_links: network.num_links(),
    })
}

//----------------------------------------------------------------------
// Field encoding
//----------------------------------------------------------------------

fn encode_status(status: LinkStatus) -> u8 {
    match status {
        LinkStatus::Open => 0,
        LinkStatus::Closed => 1,
        LinkStatus::CheckValve => 2,
    }
}

fn decode_status(tag: u8) -> Result<LinkStatus, NetBinaryError> {
    match tag {
        0 => Ok(LinkStatus::Open),
        1 => Ok(LinkStatus::Closed),
        2 => Ok(LinkStatus::CheckValve),
        v => Err(NetBinaryError::ParseError(format!(
            "Unknown link status tag {}",
            v
        ))),
    }
}

fn encode_valve_type(valve_type: ValveType) -> u8 {
    match valve_type {
        ValveType::Prv => 0,
        ValveType::Psv => 1,
        ValveType::Pbv => 2,
        ValveType::Fcv => 3,
        ValveType::Tcv => 4,
        ValveType::Gpv => 5,
    }
}

fn decode_valve_type(tag: u8) -> Result<ValveType, NetBinaryError> {
    match tag {
        0 => Ok(ValveType::Prv),
        1 => Ok(ValveType::Psv),
        2 => Ok(ValveType::Pbv),
        3 => Ok(ValveType::Fcv),
        4 => Ok(ValveType::Tcv),
        5 => Ok(ValveType::Gpv),
        v => Err(NetBinaryError::ParseError(format!(
            "Unknown valve type tag {}",
            v
        ))),
    }
}

fn write_action<W: Write>(
    w: &mut W,
    network: &WaterNetwork,
    action: &ControlAction,
) -> Result<(), NetBinaryError> {
    write_string(w, network.links[action.link_id].name())?;
    match action.attribute {
        TargetAttribute::Status(status) => {
            write_u8(w, 0)?;
            write_u8(w, encode_status(status))?;
        }
        TargetAttribute::PumpSpeed(speed) => {
            write_u8(w, 1)?;
            write_f64(w, speed)?;
        }
        TargetAttribute::PumpOutage(outage) => {
            write_u8(w, 2)?;
            write_u8(w, if outage { 1 } else { 0 })?;
        }
        TargetAttribute::ValveSetting(setting) => {
            write_u8(w, 3)?;
            write_f64(w, setting)?;
        }
    }
    Ok(())
}

fn read_action<R: Read>(
    r: &mut R,
    network: &WaterNetwork,
) -> Result<ControlAction, NetBinaryError> {
    let link_name = read_string(r)?;
    let link_id = network
        .link_id(&link_name)
        .ok_or_else(|| NetBinaryError::ParseError(format!("Unknown link '{}'", link_name)))?;
    let attribute = match read_u8(r)? {
        0 => TargetAttribute::Status(decode_status(read_u8(r)?)?),
        1 => TargetAttribute::PumpSpeed(read_f64(r)?),
        2 => TargetAttribute::PumpOutage(read_u8(r)? != 0),
        3 => TargetAttribute::ValveSetting(read_f64(r)?),
        v => {
            return Err(NetBinaryError::ParseError(format!(
                "Unknown action attribute tag {}",
                v
            )))
        }
    };
    Ok(ControlAction::new(link_id, attribute))
}

fn write_source<W: Write>(
    w: &mut W,
    network: &WaterNetwork,
    source: &MonitoredSource,
) -> Result<(), NetBinaryError> {
    match source {
        MonitoredSource::TankLevel(node_id) => {
            write_u8(w, 0)?;
            write_string(w, network.nodes[*node_id].name())?;
        }
        MonitoredSource::NodeHead(node_id) => {
            write_u8(w, 1)?;
            write_string(w, network.nodes[*node_id].name())?;
        }
        MonitoredSource::NodePressure(node_id) => {
            write_u8(w, 2)?;
            write_string(w, network.nodes[*node_id].name())?;
        }
        MonitoredSource::LinkFlow(link_id) => {
            write_u8(w, 3)?;
            write_string(w, network.links[*link_id].name())?;
        }
    }
    Ok(())
}

fn read_source<R: Read>(
    r: &mut R,
    network: &WaterNetwork,
) -> Result<MonitoredSource, NetBinaryError> {
    let tag = read_u8(r)?;
    let name = read_string(r)?;
    let source = match tag {
        0 | 1 | 2 => {
            let node_id = network
                .node_id(&name)
                .ok_or_else(|| NetBinaryError::ParseError(format!("Unknown node '{}'", name)))?;
            match tag {
                0 => MonitoredSource::TankLevel(node_id),
                1 => MonitoredSource::NodeHead(node_id),
                _ => MonitoredSource::NodePressure(node_id),
            }
        }
        3 => {
            let link_id = network
                .link_id(&name)
                .ok_or_else(|| NetBinaryError::ParseError(format!("Unknown link '{}'", name)))?;
            MonitoredSource::LinkFlow(link_id)
        }
        v => {
            return Err(NetBinaryError::ParseError(format!(
                "Unknown monitored source tag {}",
                v
            )))
        }
    };
    Ok(source)
}

//----------------------------------------------------------------------
// Scalar helpers (big-endian)
//----------------------------------------------------------------------

fn read_u8<R: Read>(r: &mut R) -> Result<u8, NetBinaryError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> Result<u16, NetBinaryError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, NetBinaryError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64, NetBinaryError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32, NetBinaryError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_i64<R: Read>(r: &mut R) -> Result<i64, NetBinaryError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> Result<f64, NetBinaryError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_be_bytes(buf))
}

fn read_string<R: Read>(r: &mut R) -> Result<String, NetBinaryError> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf)
        .map_err(|_| NetBinaryError::ParseError("Invalid UTF-8 in string field".to_string()))
}

fn read_opt_string<R: Read>(r: &mut R) -> Result<Option<String>, NetBinaryError> {
    if read_u8(r)? == 0 {
        Ok(None)
    } else {
        Ok(Some(read_string(r)?))
    }
}

fn write_u8<W: Write>(w: &mut W, value: u8) -> Result<(), NetBinaryError> {
    w.write_all(&[value])?;
    Ok(())
}

fn write_u16<W: Write>(w: &mut W, value: u16) -> Result<(), NetBinaryError> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> Result<(), NetBinaryError> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_u64<W: Write>(w: &mut W, value: u64) -> Result<(), NetBinaryError> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_i32<W: Write>(w: &mut W, value: i32) -> Result<(), NetBinaryError> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_i64<W: Write>(w: &mut W, value: i64) -> Result<(), NetBinaryError> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_f64<W: Write>(w: &mut W, value: f64) -> Result<(), NetBinaryError> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_string<W: Write>(w: &mut W, value: &str) -> Result<(), NetBinaryError> {
    write_u32(w, value.len() as u32)?;
    w.write_all(value.as_bytes())?;
    Ok(())
}

fn write_opt_string<W: Write>(w: &mut W, value: &Option<String>) -> Result<(), NetBinaryError> {
    match value {
        Some(s) => {
            write_u8(w, 1)?;
            write_string(w, s)?;
        }
        None => write_u8(w, 0)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{Comparison, MonitoredSource, TargetAttribute};
    use std::fs;

    fn sample_network() -> WaterNetwork {
        let mut network = WaterNetwork::new("binary_sample");
        network.options.duration_sec = 7200;
        network.options.hydraulic_step_sec = 3600;
        network.add_pattern("weekday", vec![1.0, 1.3, 0.7]).unwrap();
        network
            .add_curve("pump1", CurveType::Head, vec![(0.05, 40.0)])
            .unwrap();
        network.add_reservoir("source", 60.0, None).unwrap();
        network.add_junction("j1", 20.0, 0.01, Some("weekday")).unwrap();
        network
            .add_tank("t1", 30.0, 2.0, 0.0, 6.0, 12.0, 0.0, None)
            .unwrap();
        network
            .add_pipe("p1", "j1", "t1", 1000.0, 0.3, 130.0, 0.0, LinkStatus::Open)
            .unwrap();
        let pump_id = network.add_pump("pu1", "source", "j1", "pump1").unwrap();
        network
            .add_valve("v1", "t1", "j1", 0.25, ValveType::Tcv, 0.0, 2.5)
            .unwrap();
        network.set_coordinates("j1", 12.5, -3.0).unwrap();
        network.add_control(ControlEnum::Time(TimeControl::with_target(
            3600.0,
            TimeFlag::SimTime,
            false,
            pump_id,
            TargetAttribute::Status(LinkStatus::Closed),
        )));
        let tank_id = network.node_id("t1").unwrap();
        network.add_control(ControlEnum::Conditional(ConditionalControl::with_target(
            MonitoredSource::TankLevel(tank_id),
            Comparison::Greater,
            5.5,
            pump_id,
            TargetAttribute::Status(LinkStatus::Closed),
        )));
        network
    }

    #[test]
    fn test_round_trip_preserves_model() {
        let network = sample_network();
        let path = "/tmp/test_aquanet_roundtrip.aqnb";

        write_network(path, &network).unwrap();
        let reloaded = read_network(path).unwrap();

        assert_eq!(reloaded.name, network.name);
        assert_eq!(reloaded.num_nodes(), network.num_nodes());
        assert_eq!(reloaded.num_links(), network.num_links());
        assert_eq!(reloaded.patterns.len(), network.patterns.len());
        assert_eq!(reloaded.curves.len(), network.curves.len());
        assert_eq!(reloaded.controls.len(), network.controls.len());
        assert_eq!(reloaded.options.duration_sec, network.options.duration_sec);

        let original = network.node("t1").unwrap().as_tank().unwrap();
        let restored = reloaded.node("t1").unwrap().as_tank().unwrap();
        assert!((original.max_level - restored.max_level).abs() < 1e-9);
        assert!((original.diameter - restored.diameter).abs() < 1e-9);

        let original = network.link("p1").unwrap().as_pipe().unwrap();
        let restored = reloaded.link("p1").unwrap().as_pipe().unwrap();
        assert!((original.roughness - restored.roughness).abs() < 1e-9);
        assert_eq!(original.base_status, restored.base_status);
        assert_eq!(
            network.nodes[original.start_node].name(),
            reloaded.nodes[restored.start_node].name()
        );

        assert_eq!(reloaded.coordinates("j1"), Some((12.5, -3.0)));
        reloaded.validate().unwrap();

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_info_reads_header() {
        let network = sample_network();
        let path = "/tmp/test_aquanet_info.aqnb";

        write_network(path, &network).unwrap();
        let info = read_info(path).unwrap();
        assert_eq!(info.name, "binary_sample");
        assert_eq!(info.num_nodes, 3);
        assert_eq!(info.num_links, 3);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let path = "/tmp/test_aquanet_badmagic.aqnb";
        fs::write(path, b"NOPE0000").unwrap();
        assert!(read_network(path).is_err());
        let _ = fs::remove_file(path);
    }
}
