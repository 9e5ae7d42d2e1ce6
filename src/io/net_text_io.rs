use std::collections::HashMap;
use std::fs;

use crate::controls::{
    Comparison, ConditionalControl, ControlAction, ControlEnum, MonitoredSource, TargetAttribute,
    TimeControl, TimeFlag,
};
use crate::network::{CurveType, DemandModel, LinkStatus, NodeEnum, ValveType, WaterNetwork};

/*
Section-based text reader for network descriptions. The format mirrors
the classic water-network input layout: `[SECTION]` headers followed by
whitespace-separated rows, with `;` and `#` starting comments. All
values are SI (m, m3/s, s). Only the Hazen-Williams head-loss formula
is accepted; asking for another one is a fatal input error.

Recognised sections:

    [TITLE] [OPTIONS] [TIMES] [PATTERNS] [CURVES]
    [JUNCTIONS] [RESERVOIRS] [TANKS]
    [PIPES] [PUMPS] [VALVES]
    [CONTROLS] [COORDINATES]
 */

struct Row {
    line: usize,
    tokens: Vec<String>,
}

pub fn read_network_file(path: &str) -> Result<WaterNetwork, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Could not read '{}': {}", path, e))?;
    read_network_string(&content)
}

pub fn read_network_string(content: &str) -> Result<WaterNetwork, String> {
    let sections = split_sections(content)?;

    let known = [
        "TITLE",
        "OPTIONS",
        "TIMES",
        "PATTERNS",
        "CURVES",
        "JUNCTIONS",
        "RESERVOIRS",
        "TANKS",
        "PIPES",
        "PUMPS",
        "VALVES",
        "CONTROLS",
        "COORDINATES",
    ];
    for name in sections.keys() {
        if !known.contains(&name.as_str()) {
            return Err(format!("Unknown section [{}]", name));
        }
    }

    let mut network = WaterNetwork::new("network");

    if let Some(rows) = sections.get("TITLE") {
        if let Some(row) = rows.first() {
            network.name = row.tokens.join(" ");
        }
    }

    if let Some(rows) = sections.get("OPTIONS") {
        parse_options(&mut network, rows)?;
    }
    if let Some(rows) = sections.get("TIMES") {
        parse_times(&mut network, rows)?;
    }
    if let Some(rows) = sections.get("PATTERNS") {
        parse_patterns(&mut network, rows)?;
    }
    if let Some(rows) = sections.get("CURVES") {
        parse_curves(&mut network, rows)?;
    }

    if let Some(rows) = sections.get("JUNCTIONS") {
        for row in rows {
            expect_tokens(row, 3, "JUNCTIONS", "name elevation base_demand [pattern]")?;
            let pattern = row.tokens.get(3).map(|s| s.as_str());
            network
                .add_junction(
                    &row.tokens[0],
                    parse_f64(row, 1)?,
                    parse_f64(row, 2)?,
                    pattern,
                )
                .map_err(|e| at_line(row.line, e))?;
        }
    }
    if let Some(rows) = sections.get("RESERVOIRS") {
        for row in rows {
            expect_tokens(row, 2, "RESERVOIRS", "name base_head [pattern]")?;
            let pattern = row.tokens.get(2).map(|s| s.as_str());
            network
                .add_reservoir(&row.tokens[0], parse_f64(row, 1)?, pattern)
                .map_err(|e| at_line(row.line, e))?;
        }
    }
    if let Some(rows) = sections.get("TANKS") {
        for row in rows {
            expect_tokens(
                row,
                7,
                "TANKS",
                "name elevation init_level min_level max_level diameter min_vol [vol_curve]",
            )?;
            let vol_curve = row.tokens.get(7).map(|s| s.as_str());
            network
                .add_tank(
                    &row.tokens[0],
                    parse_f64(row, 1)?,
                    parse_f64(row, 2)?,
                    parse_f64(row, 3)?,
                    parse_f64(row, 4)?,
                    parse_f64(row, 5)?,
                    parse_f64(row, 6)?,
                    vol_curve,
                )
                .map_err(|e| at_line(row.line, e))?;
        }
    }

    if let Some(rows) = sections.get("PIPES") {
        for row in rows {
            expect_tokens(
                row,
                7,
                "PIPES",
                "name start end length diameter roughness minor_loss [status]",
            )?;
            let status = match row.tokens.get(7) {
                Some(s) => LinkStatus::from_str(s)
                    .ok_or_else(|| format!("Line {}: unknown pipe status '{}'", row.line, s))?,
                None => LinkStatus::Open,
            };
            network
                .add_pipe(
                    &row.tokens[0],
                    &row.tokens[1],
                    &row.tokens[2],
                    parse_f64(row, 3)?,
                    parse_f64(row, 4)?,
                    parse_f64(row, 5)?,
                    parse_f64(row, 6)?,
                    status,
                )
                .map_err(|e| at_line(row.line, e))?;
        }
    }
    if let Some(rows) = sections.get("PUMPS") {
        for row in rows {
            expect_tokens(row, 4, "PUMPS", "name start end head_curve")?;
            network
                .add_pump(&row.tokens[0], &row.tokens[1], &row.tokens[2], &row.tokens[3])
                .map_err(|e| at_line(row.line, e))?;
        }
    }
    if let Some(rows) = sections.get("VALVES") {
        for row in rows {
            expect_tokens(row, 7, "VALVES", "name start end diameter type setting minor_loss")?;
            let valve_type = ValveType::from_str(&row.tokens[4])
                .ok_or_else(|| format!("Line {}: unknown valve type '{}'", row.line, row.tokens[4]))?;
            network
                .add_valve(
                    &row.tokens[0],
                    &row.tokens[1],
                    &row.tokens[2],
                    parse_f64(row, 3)?,
                    valve_type,
                    parse_f64(row, 5)?,
                    parse_f64(row, 6)?,
                )
                .map_err(|e| at_line(row.line, e))?;
        }
    }

    if let Some(rows) = sections.get("CONTROLS") {
        for row in rows {
            let control = parse_control(&network, row)?;
            network.add_control(control);
        }
    }
    if let Some(rows) = sections.get("COORDINATES") {
        for row in rows {
            expect_tokens(row, 3, "COORDINATES", "node x y")?;
            network
                .set_coordinates(&row.tokens[0], parse_f64(row, 1)?, parse_f64(row, 2)?)
                .map_err(|e| at_line(row.line, e))?;
        }
    }

    network.validate().map_err(String::from)?;
    Ok(network)
}

fn split_sections(content: &str) -> Result<HashMap<String, Vec<Row>>, String> {
    let mut sections: HashMap<String, Vec<Row>> = HashMap::new();
    let mut current: Option<String> = None;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;

        // Strip comments
        let mut line = raw_line;
        if let Some(pos) = line.find(|c| c == ';' || c == '#') {
            line = &line[..pos];
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            let name = trimmed[1..trimmed.len() - 1].trim().to_ascii_uppercase();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let tokens: Vec<String> = trimmed.split_whitespace().map(|s| s.to_string()).collect();
        match &current {
            Some(section) => {
                if let Some(rows) = sections.get_mut(section) {
                    rows.push(Row { line: line_no, tokens });
                }
            }
            None => {
                return Err(format!("Line {}: data before the first [SECTION] header", line_no));
            }
        }
    }
    Ok(sections)
}

fn parse_options(network: &mut WaterNetwork, rows: &[Row]) -> Result<(), String> {
    for row in rows {
        expect_tokens(row, 2, "OPTIONS", "key value")?;
        let key = row.tokens[0].to_ascii_uppercase();
        let value = row.tokens[1].to_ascii_uppercase();
        match key.as_str() {
            "UNITS" => {
                if value != "SI" {
                    return Err(format!(
                        "Line {}: unsupported units '{}' (only SI is supported)",
                        row.line, value
                    ));
                }
            }
            "HEADLOSS" => {
                if value != "H-W" && value != "HW" && value != "HAZEN-WILLIAMS" {
                    return Err(format!(
                        "Line {}: unsupported head-loss formula '{}' (only Hazen-Williams)",
                        row.line, value
                    ));
                }
            }
            "DEMAND_MODEL" => {
                network.options.demand_model = match value.as_str() {
                    "DD" | "DEMAND_DRIVEN" => DemandModel::DemandDriven,
                    "PDD" | "PRESSURE_DRIVEN" => DemandModel::PressureDriven,
                    _ => {
                        return Err(format!(
                            "Line {}: unknown demand model '{}'",
                            row.line, value
                        ))
                    }
                };
            }
            _ => return Err(format!("Line {}: unknown option '{}'", row.line, key)),
        }
    }
    Ok(())
}

fn parse_times(network: &mut WaterNetwork, rows: &[Row]) -> Result<(), String> {
    for row in rows {
        expect_tokens(row, 2, "TIMES", "key seconds")?;
        let key = row.tokens[0].to_ascii_uppercase();
        let value: u64 = row.tokens[1]
            .parse()
            .map_err(|_| format!("Line {}: invalid time '{}'", row.line, row.tokens[1]))?;
        match key.as_str() {
            "DURATION" => network.options.duration_sec = value,
            "HYDRAULIC_TIMESTEP" => network.options.hydraulic_step_sec = value,
            "PATTERN_TIMESTEP" => network.options.pattern_step_sec = value,
            "PATTERN_START" => network.options.pattern_start_sec = value,
            "START_CLOCKTIME" => network.options.start_clocktime_sec = value,
            _ => return Err(format!("Line {}: unknown time parameter '{}'", row.line, key)),
        }
    }
    Ok(())
}

fn parse_patterns(network: &mut WaterNetwork, rows: &[Row]) -> Result<(), String> {
    // Rows with the same pattern name accumulate, in file order
    let mut order: Vec<String> = vec![];
    let mut multipliers: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        expect_tokens(row, 2, "PATTERNS", "name multiplier...")?;
        let name = row.tokens[0].clone();
        if !multipliers.contains_key(&name) {
            order.push(name.clone());
            multipliers.insert(name.clone(), vec![]);
        }
        for i in 1..row.tokens.len() {
            let value = parse_f64(row, i)?;
            if let Some(values) = multipliers.get_mut(&name) {
                values.push(value);
            }
        }
    }
    for name in order {
        let values = multipliers.remove(&name).unwrap_or_default();
        network.add_pattern(&name, values).map_err(String::from)?;
    }
    Ok(())
}

fn parse_curves(network: &mut WaterNetwork, rows: &[Row]) -> Result<(), String> {
    let mut order: Vec<String> = vec![];
    let mut types: HashMap<String, CurveType> = HashMap::new();
    let mut points: HashMap<String, Vec<(f64, f64)>> = HashMap::new();
    for row in rows {
        expect_tokens(row, 4, "CURVES", "name type x y")?;
        let name = row.tokens[0].clone();
        let curve_type = CurveType::from_str(&row.tokens[1])
            .ok_or_else(|| format!("Line {}: unknown curve type '{}'", row.line, row.tokens[1]))?;
        match types.get(&name) {
            Some(existing) if *existing != curve_type => {
                return Err(format!(
                    "Line {}: curve '{}' declared with conflicting types",
                    row.line, name
                ));
            }
            Some(_) => {}
            None => {
                order.push(name.clone());
                types.insert(name.clone(), curve_type);
                points.insert(name.clone(), vec![]);
            }
        }
        let x = parse_f64(row, 2)?;
        let y = parse_f64(row, 3)?;
        if let Some(values) = points.get_mut(&name) {
            values.push((x, y));
        }
    }
    for name in order {
        let curve_type = types[&name];
        let values = points.remove(&name).unwrap_or_default();
        network.add_curve(&name, curve_type, values).map_err(String::from)?;
    }
    Ok(())
}

/*
Control rows:

    LINK <link> <action> AT TIME <sec> [DAILY] [PRIORITY <n>]
    LINK <link> <action> AT CLOCKTIME <sec> [DAILY] [PRIORITY <n>]
    LINK <link> <action> IF NODE <node> ABOVE|BELOW <value> [PRIORITY <n>]

where <action> is OPEN, CLOSED, SPEED <v> or SETTING <v>. Thresholds on
tanks compare against the water level, on junctions against pressure,
on reservoirs against head.
 */
fn parse_control(network: &WaterNetwork, row: &Row) -> Result<ControlEnum, String> {
    let tokens = &row.tokens;
    if tokens.len() < 5 || tokens[0].to_ascii_uppercase() != "LINK" {
        return Err(format!(
            "Line {}: controls must start with 'LINK <name> <action>'",
            row.line
        ));
    }
    let link_id = network
        .link_id(&tokens[1])
        .ok_or_else(|| format!("Line {}: unknown link '{}'", row.line, tokens[1]))?;

    let (attribute, mut idx) = match tokens[2].to_ascii_uppercase().as_str() {
        "OPEN" => (TargetAttribute::Status(LinkStatus::Open), 3),
        "CLOSED" => (TargetAttribute::Status(LinkStatus::Closed), 3),
        "SPEED" => {
            let value = parse_f64(row, 3)?;
            (TargetAttribute::PumpSpeed(value), 4)
        }
        "SETTING" => {
            let value = parse_f64(row, 3)?;
            (TargetAttribute::ValveSetting(value), 4)
        }
        other => {
            return Err(format!("Line {}: unknown control action '{}'", row.line, other));
        }
    };
    let action = ControlAction::new(link_id, attribute);

    let keyword = tokens
        .get(idx)
        .map(|s| s.to_ascii_uppercase())
        .unwrap_or_default();
    idx += 1;

    match keyword.as_str() {
        "AT" => {
            let flag = match tokens.get(idx).map(|s| s.to_ascii_uppercase()).as_deref() {
                Some("TIME") => TimeFlag::SimTime,
                Some("CLOCKTIME") => TimeFlag::ShiftedTime,
                _ => {
                    return Err(format!(
                        "Line {}: expected TIME or CLOCKTIME after AT",
                        row.line
                    ))
                }
            };
            idx += 1;
            let trigger = parse_f64(row, idx)?;
            idx += 1;
            let mut daily = false;
            if tokens.get(idx).map(|s| s.to_ascii_uppercase()).as_deref() == Some("DAILY") {
                daily = true;
                idx += 1;
            }
            let mut control = TimeControl::new(trigger, flag, daily, action);
            control.priority = parse_priority(row, idx)?;
            Ok(ControlEnum::Time(control))
        }
        "IF" => {
            if tokens.get(idx).map(|s| s.to_ascii_uppercase()).as_deref() != Some("NODE") {
                return Err(format!("Line {}: expected NODE after IF", row.line));
            }
            idx += 1;
            let node_name = tokens
                .get(idx)
                .ok_or_else(|| format!("Line {}: missing node name", row.line))?;
            let node_id = network
                .node_id(node_name)
                .ok_or_else(|| format!("Line {}: unknown node '{}'", row.line, node_name))?;
            let source = match &network.nodes[node_id] {
                NodeEnum::Tank(_) => MonitoredSource::TankLevel(node_id),
                NodeEnum::Junction(_) => MonitoredSource::NodePressure(node_id),
                NodeEnum::Reservoir(_) => MonitoredSource::NodeHead(node_id),
            };
            idx += 1;
            let comparison = match tokens.get(idx).map(|s| s.to_ascii_uppercase()).as_deref() {
                Some("ABOVE") => Comparison::Greater,
                Some("BELOW") => Comparison::Less,
                _ => {
                    return Err(format!(
                        "Line {}: expected ABOVE or BELOW in conditional control",
                        row.line
                    ))
                }
            };
            idx += 1;
            let threshold = parse_f64(row, idx)?;
            idx += 1;
            let mut control = ConditionalControl::new(source, comparison, threshold, action);
            control.priority = parse_priority(row, idx)?;
            Ok(ControlEnum::Conditional(control))
        }
        other => Err(format!(
            "Line {}: expected AT or IF in control, found '{}'",
            row.line, other
        )),
    }
}

fn parse_priority(row: &Row, idx: usize) -> Result<i32, String> {
    match row.tokens.get(idx).map(|s| s.to_ascii_uppercase()).as_deref() {
        Some("PRIORITY") => {
            let value = row
                .tokens
                .get(idx + 1)
                .and_then(|s| s.parse::<i32>().ok())
                .ok_or_else(|| format!("Line {}: invalid PRIORITY value", row.line))?;
            Ok(value)
        }
        Some(other) => Err(format!(
            "Line {}: unexpected trailing token '{}'",
            row.line, other
        )),
        None => Ok(0),
    }
}

fn expect_tokens(row: &Row, minimum: usize, section: &str, usage: &str) -> Result<(), String> {
    if row.tokens.len() < minimum {
        return Err(format!(
            "Line {}: [{}] rows need at least {} fields: {}",
            row.line, section, minimum, usage
        ));
    }
    Ok(())
}

fn parse_f64(row: &Row, idx: usize) -> Result<f64, String> {
    let token = row
        .tokens
        .get(idx)
        .ok_or_else(|| format!("Line {}: missing numeric field {}", row.line, idx + 1))?;
    token
        .parse::<f64>()
        .map_err(|_| format!("Line {}: invalid number '{}'", row.line, token))
}

fn at_line(line: usize, error: crate::network::NetworkError) -> String {
    format!("Line {}: {}", line, String::from(error))
}
