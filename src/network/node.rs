/// Default pressure (m) at which a junction receives its full demand in
/// pressure-driven mode.
pub const DEFAULT_NOMINAL_PRESSURE: f64 = 20.0;
/// Default pressure (m) below which a junction receives no water in
/// pressure-driven mode.
pub const DEFAULT_MINIMUM_PRESSURE: f64 = 0.0;

#[derive(Clone, Debug)]
pub struct Junction {
    pub name: String,
    pub elevation: f64,
    /// Base demand in m3/s; scaled by the demand pattern each step.
    pub base_demand: f64,
    pub demand_pattern: Option<String>,
    pub nominal_pressure: f64,
    pub minimum_pressure: f64,
}

impl Junction {
    pub fn new(
        name: &str,
        elevation: f64,
        base_demand: f64,
        demand_pattern: Option<&str>,
    ) -> Junction {
        Junction {
            name: name.to_string(),
            elevation,
            base_demand,
            demand_pattern: demand_pattern.map(|s| s.to_string()),
            nominal_pressure: DEFAULT_NOMINAL_PRESSURE,
            minimum_pressure: DEFAULT_MINIMUM_PRESSURE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Reservoir {
    pub name: String,
    /// Total head in m; the head pattern (if any) multiplies this.
    pub base_head: f64,
    pub head_pattern: Option<String>,
}

impl Reservoir {
    pub fn new(name: &str, base_head: f64, head_pattern: Option<&str>) -> Reservoir {
        Reservoir {
            name: name.to_string(),
            base_head,
            head_pattern: head_pattern.map(|s| s.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Tank {
    pub name: String,
    pub elevation: f64,
    pub init_level: f64,
    pub min_level: f64,
    pub max_level: f64,
    /// Diameter of the equivalent cylinder. The solver always integrates
    /// levels with the cylindrical relation; a volume curve, when given,
    /// refines the level<->volume accessors only.
    pub diameter: f64,
    pub min_vol: f64,
    pub vol_curve: Option<String>,
    /// Current water level above the tank bottom, updated by the driver.
    pub level: f64,
}

impl Tank {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        elevation: f64,
        init_level: f64,
        min_level: f64,
        max_level: f64,
        diameter: f64,
        min_vol: f64,
        vol_curve: Option<&str>,
    ) -> Tank {
        Tank {
            name: name.to_string(),
            elevation,
            init_level,
            min_level,
            max_level,
            diameter,
            min_vol,
            vol_curve: vol_curve.map(|s| s.to_string()),
            level: init_level,
        }
    }

    /// Free surface area of the equivalent cylinder (m2).
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.diameter * self.diameter / 4.0
    }

    /// Total head at the tank for a given level.
    pub fn head_at_level(&self, level: f64) -> f64 {
        self.elevation + level
    }
}

#[derive(Clone, Debug)]
pub enum NodeEnum {
    Junction(Junction),
    Reservoir(Reservoir),
    Tank(Tank),
}

impl NodeEnum {
    pub fn name(&self) -> &str {
        match self {
            NodeEnum::Junction(node) => &node.name,
            NodeEnum::Reservoir(node) => &node.name,
            NodeEnum::Tank(node) => &node.name,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NodeEnum::Junction(_) => "junction",
            NodeEnum::Reservoir(_) => "reservoir",
            NodeEnum::Tank(_) => "tank",
        }
    }

    pub fn as_junction(&self) -> Option<&Junction> {
        match self {
            NodeEnum::Junction(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_reservoir(&self) -> Option<&Reservoir> {
        match self {
            NodeEnum::Reservoir(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_tank(&self) -> Option<&Tank> {
        match self {
            NodeEnum::Tank(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_tank_mut(&mut self) -> Option<&mut Tank> {
        match self {
            NodeEnum::Tank(node) => Some(node),
            _ => None,
        }
    }

    /// Pressure at this node for a given total head. Reservoirs report
    /// zero pressure (their head is a boundary condition).
    pub fn pressure(&self, head: f64) -> f64 {
        match self {
            NodeEnum::Junction(node) => head - node.elevation,
            NodeEnum::Tank(node) => head - node.elevation,
            NodeEnum::Reservoir(_) => 0.0,
        }
    }
}
