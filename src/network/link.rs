#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Open,
    Closed,
    /// Open, but flow is only permitted in the start->end direction.
    /// Valid on pipes only.
    CheckValve,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Open => "Open",
            LinkStatus::Closed => "Closed",
            LinkStatus::CheckValve => "CV",
        }
    }

    pub fn from_str(s: &str) -> Option<LinkStatus> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Some(LinkStatus::Open),
            "CLOSED" => Some(LinkStatus::Closed),
            "CV" => Some(LinkStatus::CheckValve),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValveType {
    Prv,
    Psv,
    Pbv,
    Fcv,
    Tcv,
    Gpv,
}

impl ValveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValveType::Prv => "PRV",
            ValveType::Psv => "PSV",
            ValveType::Pbv => "PBV",
            ValveType::Fcv => "FCV",
            ValveType::Tcv => "TCV",
            ValveType::Gpv => "GPV",
        }
    }

    pub fn from_str(s: &str) -> Option<ValveType> {
        match s.to_ascii_uppercase().as_str() {
            "PRV" => Some(ValveType::Prv),
            "PSV" => Some(ValveType::Psv),
            "PBV" => Some(ValveType::Pbv),
            "FCV" => Some(ValveType::Fcv),
            "TCV" => Some(ValveType::Tcv),
            "GPV" => Some(ValveType::Gpv),
            _ => None,
        }
    }
}

/*
Links refer to their end nodes by integer id (index into the network's
node vector). Names are resolved once, when the link is added.
 */
#[derive(Clone, Debug)]
pub struct Pipe {
    pub name: String,
    pub start_node: usize,
    pub end_node: usize,
    pub length: f64,
    pub diameter: f64,
    /// Hazen-Williams roughness coefficient.
    pub roughness: f64,
    pub minor_loss: f64,
    pub base_status: LinkStatus,
    pub status: LinkStatus,
}

#[derive(Clone, Debug)]
pub struct Pump {
    pub name: String,
    pub start_node: usize,
    pub end_node: usize,
    pub curve_name: String,
    pub base_status: LinkStatus,
    pub status: LinkStatus,
    pub base_speed: f64,
    pub speed: f64,
    /// A pump in outage contributes no head and passes no flow.
    pub outage: bool,
}

#[derive(Clone, Debug)]
pub struct Valve {
    pub name: String,
    pub start_node: usize,
    pub end_node: usize,
    pub diameter: f64,
    pub valve_type: ValveType,
    pub setting: f64,
    pub minor_loss: f64,
    pub base_status: LinkStatus,
    pub status: LinkStatus,
}

#[derive(Clone, Debug)]
pub enum LinkEnum {
    Pipe(Pipe),
    Pump(Pump),
    Valve(Valve),
}

impl LinkEnum {
    pub fn name(&self) -> &str {
        match self {
            LinkEnum::Pipe(link) => &link.name,
            LinkEnum::Pump(link) => &link.name,
            LinkEnum::Valve(link) => &link.name,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LinkEnum::Pipe(_) => "pipe",
            LinkEnum::Pump(_) => "pump",
            LinkEnum::Valve(_) => "valve",
        }
    }

    pub fn start_node(&self) -> usize {
        match self {
            LinkEnum::Pipe(link) => link.start_node,
            LinkEnum::Pump(link) => link.start_node,
            LinkEnum::Valve(link) => link.start_node,
        }
    }

    pub fn end_node(&self) -> usize {
        match self {
            LinkEnum::Pipe(link) => link.end_node,
            LinkEnum::Pump(link) => link.end_node,
            LinkEnum::Valve(link) => link.end_node,
        }
    }

    pub fn status(&self) -> LinkStatus {
        match self {
            LinkEnum::Pipe(link) => link.status,
            LinkEnum::Pump(link) => link.status,
            LinkEnum::Valve(link) => link.status,
        }
    }

    pub fn set_status(&mut self, status: LinkStatus) {
        match self {
            LinkEnum::Pipe(link) => link.status = status,
            LinkEnum::Pump(link) => link.status = status,
            LinkEnum::Valve(link) => link.status = status,
        }
    }

    pub fn base_status(&self) -> LinkStatus {
        match self {
            LinkEnum::Pipe(link) => link.base_status,
            LinkEnum::Pump(link) => link.base_status,
            LinkEnum::Valve(link) => link.base_status,
        }
    }

    pub fn as_pipe(&self) -> Option<&Pipe> {
        match self {
            LinkEnum::Pipe(link) => Some(link),
            _ => None,
        }
    }

    pub fn as_pump(&self) -> Option<&Pump> {
        match self {
            LinkEnum::Pump(link) => Some(link),
            _ => None,
        }
    }

    pub fn as_pump_mut(&mut self) -> Option<&mut Pump> {
        match self {
            LinkEnum::Pump(link) => Some(link),
            _ => None,
        }
    }

    pub fn as_valve(&self) -> Option<&Valve> {
        match self {
            LinkEnum::Valve(link) => Some(link),
            _ => None,
        }
    }

    /// Diameter used for the velocity calculation; pumps have none.
    pub fn diameter(&self) -> Option<f64> {
        match self {
            LinkEnum::Pipe(link) => Some(link.diameter),
            LinkEnum::Valve(link) => Some(link.diameter),
            LinkEnum::Pump(_) => None,
        }
    }
}
