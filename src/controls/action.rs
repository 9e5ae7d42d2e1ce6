use crate::network::{LinkEnum, LinkStatus, WaterNetwork};

/// The attribute a control action writes, together with its new value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetAttribute {
    Status(LinkStatus),
    PumpSpeed(f64),
    PumpOutage(bool),
    ValveSetting(f64),
}

/*
A control action is a (target id, attribute, value) record. The target
is resolved against the network at fire time; holding the integer id
rather than a reference keeps controls free of lifetime entanglement
with the model they mutate.
 */
#[derive(Clone, Copy, Debug)]
pub struct ControlAction {
    pub link_id: usize,
    pub attribute: TargetAttribute,
}

impl ControlAction {
    pub fn new(link_id: usize, attribute: TargetAttribute) -> ControlAction {
        ControlAction { link_id, attribute }
    }

    /// Whether applying this action would change the network. Used to
    /// suppress re-firing a control whose condition stays true.
    pub fn would_change(&self, network: &WaterNetwork) -> bool {
        let link = &network.links[self.link_id];
        match self.attribute {
            TargetAttribute::Status(status) => link.status() != status,
            TargetAttribute::PumpSpeed(speed) => match link.as_pump() {
                Some(pump) => pump.speed != speed,
                None => false,
            },
            TargetAttribute::PumpOutage(outage) => match link.as_pump() {
                Some(pump) => pump.outage != outage,
                None => false,
            },
            TargetAttribute::ValveSetting(setting) => match link.as_valve() {
                Some(valve) => valve.setting != setting,
                None => false,
            },
        }
    }

    pub fn apply(&self, network: &mut WaterNetwork) {
        match self.attribute {
            TargetAttribute::Status(status) => network.set_link_status(self.link_id, status),
            TargetAttribute::PumpSpeed(speed) => {
                let _ = network.set_pump_speed(self.link_id, speed);
            }
            TargetAttribute::PumpOutage(outage) => {
                let _ = network.set_pump_outage(self.link_id, outage);
            }
            TargetAttribute::ValveSetting(setting) => {
                if let LinkEnum::Valve(valve) = &mut network.links[self.link_id] {
                    valve.setting = setting;
                }
            }
        }
    }

    /// Structural check used by network validation: the target must
    /// exist and the attribute must fit the target's kind.
    pub fn validate(&self, network: &WaterNetwork) -> Result<(), String> {
        if self.link_id >= network.num_links() {
            return Err(format!("Control action targets unknown link id {}", self.link_id));
        }
        let link = &network.links[self.link_id];
        match self.attribute {
            TargetAttribute::Status(LinkStatus::CheckValve) => {
                Err(format!(
                    "Control action on link '{}' cannot set check-valve status",
                    link.name()
                ))
            }
            TargetAttribute::Status(_) => Ok(()),
            TargetAttribute::PumpSpeed(_) | TargetAttribute::PumpOutage(_) => {
                if link.as_pump().is_some() {
                    Ok(())
                } else {
                    Err(format!("Control action on '{}': not a pump", link.name()))
                }
            }
            TargetAttribute::ValveSetting(_) => {
                if link.as_valve().is_some() {
                    Ok(())
                } else {
                    Err(format!("Control action on '{}': not a valve", link.name()))
                }
            }
        }
    }
}
