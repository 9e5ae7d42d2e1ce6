use serde_derive::{Deserialize, Serialize};

/// Head-loss relation used on pipes. Hazen-Williams is the only formula
/// the solver implements; requesting anything else is an input error at
/// the parsing layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadlossFormula {
    HazenWilliams,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandModel {
    /// Junction demands are met regardless of available pressure.
    DemandDriven,
    /// Junction demands scale with available pressure between the
    /// minimum and nominal pressures.
    PressureDriven,
}

/*
Simulation options. All times are in seconds, all hydraulic quantities
are SI internally (m, m3/s).
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimOptions {
    pub duration_sec: u64,
    pub hydraulic_step_sec: u64,
    pub pattern_step_sec: u64,
    pub pattern_start_sec: u64,
    /// Clock time at simulation start, as seconds past midnight on day 0.
    /// Used by SHIFTED_TIME controls.
    pub start_clocktime_sec: u64,
    pub headloss_formula: HeadlossFormula,
    pub demand_model: DemandModel,
}

impl Default for SimOptions {
    fn default() -> SimOptions {
        SimOptions {
            duration_sec: 0,
            hydraulic_step_sec: 3600,
            pattern_step_sec: 3600,
            pattern_start_sec: 0,
            start_clocktime_sec: 0,
            headloss_formula: HeadlossFormula::HazenWilliams,
            demand_model: DemandModel::DemandDriven,
        }
    }
}

impl SimOptions {
    /// Number of hydraulic timesteps in the run, including the t=0 step.
    pub fn num_timesteps(&self) -> usize {
        (self.duration_sec / self.hydraulic_step_sec.max(1)) as usize + 1
    }
}
