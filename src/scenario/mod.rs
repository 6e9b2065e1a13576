pub mod catalog;
pub mod naming;
pub mod types;

pub use catalog::{configure, find_scenario, scenario_names, Scenario, SCENARIOS};
pub use naming::{unique_id, unique_name_prefix};
pub use types::{Overrides, ScenarioConfig, VarMap, VarValue};
