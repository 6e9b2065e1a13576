pub mod config;
pub mod destroy;
pub mod doctor;
pub mod list;
pub mod run;

pub use config::handle_config_command;
pub use destroy::destroy_scenario;
pub use doctor::run_doctor;
pub use list::list_scenarios;
pub use run::{run_scenarios, RunOptions};
