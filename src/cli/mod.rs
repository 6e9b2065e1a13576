pub mod args;
pub mod validation;

pub use args::{Args, Commands, ConfigAction};
pub use validation::{parse_var, parse_vars, validate_name_prefix, validate_var_name};
