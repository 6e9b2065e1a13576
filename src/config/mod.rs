pub mod paths;
pub mod persistence;
pub mod schema;

pub use paths::*;
pub use persistence::*;
pub use schema::*;

const DEFAULT_PARALLELISM: usize = 4;

fn default_terraform_binary() -> String {
    "terraform".to_string()
}

fn default_aws_binary() -> String {
    "aws".to_string()
}

fn default_module_root() -> String {
    ".".to_string()
}

fn default_work_dir() -> String {
    "~/.local/share/s2s-harness/work".to_string()
}

pub fn default_region() -> String {
    "us-east-1".to_string()
}
