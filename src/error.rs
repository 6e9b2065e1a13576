use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Provisioning failed: {0}")]
    Provision(String),

    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Teardown failed: {0}")]
    Teardown(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Interrupted")]
    Interrupted,
}

impl HarnessError {
    /// Short label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::Provision(_) => "provision",
            HarnessError::Lookup(_) => "lookup",
            HarnessError::Teardown(_) => "teardown",
            HarnessError::Config(_) => "config",
            HarnessError::Tool(_) => "tool",
            HarnessError::Io(_) => "io",
            HarnessError::Json(_) => "json",
            HarnessError::Interrupted => "interrupted",
        }
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Json(err.to_string())
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err)
    }
}
