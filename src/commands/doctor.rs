use crate::config::{
    get_config_path, get_module_root, get_work_dir, load_config, validate_config, Config,
};
use crate::error::Result;
use crate::scenario::SCENARIOS;
use std::path::Path;

struct DiagnosticCheck {
    name: String,
    status: DiagnosticStatus,
    details: Option<String>,
}

enum DiagnosticStatus {
    Ok,
    Warning,
    Error,
}

impl DiagnosticCheck {
    fn ok(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: DiagnosticStatus::Ok,
            details: Some(details.into()),
        }
    }

    fn warning(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: DiagnosticStatus::Warning,
            details: Some(details.into()),
        }
    }

    fn error(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: DiagnosticStatus::Error,
            details: Some(details.into()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            DiagnosticStatus::Ok => "\u{2713}",
            DiagnosticStatus::Warning => "\u{26a0}",
            DiagnosticStatus::Error => "\u{2717}",
        }
    }
}

/// Print diagnostics. Returns `false` when any check is an error.
pub fn run_doctor() -> Result<bool> {
    println!();
    println!("s2s-harness Diagnostics");
    println!("=======================");
    println!();

    let mut checks: Vec<DiagnosticCheck> = Vec::new();
    let mut suggestions: Vec<String> = Vec::new();

    let config_check = check_config();
    if matches!(config_check.status, DiagnosticStatus::Warning) {
        suggestions.push("Create config: s2s-harness config init".to_string());
    }
    checks.push(config_check);

    let config = load_config().unwrap_or_default();

    let terraform = config.tools.get_terraform();
    let terraform_check = check_binary(&terraform, &["version"], "Terraform");
    if matches!(terraform_check.status, DiagnosticStatus::Error) {
        suggestions.push(format!(
            "Install Terraform or set [tools] terraform (currently '{}')",
            terraform
        ));
    }
    checks.push(terraform_check);

    let aws = config.tools.get_aws();
    let aws_check = check_binary(&aws, &["--version"], "AWS CLI");
    if matches!(aws_check.status, DiagnosticStatus::Error) {
        suggestions.push(format!(
            "Install the AWS CLI or set [tools] aws (currently '{}')",
            aws
        ));
    }
    checks.push(aws_check);

    let module_check = check_module_root(&config);
    if !matches!(module_check.status, DiagnosticStatus::Ok) {
        suggestions.push(
            "Run from the module checkout or set [paths] module_root in .s2s-harness.toml"
                .to_string(),
        );
    }
    checks.push(module_check);

    checks.push(check_work_dir(&config));

    for check in &checks {
        let details = check.details.as_deref().unwrap_or("");
        println!("{} {} - {}", check.symbol(), check.name, details);
    }

    if !suggestions.is_empty() {
        println!();
        println!("Suggestions:");
        for suggestion in &suggestions {
            println!("  -> {}", suggestion);
        }
    }

    println!();

    Ok(!checks
        .iter()
        .any(|c| matches!(c.status, DiagnosticStatus::Error)))
}

fn check_binary(binary: &str, version_args: &[&str], label: &str) -> DiagnosticCheck {
    let output = std::process::Command::new(binary).args(version_args).output();

    match output {
        Ok(output) if output.status.success() => {
            // Older aws CLI builds print their version to stderr.
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).to_string()
            } else {
                String::from_utf8_lossy(&output.stdout).to_string()
            };
            let version = text.lines().next().unwrap_or("").trim().to_string();
            DiagnosticCheck::ok(label, format!("{} ({})", version, binary))
        }
        Ok(output) => DiagnosticCheck::error(
            label,
            format!(
                "'{}' exited with code {}",
                binary,
                output.status.code().unwrap_or(-1)
            ),
        ),
        Err(_) => DiagnosticCheck::error(label, format!("'{}' not found in PATH", binary)),
    }
}

fn has_tf_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.path().extension().is_some_and(|ext| ext == "tf"))
        })
        .unwrap_or(false)
}

fn check_module_root(config: &Config) -> DiagnosticCheck {
    let root = match get_module_root(config) {
        Ok(root) => root,
        Err(e) => return DiagnosticCheck::error("Module root", e.to_string()),
    };

    if !root.is_dir() {
        return DiagnosticCheck::error("Module root", format!("{} not found", root.display()));
    }

    if !has_tf_files(&root) {
        return DiagnosticCheck::warning(
            "Module root",
            format!("{} has no .tf files", root.display()),
        );
    }

    let missing: Vec<&str> = SCENARIOS
        .iter()
        .filter(|s| !has_tf_files(&root.join(s.terraform_dir)))
        .map(|s| s.name)
        .collect();

    if missing.is_empty() {
        DiagnosticCheck::ok("Module root", format!("{}", root.display()))
    } else {
        DiagnosticCheck::warning(
            "Module root",
            format!(
                "{} is missing definitions for: {}",
                root.display(),
                missing.join(", ")
            ),
        )
    }
}

fn check_work_dir(config: &Config) -> DiagnosticCheck {
    let work_dir = match get_work_dir(config) {
        Ok(dir) => dir,
        Err(e) => return DiagnosticCheck::error("Work directory", e.to_string()),
    };

    if !work_dir.exists() {
        return DiagnosticCheck::ok(
            "Work directory",
            format!("{} (created on first run)", work_dir.display()),
        );
    }

    let leftovers = std::fs::read_dir(&work_dir)
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0);

    if leftovers == 0 {
        DiagnosticCheck::ok("Work directory", format!("{}", work_dir.display()))
    } else {
        DiagnosticCheck::warning(
            "Work directory",
            format!(
                "{} holds {} kept run(s); check them with 's2s-harness destroy'",
                work_dir.display(),
                leftovers
            ),
        )
    }
}

fn check_config() -> DiagnosticCheck {
    let config_path = match get_config_path() {
        Ok(path) => path,
        Err(e) => return DiagnosticCheck::error("Config file", e.to_string()),
    };

    if !config_path.exists() {
        return DiagnosticCheck::warning(
            "Config file",
            format!("not found at {} (using defaults)", config_path.display()),
        );
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<Config>(&content) {
            Ok(config) => {
                if let Err(e) = validate_config(&config) {
                    DiagnosticCheck::warning("Config file", format!("validation warning: {}", e))
                } else {
                    DiagnosticCheck::ok("Config file", format!("{} (valid)", config_path.display()))
                }
            }
            Err(e) => DiagnosticCheck::error("Config file", format!("parse error: {}", e)),
        },
        Err(e) => DiagnosticCheck::error("Config file", format!("read error: {}", e)),
    }
}
