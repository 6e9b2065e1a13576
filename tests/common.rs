use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get the path to the s2s-harness binary for testing.
#[allow(dead_code)]
pub fn get_harness_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin!("s2s-harness").to_path_buf()
}

/// Points `S2S_HARNESS_CONFIG_DIR` at a scratch directory for the lifetime
/// of the context. Tests using it must be `#[serial]`.
#[allow(dead_code)]
pub struct TestConfigContext {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
}

impl Default for TestConfigContext {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl TestConfigContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("config");

        env::set_var(
            "S2S_HARNESS_CONFIG_DIR",
            config_dir.to_string_lossy().to_string(),
        );

        Self {
            temp_dir,
            config_dir,
        }
    }

    pub fn write_config(&self, content: &str) {
        fs::create_dir_all(&self.config_dir).expect("Failed to create config dir");
        fs::write(self.config_dir.join("config.toml"), content)
            .expect("Failed to write config file");
    }
}

impl Drop for TestConfigContext {
    fn drop(&mut self) {
        env::remove_var("S2S_HARNESS_CONFIG_DIR");
    }
}

const FAKE_TERRAFORM: &str = r#"#!/bin/sh
echo "$* | $(pwd)" >> "$FAKE_TF_LOG"
case "$1" in
  version)
    echo "Terraform v1.6.6"
    ;;
  init)
    echo "Terraform has been successfully initialized!"
    ;;
  apply)
    if [ -n "$FAKE_TF_APPLY_ERROR" ]; then
      echo "Error: $FAKE_TF_APPLY_ERROR" >&2
      exit 1
    fi
    echo "Apply complete! Resources: 12 added, 0 changed, 0 destroyed."
    ;;
  output)
    cat "$FAKE_TF_OUTPUTS"
    ;;
  destroy)
    if [ -n "$FAKE_TF_DESTROY_ERROR" ]; then
      echo "Error: $FAKE_TF_DESTROY_ERROR" >&2
      exit 1
    fi
    echo "Destroy complete! Resources: 12 destroyed."
    ;;
  *)
    echo "unexpected subcommand $1" >&2
    exit 2
    ;;
esac
"#;

const FAKE_AWS: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "aws-cli/2.15.0 Python/3.11.6 Linux/6.5.0 exe/x86_64"
  exit 0
fi
case "$2" in
  describe-vpcs)
    cat <<'JSON'
{"Vpcs": [{"VpcId": "vpc-1", "CidrBlock": "10.0.0.0/16", "Tags": [
  {"Key": "Environment", "Value": "test"},
  {"Key": "Project", "Value": "s2s-testing"},
  {"Key": "terraform-module", "Value": "tfm-aws-s2s"}]}]}
JSON
    ;;
  describe-subnets)
    case "$*" in
      *--subnet-ids*)
        cat <<'JSON'
{"Subnets": [
  {"SubnetId": "subnet-a", "VpcId": "vpc-1", "CidrBlock": "10.0.1.0/24", "AvailabilityZone": "us-east-1a"},
  {"SubnetId": "subnet-b", "VpcId": "vpc-1", "CidrBlock": "10.0.2.0/24", "AvailabilityZone": "us-east-1b"}]}
JSON
        ;;
      *)
        cat <<'JSON'
{"Subnets": [
  {"SubnetId": "subnet-a", "VpcId": "vpc-1", "CidrBlock": "10.0.1.0/24", "AvailabilityZone": "us-east-1a"},
  {"SubnetId": "subnet-b", "VpcId": "vpc-1", "CidrBlock": "10.0.2.0/24", "AvailabilityZone": "us-east-1b"},
  {"SubnetId": "subnet-c", "VpcId": "vpc-1", "CidrBlock": "10.0.101.0/24", "AvailabilityZone": "us-east-1a"},
  {"SubnetId": "subnet-d", "VpcId": "vpc-1", "CidrBlock": "10.0.102.0/24", "AvailabilityZone": "us-east-1b"}]}
JSON
        ;;
    esac
    ;;
  describe-flow-logs)
    echo '{"FlowLogs": [{"FlowLogId": "fl-1", "ResourceId": "vpc-1", "TrafficType": "ALL", "FlowLogStatus": "ACTIVE"}]}'
    ;;
  describe-security-groups)
    if [ -n "$FAKE_AWS_OPEN_INGRESS" ]; then
      cidr="0.0.0.0/0"
    else
      cidr="203.0.113.10/32"
    fi
    echo "{\"SecurityGroups\": [{\"GroupId\": \"sg-1\", \"GroupName\": \"vpn\", \"VpcId\": \"vpc-1\", \"IpPermissions\": [{\"IpProtocol\": \"udp\", \"FromPort\": 500, \"ToPort\": 500, \"IpRanges\": [{\"CidrIp\": \"$cidr\"}]}]}]}"
    ;;
  *)
    echo "An error occurred (InvalidAction) when calling $2" >&2
    exit 254
    ;;
esac
"#;

const FAKE_OUTPUTS: &str = r#"{
  "vpc_id": {"sensitive": false, "type": "string", "value": "vpc-1"},
  "private_subnet_ids": {"sensitive": false, "type": ["list", "string"], "value": ["subnet-a", "subnet-b"]},
  "public_subnet_ids": {"sensitive": false, "type": ["list", "string"], "value": ["subnet-c", "subnet-d"]},
  "transit_gateway_id": {"sensitive": false, "type": "string", "value": "tgw-0abc"},
  "transit_gateway_arn": {"sensitive": false, "type": "string", "value": "arn:aws:ec2:us-west-2:123456789012:transit-gateway/tgw-0abc"},
  "vpn_security_group_id": {"sensitive": false, "type": "string", "value": "sg-1"}
}"#;

/// A module checkout plus shell-script stand-ins for `terraform` and `aws`,
/// wired together through a config directory.
#[allow(dead_code)]
pub struct FakeToolchain {
    pub temp_dir: TempDir,
    pub module_root: PathBuf,
    pub work_dir: PathBuf,
    pub config_dir: PathBuf,
    pub log_path: PathBuf,
    pub outputs_path: PathBuf,
    env: Vec<(String, String)>,
}

#[allow(dead_code)]
impl FakeToolchain {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();

        let module_root = root.join("module");
        for dir in ["examples/basic-vpn", "examples/transit-gateway"] {
            fs::create_dir_all(module_root.join(dir)).expect("Failed to create module dir");
            fs::write(
                module_root.join(dir).join("main.tf"),
                "module \"s2s\" {\n  source = \"../../\"\n}\n",
            )
            .expect("Failed to write example");
        }
        fs::write(module_root.join("main.tf"), "# module root\n").expect("Failed to write main.tf");

        let bin_dir = root.join("bin");
        fs::create_dir_all(&bin_dir).expect("Failed to create bin dir");
        let terraform = write_script(&bin_dir, "terraform", FAKE_TERRAFORM);
        let aws = write_script(&bin_dir, "aws", FAKE_AWS);

        let outputs_path = root.join("outputs.json");
        fs::write(&outputs_path, FAKE_OUTPUTS).expect("Failed to write outputs");

        let work_dir = root.join("work");
        let config_dir = root.join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        let config = format!(
            r#"[tools]
terraform = "{}"
aws = "{}"

[paths]
module_root = "{}"
work_dir = "{}"

[run]
parallelism = 3
isolate_workdir = true
"#,
            terraform.display(),
            aws.display(),
            module_root.display(),
            work_dir.display()
        );
        fs::write(config_dir.join("config.toml"), config).expect("Failed to write config");

        Self {
            log_path: root.join("terraform.log"),
            temp_dir,
            module_root,
            work_dir,
            config_dir,
            outputs_path,
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Run the harness binary with this toolchain's config.
    pub fn harness(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(get_harness_path());
        cmd.args(args)
            .current_dir(self.temp_dir.path())
            .env("S2S_HARNESS_CONFIG_DIR", &self.config_dir)
            .env_remove("S2S_HARNESS_WORK_DIR")
            .env("S2S_HARNESS_LOG", "warn")
            .env("FAKE_TF_LOG", &self.log_path)
            .env("FAKE_TF_OUTPUTS", &self.outputs_path);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.output().expect("Failed to run s2s-harness")
    }

    /// Terraform invocations so far, in order, as `<argv> | <cwd>`.
    pub fn tool_calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log_path)
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    pub fn count_calls(&self, subcommand: &str) -> usize {
        self.tool_calls()
            .iter()
            .filter(|l| l.split_whitespace().next() == Some(subcommand))
            .count()
    }

    /// Full argument lists of every call to `subcommand`.
    pub fn calls_to(&self, subcommand: &str) -> Vec<String> {
        self.tool_calls()
            .into_iter()
            .filter(|l| l.split_whitespace().next() == Some(subcommand))
            .collect()
    }

    pub fn kept_workdirs(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.work_dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, body).expect("Failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to mark script executable");
    path
}

#[cfg(not(unix))]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("Failed to write script");
    path
}

#[allow(dead_code)]
pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[allow(dead_code)]
pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
