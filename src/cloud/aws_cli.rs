//! [`CloudInspector`] backed by the `aws` CLI.
//!
//! Every query runs `aws ec2 describe-* --output json` and decodes the
//! response into the snapshot types. Responses that name a missing resource
//! (`*.NotFound`) and empty result lists are reported as lookup errors.

use super::types::{FlowLog, IngressRule, SecurityGroup, Subnet, Vpc};
use super::CloudInspector;
use crate::error::{HarnessError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;

#[derive(Debug, Clone)]
pub struct AwsCli {
    binary: String,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self::new("aws")
    }
}

impl AwsCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn describe<T: DeserializeOwned>(&self, region: &str, args: &[&str]) -> Result<T> {
        let mut full_args = vec!["ec2"];
        full_args.extend_from_slice(args);
        full_args.extend_from_slice(&["--region", region, "--output", "json"]);

        tracing::debug!("Running {} {}", self.binary, full_args.join(" "));

        let output = std::process::Command::new(&self.binary)
            .args(&full_args)
            .env("AWS_PAGER", "")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                HarnessError::Tool(format!("Failed to execute '{}': {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.contains("NotFound") {
                return Err(HarnessError::Lookup(stderr));
            }
            return Err(HarnessError::Tool(format!(
                "aws ec2 {} failed: {}",
                args.first().copied().unwrap_or(""),
                stderr
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsTag {
    key: String,
    #[serde(default)]
    value: String,
}

fn tag_map(tags: Vec<AwsTag>) -> BTreeMap<String, String> {
    tags.into_iter().map(|t| (t.key, t.value)).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVpcs {
    #[serde(default)]
    vpcs: Vec<AwsVpc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsVpc {
    vpc_id: String,
    cidr_block: String,
    #[serde(default)]
    tags: Vec<AwsTag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSubnets {
    #[serde(default)]
    subnets: Vec<AwsSubnet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsSubnet {
    subnet_id: String,
    vpc_id: String,
    cidr_block: String,
    availability_zone: String,
    #[serde(default)]
    tags: Vec<AwsTag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeFlowLogs {
    #[serde(default)]
    flow_logs: Vec<AwsFlowLog>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsFlowLog {
    flow_log_id: String,
    resource_id: String,
    traffic_type: Option<String>,
    log_destination_type: Option<String>,
    flow_log_status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroups {
    #[serde(default)]
    security_groups: Vec<AwsSecurityGroup>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsSecurityGroup {
    group_id: String,
    #[serde(default)]
    group_name: String,
    vpc_id: Option<String>,
    #[serde(default)]
    ip_permissions: Vec<AwsIpPermission>,
    #[serde(default)]
    tags: Vec<AwsTag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsIpPermission {
    ip_protocol: String,
    from_port: Option<i64>,
    to_port: Option<i64>,
    #[serde(default)]
    ip_ranges: Vec<AwsIpRange>,
    #[serde(default)]
    ipv6_ranges: Vec<AwsIpv6Range>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsIpRange {
    cidr_ip: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsIpv6Range {
    cidr_ipv6: String,
}

impl From<AwsVpc> for Vpc {
    fn from(v: AwsVpc) -> Self {
        Vpc {
            id: v.vpc_id,
            cidr_block: v.cidr_block,
            tags: tag_map(v.tags),
        }
    }
}

impl From<AwsSubnet> for Subnet {
    fn from(s: AwsSubnet) -> Self {
        Subnet {
            id: s.subnet_id,
            vpc_id: s.vpc_id,
            cidr_block: s.cidr_block,
            availability_zone: s.availability_zone,
            tags: tag_map(s.tags),
        }
    }
}

impl From<AwsFlowLog> for FlowLog {
    fn from(f: AwsFlowLog) -> Self {
        FlowLog {
            id: f.flow_log_id,
            resource_id: f.resource_id,
            traffic_type: f.traffic_type,
            destination_type: f.log_destination_type,
            status: f.flow_log_status,
        }
    }
}

impl From<AwsIpPermission> for IngressRule {
    fn from(p: AwsIpPermission) -> Self {
        let cidr_blocks = p
            .ip_ranges
            .into_iter()
            .map(|r| r.cidr_ip)
            .chain(p.ipv6_ranges.into_iter().map(|r| r.cidr_ipv6))
            .collect();
        IngressRule {
            protocol: p.ip_protocol,
            from_port: p.from_port,
            to_port: p.to_port,
            cidr_blocks,
        }
    }
}

impl From<AwsSecurityGroup> for SecurityGroup {
    fn from(g: AwsSecurityGroup) -> Self {
        SecurityGroup {
            id: g.group_id,
            name: g.group_name,
            vpc_id: g.vpc_id,
            ingress: g.ip_permissions.into_iter().map(Into::into).collect(),
            tags: tag_map(g.tags),
        }
    }
}

fn first_or_not_found<T, U: From<T>>(items: Vec<T>, what: &str, id: &str) -> Result<U> {
    items
        .into_iter()
        .next()
        .map(U::from)
        .ok_or_else(|| HarnessError::Lookup(format!("{} {} not found", what, id)))
}

impl CloudInspector for AwsCli {
    fn get_vpc(&self, vpc_id: &str, region: &str) -> Result<Vpc> {
        let response: DescribeVpcs =
            self.describe(region, &["describe-vpcs", "--vpc-ids", vpc_id])?;
        first_or_not_found(response.vpcs, "VPC", vpc_id)
    }

    fn list_subnets_for_vpc(&self, vpc_id: &str, region: &str) -> Result<Vec<Subnet>> {
        let filter = format!("Name=vpc-id,Values={}", vpc_id);
        let response: DescribeSubnets =
            self.describe(region, &["describe-subnets", "--filters", &filter])?;
        Ok(response.subnets.into_iter().map(Into::into).collect())
    }

    fn get_subnets(&self, subnet_ids: &[String], region: &str) -> Result<Vec<Subnet>> {
        let mut args = vec!["describe-subnets", "--subnet-ids"];
        args.extend(subnet_ids.iter().map(String::as_str));
        let response: DescribeSubnets = self.describe(region, &args)?;
        if response.subnets.len() != subnet_ids.len() {
            return Err(HarnessError::Lookup(format!(
                "Expected {} subnets, provider returned {}",
                subnet_ids.len(),
                response.subnets.len()
            )));
        }
        Ok(response.subnets.into_iter().map(Into::into).collect())
    }

    fn get_flow_logs_for_vpc(&self, vpc_id: &str, region: &str) -> Result<Vec<FlowLog>> {
        let filter = format!("Name=resource-id,Values={}", vpc_id);
        let response: DescribeFlowLogs =
            self.describe(region, &["describe-flow-logs", "--filter", &filter])?;
        Ok(response.flow_logs.into_iter().map(Into::into).collect())
    }

    fn get_security_group(&self, group_id: &str, region: &str) -> Result<SecurityGroup> {
        let response: DescribeSecurityGroups =
            self.describe(region, &["describe-security-groups", "--group-ids", group_id])?;
        first_or_not_found(response.security_groups, "Security group", group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_vpc_with_tags() {
        let raw = r#"{"Vpcs": [{
            "CidrBlock": "10.0.0.0/16",
            "State": "available",
            "VpcId": "vpc-0abc",
            "Tags": [{"Key": "Environment", "Value": "test"}, {"Key": "Name", "Value": "test-s2s-x1-vpc"}]
        }]}"#;
        let response: DescribeVpcs = serde_json::from_str(raw).unwrap();
        let vpc: Vpc = first_or_not_found(response.vpcs, "VPC", "vpc-0abc").unwrap();
        assert_eq!(vpc.cidr_block, "10.0.0.0/16");
        assert_eq!(vpc.tags.get("Environment").map(String::as_str), Some("test"));
    }

    #[test]
    fn test_decode_security_group_rules() {
        let raw = r#"{"SecurityGroups": [{
            "GroupId": "sg-1",
            "GroupName": "test-sec-x1-vpn",
            "VpcId": "vpc-1",
            "IpPermissions": [
                {"IpProtocol": "udp", "FromPort": 500, "ToPort": 500,
                 "IpRanges": [{"CidrIp": "203.0.113.10/32"}], "Ipv6Ranges": []},
                {"IpProtocol": "-1", "IpRanges": [], "Ipv6Ranges": [{"CidrIpv6": "::/0"}]}
            ]
        }]}"#;
        let response: DescribeSecurityGroups = serde_json::from_str(raw).unwrap();
        let sg: SecurityGroup =
            first_or_not_found(response.security_groups, "Security group", "sg-1").unwrap();

        assert_eq!(sg.ingress.len(), 2);
        assert_eq!(sg.ingress[0].protocol, "udp");
        assert!(!sg.ingress[0].is_unrestricted());
        assert!(sg.ingress[1].is_unrestricted());
        assert!(sg.tags.is_empty());
    }

    #[test]
    fn test_decode_flow_logs() {
        let raw = r#"{"FlowLogs": [{
            "FlowLogId": "fl-1", "ResourceId": "vpc-1", "TrafficType": "ALL",
            "LogDestinationType": "cloud-watch-logs", "FlowLogStatus": "ACTIVE"
        }]}"#;
        let response: DescribeFlowLogs = serde_json::from_str(raw).unwrap();
        let logs: Vec<FlowLog> = response.flow_logs.into_iter().map(Into::into).collect();
        assert_eq!(logs[0].resource_id, "vpc-1");
        assert_eq!(logs[0].status.as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn test_empty_response_is_not_found() {
        let response: DescribeVpcs = serde_json::from_str(r#"{"Vpcs": []}"#).unwrap();
        let err = first_or_not_found::<_, Vpc>(response.vpcs, "VPC", "vpc-404").unwrap_err();
        assert!(matches!(err, HarnessError::Lookup(_)));
    }
}
