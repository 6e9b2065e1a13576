//! Named expectations evaluated against outputs and live snapshots.

use crate::cloud::{ResourceState, Snapshot};
use crate::tool::OutputValue;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    NonEmpty,
    Count(usize),
    CidrEquals(String),
    MinDistinctAzs(usize),
    TagEquals { key: String, value: String },
    Contains(String),
    HasIngressRules,
    /// No tcp, udp or all-protocol ingress rule reachable from anywhere.
    NoUnrestrictedIngress,
}

impl Expectation {
    pub fn tag(key: impl Into<String>, value: impl Into<String>) -> Self {
        Expectation::TagEquals {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::NonEmpty => write!(f, "non-empty"),
            Expectation::Count(n) => write!(f, "exactly {} entries", n),
            Expectation::CidrEquals(cidr) => write!(f, "CIDR block {}", cidr),
            Expectation::MinDistinctAzs(n) => {
                write!(f, "at least {} distinct availability zones", n)
            }
            Expectation::TagEquals { key, value } => write!(f, "tag {}={}", key, value),
            Expectation::Contains(needle) => write!(f, "contains '{}'", needle),
            Expectation::HasIngressRules => write!(f, "at least one ingress rule"),
            Expectation::NoUnrestrictedIngress => {
                write!(f, "no tcp, udp or all-protocol ingress open to 0.0.0.0/0 or ::/0")
            }
        }
    }
}

/// What an expectation is checked against.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Output {
        name: &'a str,
        value: &'a OutputValue,
    },
    Resource(&'a Snapshot),
}

impl Subject<'_> {
    pub fn label(&self) -> String {
        match self {
            Subject::Output { name, .. } => format!("output {}", name),
            Subject::Resource(snapshot) => snapshot.label(),
        }
    }
}

impl<'a> From<&'a Snapshot> for Subject<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        Subject::Resource(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFailure {
    pub expectation: String,
    pub resource: String,
    pub detail: String,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} on {}: {}",
            self.expectation, self.resource, self.detail
        )
    }
}

/// Evaluate `expectation` against `subject`; `None` means it holds.
pub fn evaluate(subject: Subject<'_>, expectation: &Expectation) -> Option<AssertionFailure> {
    let detail = match subject {
        Subject::Output { value, .. } => check_output(value, expectation),
        Subject::Resource(snapshot) => check_snapshot(snapshot, expectation),
    }
    .err()?;

    Some(AssertionFailure {
        expectation: expectation.to_string(),
        resource: subject.label(),
        detail,
    })
}

fn not_applicable(expectation: &Expectation, what: &str) -> Result<(), String> {
    Err(format!("'{}' does not apply to {}", expectation, what))
}

fn check_output(value: &OutputValue, expectation: &Expectation) -> Result<(), String> {
    match (expectation, value) {
        (Expectation::NonEmpty, v) => {
            if v.is_empty() {
                Err("value is empty".to_string())
            } else {
                Ok(())
            }
        }
        (Expectation::Count(n), OutputValue::List(items)) => {
            if items.len() == *n {
                Ok(())
            } else {
                Err(format!("found {} entries: {:?}", items.len(), items))
            }
        }
        (Expectation::Contains(needle), OutputValue::Text(text)) => {
            if text.contains(needle.as_str()) {
                Ok(())
            } else {
                Err(format!("value is '{}'", text))
            }
        }
        (Expectation::Count(_), OutputValue::Text(_)) => not_applicable(expectation, "a text output"),
        (Expectation::Contains(_), OutputValue::List(_)) => {
            not_applicable(expectation, "a list output")
        }
        _ => not_applicable(expectation, "an output value"),
    }
}

fn check_snapshot(snapshot: &Snapshot, expectation: &Expectation) -> Result<(), String> {
    match expectation {
        Expectation::NonEmpty => {
            if snapshot.is_empty() {
                Err("no records found".to_string())
            } else {
                Ok(())
            }
        }
        Expectation::Count(n) => match &snapshot.state {
            ResourceState::Subnets(_) | ResourceState::FlowLogs(_) => {
                if snapshot.len() == *n {
                    Ok(())
                } else {
                    Err(format!("found {} entries", snapshot.len()))
                }
            }
            _ => not_applicable(expectation, "a single resource"),
        },
        Expectation::CidrEquals(expected) => match &snapshot.state {
            ResourceState::Vpc(vpc) if &vpc.cidr_block == expected => Ok(()),
            ResourceState::Vpc(vpc) => Err(format!("actual CIDR block is {}", vpc.cidr_block)),
            _ => not_applicable(expectation, "this resource"),
        },
        Expectation::MinDistinctAzs(min) => match &snapshot.state {
            ResourceState::Subnets(_) => {
                let azs = snapshot.availability_zones();
                if azs.len() >= *min {
                    Ok(())
                } else {
                    Err(format!(
                        "spread over {} zone(s): {}",
                        azs.len(),
                        azs.into_iter().collect::<Vec<_>>().join(", ")
                    ))
                }
            }
            _ => not_applicable(expectation, "this resource"),
        },
        Expectation::TagEquals { key, value } => {
            let tag_sets = snapshot.tag_sets();
            if tag_sets.is_empty() {
                return not_applicable(expectation, "this resource");
            }
            for (id, tags) in tag_sets {
                match tags.get(key) {
                    None => return Err(format!("tag '{}' missing on {}", key, id)),
                    Some(actual) if actual != value => {
                        return Err(format!("tag '{}' is '{}' on {}", key, actual, id))
                    }
                    Some(_) => {}
                }
            }
            Ok(())
        }
        Expectation::HasIngressRules => match &snapshot.state {
            ResourceState::SecurityGroup(sg) if sg.ingress.is_empty() => {
                Err("no ingress rules".to_string())
            }
            ResourceState::SecurityGroup(_) => Ok(()),
            _ => not_applicable(expectation, "this resource"),
        },
        Expectation::NoUnrestrictedIngress => match &snapshot.state {
            ResourceState::SecurityGroup(sg) => {
                let open: Vec<String> = sg
                    .ingress
                    .iter()
                    .filter(|r| r.covers_tcp_or_udp() && r.is_unrestricted())
                    .map(|r| r.to_string())
                    .collect();
                if open.is_empty() {
                    Ok(())
                } else {
                    Err(format!("unrestricted rule(s): {}", open.join("; ")))
                }
            }
            _ => not_applicable(expectation, "this resource"),
        },
        Expectation::Contains(_) => not_applicable(expectation, "a resource snapshot"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::fake::{subnet, vpc};
    use crate::cloud::{IngressRule, ResourceKind, SecurityGroup};
    use std::collections::BTreeMap;

    fn vpc_snapshot(tags: &[(&str, &str)]) -> Snapshot {
        Snapshot {
            kind: ResourceKind::Vpc,
            id: "vpc-1".to_string(),
            state: ResourceState::Vpc(vpc("vpc-1", "10.0.0.0/16", tags)),
        }
    }

    fn sg_snapshot(rules: Vec<IngressRule>) -> Snapshot {
        Snapshot {
            kind: ResourceKind::SecurityGroup,
            id: "sg-1".to_string(),
            state: ResourceState::SecurityGroup(SecurityGroup {
                id: "sg-1".to_string(),
                name: "vpn".to_string(),
                vpc_id: Some("vpc-1".to_string()),
                ingress: rules,
                tags: BTreeMap::new(),
            }),
        }
    }

    fn rule(protocol: &str, port: i64, cidr: &str) -> IngressRule {
        IngressRule {
            protocol: protocol.to_string(),
            from_port: Some(port),
            to_port: Some(port),
            cidr_blocks: vec![cidr.to_string()],
        }
    }

    #[test]
    fn test_cidr_equals() {
        let snapshot = vpc_snapshot(&[]);
        assert!(evaluate((&snapshot).into(), &Expectation::CidrEquals("10.0.0.0/16".into())).is_none());

        let failure =
            evaluate((&snapshot).into(), &Expectation::CidrEquals("10.1.0.0/16".into())).unwrap();
        assert_eq!(failure.resource, "vpc vpc-1");
        assert!(failure.to_string().contains("actual CIDR block is 10.0.0.0/16"));
    }

    #[test]
    fn test_distinct_azs() {
        let snapshot = Snapshot {
            kind: ResourceKind::Subnets,
            id: "subnet-a,subnet-b".to_string(),
            state: ResourceState::Subnets(vec![
                subnet("subnet-a", "vpc-1", "10.0.1.0/24", "us-east-1a"),
                subnet("subnet-b", "vpc-1", "10.0.2.0/24", "us-east-1a"),
            ]),
        };
        assert!(evaluate((&snapshot).into(), &Expectation::Count(2)).is_none());
        let failure = evaluate((&snapshot).into(), &Expectation::MinDistinctAzs(2)).unwrap();
        assert!(failure.detail.contains("1 zone(s): us-east-1a"));
    }

    #[test]
    fn test_tag_presence_and_value() {
        let snapshot = vpc_snapshot(&[("Environment", "test"), ("Project", "other")]);
        assert!(evaluate((&snapshot).into(), &Expectation::tag("Environment", "test")).is_none());

        let wrong = evaluate((&snapshot).into(), &Expectation::tag("Project", "s2s-testing")).unwrap();
        assert!(wrong.detail.contains("is 'other'"));

        let missing = evaluate((&snapshot).into(), &Expectation::tag("Owner", "ops")).unwrap();
        assert!(missing.detail.contains("missing"));
    }

    #[test]
    fn test_open_tcp_rule_fails() {
        let snapshot = sg_snapshot(vec![rule("tcp", 22, "0.0.0.0/0")]);
        let failure = evaluate((&snapshot).into(), &Expectation::NoUnrestrictedIngress).unwrap();
        assert_eq!(failure.resource, "security group sg-1");
        assert!(failure.detail.contains("tcp 22 from 0.0.0.0/0"));
    }

    #[test]
    fn test_all_protocol_ipv6_rule_fails() {
        let mut open = rule("-1", 0, "10.0.0.0/16");
        open.from_port = None;
        open.to_port = None;
        open.cidr_blocks.push("::/0".to_string());
        let snapshot = sg_snapshot(vec![open]);

        let failure = evaluate((&snapshot).into(), &Expectation::NoUnrestrictedIngress).unwrap();
        assert!(failure.detail.contains("::/0"));
        assert!(Expectation::NoUnrestrictedIngress
            .to_string()
            .contains("all-protocol"));
    }

    #[test]
    fn test_restricted_and_non_transport_rules_pass() {
        let snapshot = sg_snapshot(vec![
            rule("udp", 500, "203.0.113.10/32"),
            rule("50", 0, "0.0.0.0/0"),
            rule("icmp", -1, "0.0.0.0/0"),
        ]);
        assert!(evaluate((&snapshot).into(), &Expectation::NoUnrestrictedIngress).is_none());
        assert!(evaluate((&snapshot).into(), &Expectation::HasIngressRules).is_none());
    }

    #[test]
    fn test_empty_security_group_has_no_rules() {
        let snapshot = sg_snapshot(Vec::new());
        assert!(evaluate((&snapshot).into(), &Expectation::HasIngressRules).is_some());
    }

    #[test]
    fn test_output_contains() {
        let arn = OutputValue::Text(
            "arn:aws:ec2:us-west-2:123456789012:transit-gateway/tgw-0abc".to_string(),
        );
        let subject = Subject::Output {
            name: "transit_gateway_arn",
            value: &arn,
        };
        assert!(evaluate(subject, &Expectation::Contains("tgw-0abc".into())).is_none());
        let failure = evaluate(subject, &Expectation::Contains("tgw-9999".into())).unwrap();
        assert_eq!(failure.resource, "output transit_gateway_arn");
    }

    #[test]
    fn test_output_list_count() {
        let ids = OutputValue::List(vec!["subnet-a".to_string()]);
        let subject = Subject::Output {
            name: "public_subnet_ids",
            value: &ids,
        };
        let failure = evaluate(subject, &Expectation::Count(2)).unwrap();
        assert!(failure.detail.contains("found 1 entries"));
    }

    #[test]
    fn test_mismatched_expectation_reports_not_applicable() {
        let snapshot = vpc_snapshot(&[]);
        let failure = evaluate((&snapshot).into(), &Expectation::HasIngressRules).unwrap();
        assert!(failure.detail.contains("does not apply"));
    }
}
