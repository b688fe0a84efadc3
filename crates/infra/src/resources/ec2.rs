//! VPC networking: subnets, route tables, internet gateway, security groups.

use std::net::Ipv4Addr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SynthError};
use crate::template::{
    get_azs, select, LogicalId, ResourceOptions, ResourceProperties, TemplateBuilder,
};

/// `AWS::EC2::VPC`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vpc {
    pub cidr_block: String,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
    pub instance_tenancy: &'static str,
}

impl ResourceProperties for Vpc {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::VPC";

    fn validate(&self, logical_id: &str) -> Result<()> {
        check_cidr(logical_id, &self.cidr_block)
    }
}

/// `AWS::EC2::Subnet`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subnet {
    pub vpc_id: Value,
    pub cidr_block: String,
    pub availability_zone: Value,
    pub map_public_ip_on_launch: bool,
}

impl ResourceProperties for Subnet {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::Subnet";

    fn validate(&self, logical_id: &str) -> Result<()> {
        check_cidr(logical_id, &self.cidr_block)
    }
}

/// `AWS::EC2::RouteTable`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteTable {
    pub vpc_id: Value,
}

impl ResourceProperties for RouteTable {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::RouteTable";
}

/// `AWS::EC2::SubnetRouteTableAssociation`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetRouteTableAssociation {
    pub route_table_id: Value,
    pub subnet_id: Value,
}

impl ResourceProperties for SubnetRouteTableAssociation {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::SubnetRouteTableAssociation";
    const TAGGABLE: bool = false;
}

/// `AWS::EC2::InternetGateway`
#[derive(Debug, Clone, Default, Serialize)]
pub struct InternetGateway {}

impl ResourceProperties for InternetGateway {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::InternetGateway";
}

/// `AWS::EC2::VPCGatewayAttachment`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcGatewayAttachment {
    pub vpc_id: Value,
    pub internet_gateway_id: Value,
}

impl ResourceProperties for VpcGatewayAttachment {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::VPCGatewayAttachment";
    const TAGGABLE: bool = false;
}

/// `AWS::EC2::Route`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route {
    pub route_table_id: Value,
    pub destination_cidr_block: String,
    pub gateway_id: Value,
}

impl ResourceProperties for Route {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::Route";
    const TAGGABLE: bool = false;
}

/// `AWS::EC2::SecurityGroup`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    pub group_description: String,
    pub vpc_id: Value,
    pub security_group_egress: Vec<EgressRule>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EgressRule {
    pub cidr_ip: &'static str,
    pub description: &'static str,
    pub ip_protocol: &'static str,
}

impl SecurityGroup {
    /// A group in `vpc` that allows all outbound traffic and no inbound.
    pub fn allow_all_outbound(description: impl Into<String>, vpc: &LogicalId) -> Self {
        Self {
            group_description: description.into(),
            vpc_id: vpc.reference(),
            security_group_egress: vec![EgressRule {
                cidr_ip: "0.0.0.0/0",
                description: "Allow all outbound traffic by default",
                ip_protocol: "-1",
            }],
        }
    }
}

impl ResourceProperties for SecurityGroup {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::SecurityGroup";

    fn validate(&self, logical_id: &str) -> Result<()> {
        if self.group_description.is_empty() || self.group_description.len() > 255 {
            return Err(SynthError::invalid(
                logical_id,
                "GroupDescription",
                "must be 1 to 255 characters",
            ));
        }
        Ok(())
    }
}

/// Subnet tier within the VPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetTier {
    Public,
    /// Private with egress. With zero NAT gateways it has no default route.
    Private,
    Isolated,
}

impl SubnetTier {
    pub const ALL: [SubnetTier; 3] = [SubnetTier::Public, SubnetTier::Private, SubnetTier::Isolated];

    pub fn name(self) -> &'static str {
        match self {
            SubnetTier::Public => "Public",
            SubnetTier::Private => "Private",
            SubnetTier::Isolated => "Isolated",
        }
    }
}

/// Layout of a VPC before it is declared.
#[derive(Debug, Clone)]
pub struct NetworkLayout {
    pub cidr_block: String,
    pub max_azs: usize,
    pub subnet_prefix: u8,
    pub nat_gateways: usize,
}

impl Default for NetworkLayout {
    fn default() -> Self {
        Self {
            cidr_block: "10.0.0.0/16".to_string(),
            max_azs: 2,
            subnet_prefix: 19,
            nat_gateways: 0,
        }
    }
}

/// Handles to a declared VPC.
#[derive(Debug, Clone)]
pub struct Network {
    pub vpc: LogicalId,
    pub public_subnets: Vec<LogicalId>,
    pub private_subnets: Vec<LogicalId>,
    pub isolated_subnets: Vec<LogicalId>,
    pub internet_gateway: LogicalId,
}

impl Network {
    /// Declares the VPC, one subnet per tier per availability zone, and the
    /// internet gateway routed from the public tier.
    pub fn declare(builder: &mut TemplateBuilder, id: &str, layout: &NetworkLayout) -> Result<Self> {
        if layout.nat_gateways != 0 {
            return Err(SynthError::invalid(
                id,
                "NatGateways",
                "NAT gateways are not supported by this layout",
            ));
        }

        let cidrs = subnet_cidrs(
            &layout.cidr_block,
            layout.subnet_prefix,
            SubnetTier::ALL.len() * layout.max_azs,
        )
        .ok_or_else(|| {
            SynthError::invalid(
                id,
                "CidrBlock",
                format!(
                    "{} cannot hold {} /{} subnets",
                    layout.cidr_block,
                    SubnetTier::ALL.len() * layout.max_azs,
                    layout.subnet_prefix
                ),
            )
        })?;

        let vpc = builder.add(
            id,
            Vpc {
                cidr_block: layout.cidr_block.clone(),
                enable_dns_hostnames: true,
                enable_dns_support: true,
                instance_tenancy: "default",
            },
        )?;

        let internet_gateway = builder.add(&format!("{id}IGW"), InternetGateway::default())?;
        let attachment = builder.add(
            &format!("{id}VPCGW"),
            VpcGatewayAttachment {
                vpc_id: vpc.reference(),
                internet_gateway_id: internet_gateway.reference(),
            },
        )?;

        let mut network = Network {
            vpc: vpc.clone(),
            public_subnets: Vec::new(),
            private_subnets: Vec::new(),
            isolated_subnets: Vec::new(),
            internet_gateway: internet_gateway.clone(),
        };

        let mut cidrs = cidrs.into_iter();
        for tier in SubnetTier::ALL {
            for az in 0..layout.max_azs {
                let prefix = format!("{id}{}Subnet{}", tier.name(), az + 1);
                let cidr = cidrs.next().ok_or_else(|| {
                    SynthError::invalid(id, "CidrBlock", "ran out of subnet ranges")
                })?;

                let subnet = builder.add(
                    &prefix,
                    Subnet {
                        vpc_id: vpc.reference(),
                        cidr_block: cidr,
                        availability_zone: availability_zone(az),
                        map_public_ip_on_launch: tier == SubnetTier::Public,
                    },
                )?;
                let route_table = builder.add(
                    &format!("{prefix}RouteTable"),
                    RouteTable {
                        vpc_id: vpc.reference(),
                    },
                )?;
                builder.add(
                    &format!("{prefix}RouteTableAssociation"),
                    SubnetRouteTableAssociation {
                        route_table_id: route_table.reference(),
                        subnet_id: subnet.reference(),
                    },
                )?;

                match tier {
                    SubnetTier::Public => {
                        builder.add_with(
                            &format!("{prefix}DefaultRoute"),
                            Route {
                                route_table_id: route_table.reference(),
                                destination_cidr_block: "0.0.0.0/0".to_string(),
                                gateway_id: internet_gateway.reference(),
                            },
                            ResourceOptions::new().depends_on(&attachment),
                        )?;
                        network.public_subnets.push(subnet);
                    }
                    SubnetTier::Private => network.private_subnets.push(subnet),
                    SubnetTier::Isolated => network.isolated_subnets.push(subnet),
                }
            }
        }

        Ok(network)
    }

    pub fn private_subnet_refs(&self) -> Vec<Value> {
        self.private_subnets.iter().map(LogicalId::reference).collect()
    }
}

/// Splits `cidr` into `count` consecutive blocks of length `prefix`.
///
/// Returns `None` when `cidr` is malformed, `prefix` is shorter than the
/// parent, or the blocks do not fit.
pub fn subnet_cidrs(cidr: &str, prefix: u8, count: usize) -> Option<Vec<String>> {
    let (base, parent_prefix) = parse_cidr(cidr)?;
    if prefix < parent_prefix || prefix > 32 {
        return None;
    }

    let available = 1u64 << (prefix - parent_prefix);
    if count as u64 > available {
        return None;
    }

    let step = 1u64 << (32 - prefix);
    let start = u64::from(u32::from(base));
    (0..count as u64)
        .map(|i| {
            let addr = u32::try_from(start + i * step).ok()?;
            Some(format!("{}/{prefix}", Ipv4Addr::from(addr)))
        })
        .collect()
}

fn check_cidr(logical_id: &str, cidr: &str) -> Result<()> {
    match parse_cidr(cidr) {
        Some(_) => Ok(()),
        None => Err(SynthError::invalid(
            logical_id,
            "CidrBlock",
            format!("'{cidr}' is not an IPv4 CIDR block"),
        )),
    }
}

fn parse_cidr(cidr: &str) -> Option<(Ipv4Addr, u8)> {
    let (addr, prefix) = cidr.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    if u32::from(addr) & !mask != 0 {
        return None;
    }
    Some((addr, prefix))
}

/// Availability zone selector used for subnet `index`.
pub fn availability_zone(index: usize) -> Value {
    select(index, get_azs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_cidrs_are_consecutive() {
        let cidrs = subnet_cidrs("10.0.0.0/16", 19, 6).unwrap();
        assert_eq!(
            cidrs,
            vec![
                "10.0.0.0/19",
                "10.0.32.0/19",
                "10.0.64.0/19",
                "10.0.96.0/19",
                "10.0.128.0/19",
                "10.0.160.0/19",
            ]
        );
    }

    #[test]
    fn test_subnet_cidrs_rejects_overflow_and_bad_input() {
        assert!(subnet_cidrs("10.0.0.0/16", 17, 3).is_none());
        assert!(subnet_cidrs("10.0.0.0/16", 15, 1).is_none());
        assert!(subnet_cidrs("10.0.0.1/16", 19, 1).is_none());
        assert!(subnet_cidrs("not-a-cidr", 19, 1).is_none());
    }

    #[test]
    fn test_network_declares_three_tiers_over_two_azs() {
        let mut builder = TemplateBuilder::new();
        let network =
            Network::declare(&mut builder, "ApplicationVpc", &NetworkLayout::default()).unwrap();
        let template = builder.build().unwrap();

        assert_eq!(network.public_subnets.len(), 2);
        assert_eq!(network.private_subnets.len(), 2);
        assert_eq!(network.isolated_subnets.len(), 2);
        assert_eq!(template.resources_of_type("AWS::EC2::Subnet").len(), 6);
        assert_eq!(template.resources_of_type("AWS::EC2::InternetGateway").len(), 1);
        assert_eq!(template.resources_of_type("AWS::EC2::NatGateway").len(), 0);

        let routes = template.resources_of_type("AWS::EC2::Route");
        assert_eq!(routes.len(), 2);
        assert!(routes.iter().all(|(id, _)| id.contains("Public")));

        let second = &template.resources["ApplicationVpcPrivateSubnet2"];
        assert_eq!(second.properties["AvailabilityZone"], availability_zone(1));
        assert_eq!(second.properties["MapPublicIpOnLaunch"], false);
    }

    #[test]
    fn test_nat_gateways_rejected() {
        let mut builder = TemplateBuilder::new();
        let layout = NetworkLayout {
            nat_gateways: 1,
            ..NetworkLayout::default()
        };
        assert!(Network::declare(&mut builder, "Vpc", &layout).is_err());
    }
}
