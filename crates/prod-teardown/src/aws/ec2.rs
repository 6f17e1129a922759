//! VPCs and the networking inside them

use super::{AwsCloud, ProviderError, extract_tags};
use aws_sdk_ec2::types::{Filter, NatGatewayState};
use prod_teardown_common::Tags;
use prod_teardown_common::tags::TAG_PROJECT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcSummary {
    pub id: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupSummary {
    pub id: String,
    pub name: String,
}

impl SecurityGroupSummary {
    /// Every VPC has one; it is deleted with the VPC and cannot be removed directly
    pub fn is_default(&self) -> bool {
        self.name == "default"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTableAssociationSummary {
    pub id: String,
    pub main: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTableSummary {
    pub id: String,
    pub associations: Vec<RouteTableAssociationSummary>,
}

impl RouteTableSummary {
    /// The main route table is deleted with the VPC
    pub fn is_main(&self) -> bool {
        self.associations.iter().any(|a| a.main)
    }
}

/// EC2 networking operations used by the network family.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait NetworkOperations: Send + Sync {
    /// VPCs carrying `Project = <project_tag>`
    async fn list_vpcs(&self, project_tag: &str) -> Result<Vec<VpcSummary>, ProviderError>;

    async fn list_security_groups(
        &self,
        vpc_id: &str,
    ) -> Result<Vec<SecurityGroupSummary>, ProviderError>;

    /// Revoke every ingress rule; a no-op when there are none
    async fn revoke_ingress_rules(&self, group_id: &str) -> Result<(), ProviderError>;

    async fn revoke_egress_rules(&self, group_id: &str) -> Result<(), ProviderError>;

    async fn delete_security_group(&self, group_id: &str) -> Result<(), ProviderError>;

    async fn list_route_tables(&self, vpc_id: &str)
    -> Result<Vec<RouteTableSummary>, ProviderError>;

    async fn disassociate_route_table(&self, association_id: &str) -> Result<(), ProviderError>;

    async fn delete_route_table(&self, route_table_id: &str) -> Result<(), ProviderError>;

    /// Internet gateway IDs attached to a VPC
    async fn list_internet_gateways(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError>;

    async fn detach_internet_gateway(&self, gateway_id: &str, vpc_id: &str)
    -> Result<(), ProviderError>;

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<(), ProviderError>;

    /// NAT gateway IDs in a VPC, skipping those already deleting or deleted
    async fn list_nat_gateways(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError>;

    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), ProviderError>;

    /// Subnet IDs in a VPC
    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError>;

    async fn delete_subnet(&self, subnet_id: &str) -> Result<(), ProviderError>;

    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), ProviderError>;
}

fn vpc_filter(vpc_id: &str) -> Filter {
    Filter::builder().name("vpc-id").values(vpc_id).build()
}

impl NetworkOperations for AwsCloud {
    async fn list_vpcs(&self, project_tag: &str) -> Result<Vec<VpcSummary>, ProviderError> {
        let mut vpcs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = self
                .ec2
                .describe_vpcs()
                .filters(
                    Filter::builder()
                        .name(format!("tag:{TAG_PROJECT}"))
                        .values(project_tag)
                        .build(),
                )
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            vpcs.extend(resp.vpcs().iter().filter_map(|vpc| {
                Some(VpcSummary {
                    id: vpc.vpc_id()?.to_string(),
                    tags: extract_tags(vpc.tags(), |t| t.key(), |t| t.value()),
                })
            }));

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(vpcs)
    }

    async fn list_security_groups(
        &self,
        vpc_id: &str,
    ) -> Result<Vec<SecurityGroupSummary>, ProviderError> {
        let resp = self
            .ec2
            .describe_security_groups()
            .filters(vpc_filter(vpc_id))
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .security_groups()
            .iter()
            .filter_map(|sg| {
                Some(SecurityGroupSummary {
                    id: sg.group_id()?.to_string(),
                    name: sg.group_name().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    async fn revoke_ingress_rules(&self, group_id: &str) -> Result<(), ProviderError> {
        let resp = self
            .ec2
            .describe_security_groups()
            .group_ids(group_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        let permissions = resp
            .security_groups()
            .first()
            .map(|sg| sg.ip_permissions().to_vec())
            .unwrap_or_default();
        if permissions.is_empty() {
            return Ok(());
        }

        self.ec2
            .revoke_security_group_ingress()
            .group_id(group_id)
            .set_ip_permissions(Some(permissions))
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn revoke_egress_rules(&self, group_id: &str) -> Result<(), ProviderError> {
        let resp = self
            .ec2
            .describe_security_groups()
            .group_ids(group_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        let permissions = resp
            .security_groups()
            .first()
            .map(|sg| sg.ip_permissions_egress().to_vec())
            .unwrap_or_default();
        if permissions.is_empty() {
            return Ok(());
        }

        self.ec2
            .revoke_security_group_egress()
            .group_id(group_id)
            .set_ip_permissions(Some(permissions))
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<(), ProviderError> {
        self.ec2
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_route_tables(
        &self,
        vpc_id: &str,
    ) -> Result<Vec<RouteTableSummary>, ProviderError> {
        let resp = self
            .ec2
            .describe_route_tables()
            .filters(vpc_filter(vpc_id))
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .route_tables()
            .iter()
            .filter_map(|rt| {
                Some(RouteTableSummary {
                    id: rt.route_table_id()?.to_string(),
                    associations: rt
                        .associations()
                        .iter()
                        .filter_map(|a| {
                            Some(RouteTableAssociationSummary {
                                id: a.route_table_association_id()?.to_string(),
                                main: a.main().unwrap_or(false),
                            })
                        })
                        .collect(),
                })
            })
            .collect())
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<(), ProviderError> {
        self.ec2
            .disassociate_route_table()
            .association_id(association_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<(), ProviderError> {
        self.ec2
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_internet_gateways(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError> {
        let resp = self
            .ec2
            .describe_internet_gateways()
            .filters(
                Filter::builder()
                    .name("attachment.vpc-id")
                    .values(vpc_id)
                    .build(),
            )
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .internet_gateways()
            .iter()
            .filter_map(|igw| igw.internet_gateway_id())
            .map(str::to_string)
            .collect())
    }

    async fn detach_internet_gateway(
        &self,
        gateway_id: &str,
        vpc_id: &str,
    ) -> Result<(), ProviderError> {
        self.ec2
            .detach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<(), ProviderError> {
        self.ec2
            .delete_internet_gateway()
            .internet_gateway_id(gateway_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_nat_gateways(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError> {
        let resp = self
            .ec2
            .describe_nat_gateways()
            .filter(vpc_filter(vpc_id))
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .nat_gateways()
            .iter()
            .filter(|nat| {
                !matches!(
                    nat.state(),
                    Some(NatGatewayState::Deleting | NatGatewayState::Deleted)
                )
            })
            .filter_map(|nat| nat.nat_gateway_id())
            .map(str::to_string)
            .collect())
    }

    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), ProviderError> {
        self.ec2
            .delete_nat_gateway()
            .nat_gateway_id(nat_gateway_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError> {
        let resp = self
            .ec2
            .describe_subnets()
            .filters(vpc_filter(vpc_id))
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .subnets()
            .iter()
            .filter_map(|s| s.subnet_id())
            .map(str::to_string)
            .collect())
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<(), ProviderError> {
        self.ec2
            .delete_subnet()
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), ProviderError> {
        self.ec2
            .delete_vpc()
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }
}
