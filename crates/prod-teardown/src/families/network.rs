//! VPCs and everything inside them
//!
//! Runs after every other family that can place an ENI in the VPC. Within a
//! VPC the order is: non-default security groups (all rules revoked before
//! any group is deleted, so groups referencing each other can go), non-main
//! route tables (after disassociation), internet gateways (detached first),
//! NAT gateways, subnets, and finally the VPC itself.

use super::{FamilyHandler, Recorder, or_empty};
use crate::aws::{NetworkOperations, ProviderError};
use prod_teardown_common::tags::{TAG_NAME, matches};
use prod_teardown_common::{
    DiscoveredResource, MatchStrategy, ProjectScope, ResourceFamily, ResourceKind, RunMode,
    TeardownOutcome,
};
use tracing::info;

const VPC_MATCH: MatchStrategy = MatchStrategy::Tag;

pub struct NetworkHandler<'a, P> {
    ec2: &'a P,
}

impl<'a, P: NetworkOperations> NetworkHandler<'a, P> {
    pub fn new(ec2: &'a P) -> Self {
        Self { ec2 }
    }

    async fn discover_contents(
        &self,
        vpc_id: &str,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let ec2 = self.ec2;
        let mut contents = Vec::new();

        let groups = or_empty(ec2.list_security_groups(vpc_id).await, "security groups", vpc_id)?;
        contents.extend(
            groups
                .into_iter()
                .filter(|sg| !sg.is_default())
                .map(|sg| DiscoveredResource::new(ResourceKind::SecurityGroup, sg.id, sg.name)),
        );

        let tables = or_empty(ec2.list_route_tables(vpc_id).await, "route tables", vpc_id)?;
        contents.extend(tables.into_iter().filter(|rt| !rt.is_main()).map(|rt| {
            let associations = rt
                .associations
                .into_iter()
                .filter(|a| !a.main)
                .map(|a| {
                    DiscoveredResource::new(ResourceKind::RouteTableAssociation, &a.id, &a.id)
                })
                .collect();
            DiscoveredResource::new(ResourceKind::RouteTable, &rt.id, &rt.id)
                .with_dependents(associations)
        }));

        let gateways = or_empty(
            ec2.list_internet_gateways(vpc_id).await,
            "internet gateways",
            vpc_id,
        )?;
        contents.extend(
            gateways
                .into_iter()
                .map(|id| DiscoveredResource::new(ResourceKind::InternetGateway, &id, &id)),
        );

        let nats = or_empty(ec2.list_nat_gateways(vpc_id).await, "NAT gateways", vpc_id)?;
        contents.extend(
            nats.into_iter()
                .map(|id| DiscoveredResource::new(ResourceKind::NatGateway, &id, &id)),
        );

        let subnets = or_empty(ec2.list_subnets(vpc_id).await, "subnets", vpc_id)?;
        contents.extend(
            subnets
                .into_iter()
                .map(|id| DiscoveredResource::new(ResourceKind::Subnet, &id, &id)),
        );

        Ok(contents)
    }
}

impl<P: NetworkOperations> FamilyHandler for NetworkHandler<'_, P> {
    fn family(&self) -> ResourceFamily {
        ResourceFamily::Network
    }

    async fn discover(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut found = Vec::new();
        let vpcs = or_empty(
            self.ec2.list_vpcs(&scope.project_tag).await,
            "list VPCs",
            &scope.region,
        )?;

        for vpc in vpcs {
            let name = vpc.tags.get(TAG_NAME).cloned().unwrap_or_else(|| vpc.id.clone());
            if !matches(VPC_MATCH, &name, &vpc.tags, scope) {
                continue;
            }
            let contents = self.discover_contents(&vpc.id).await?;
            found.push(
                DiscoveredResource::new(ResourceKind::Vpc, vpc.id, name)
                    .with_tags(vpc.tags)
                    .with_dependents(contents),
            );
        }

        Ok(found)
    }

    async fn teardown(
        &self,
        vpc: &DiscoveredResource,
        mode: RunMode,
    ) -> Result<TeardownOutcome, ProviderError> {
        let mut rec = Recorder::new(self.family(), mode);
        let ec2 = self.ec2;
        let vpc_id = vpc.id.as_str();

        if !rec.is_report_only() {
            info!(vpc = %vpc_id, name = %vpc.name, "Tearing down VPC");
        }

        // Every group's rules go before any group, so groups that name each
        // other no longer hold a reference when deleted
        for sg in vpc.dependents_of(ResourceKind::SecurityGroup) {
            let group_id = sg.id.as_str();
            rec.prepare(group_id, "revoke ingress", || ec2.revoke_ingress_rules(group_id))
                .await?;
            rec.prepare(group_id, "revoke egress", || ec2.revoke_egress_rules(group_id))
                .await?;
        }
        for sg in vpc.dependents_of(ResourceKind::SecurityGroup) {
            rec.remove(sg, || ec2.delete_security_group(&sg.id)).await?;
        }

        for rt in vpc.dependents_of(ResourceKind::RouteTable) {
            for assoc in rt.dependents_of(ResourceKind::RouteTableAssociation) {
                rec.remove(assoc, || ec2.disassociate_route_table(&assoc.id)).await?;
            }
            rec.remove(rt, || ec2.delete_route_table(&rt.id)).await?;
        }

        for igw in vpc.dependents_of(ResourceKind::InternetGateway) {
            let gateway_id = igw.id.as_str();
            rec.prepare(gateway_id, "detach", || {
                ec2.detach_internet_gateway(gateway_id, vpc_id)
            })
            .await?;
            rec.remove(igw, || ec2.delete_internet_gateway(gateway_id)).await?;
        }

        // NAT gateway deletion completes asynchronously; subnets that still
        // hold one fail and are recorded
        for nat in vpc.dependents_of(ResourceKind::NatGateway) {
            rec.remove(nat, || ec2.delete_nat_gateway(&nat.id)).await?;
        }

        for subnet in vpc.dependents_of(ResourceKind::Subnet) {
            rec.remove(subnet, || ec2.delete_subnet(&subnet.id)).await?;
        }

        rec.remove(vpc, || ec2.delete_vpc(vpc_id)).await?;

        Ok(rec.finish())
    }
}
