//! In-memory cloud for unit tests
//!
//! [`FakeCloud`] implements every operations trait over a plain state struct.
//! Each call is logged as `service.operation:id`. Deletes enforce the same
//! dependency rules AWS does (a VPC with subnets, a target group behind a
//! live load balancer, a subnet group with member instances), and deleted
//! resources that AWS removes asynchronously can be made to linger for a
//! number of status polls.

use crate::aws::ec2::{RouteTableSummary, SecurityGroupSummary, VpcSummary};
use crate::aws::efs::{FileSystemSummary, MountTargetSummary};
use crate::aws::elb::{ListenerRuleSummary, LoadBalancerSummary, TargetGroupSummary};
use crate::aws::lambda::{FunctionSummary, LATEST_VERSION, RuleTarget};
use crate::aws::rds::DbInstanceSummary;
use crate::aws::{
    EcsOperations, EfsOperations, ElbOperations, IamOperations, NetworkOperations, ProviderError,
    RdsOperations, ServerlessOperations, classify_aws_error,
};
use prod_teardown_common::tags::{TAG_PROJECT, tags_from};
use prod_teardown_common::{ProjectScope, Tags};
use std::collections::HashMap;
use std::sync::Mutex;

pub(crate) const PROJECT: &str = "prod-e";

pub(crate) fn scope() -> ProjectScope {
    ProjectScope::new(PROJECT, "us-west-2")
}

pub(crate) fn project_tags() -> Tags {
    tags_from([(TAG_PROJECT, PROJECT)])
}

#[derive(Debug, Clone)]
pub(crate) struct FakeCluster {
    pub arn: String,
    pub tags: Tags,
    pub services: Vec<String>,
}

impl FakeCluster {
    pub fn new(arn: &str, tags: Tags, services: &[&str]) -> Self {
        Self {
            arn: arn.into(),
            tags,
            services: services.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeListener {
    pub arn: String,
    pub rules: Vec<ListenerRuleSummary>,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeLoadBalancer {
    pub arn: String,
    pub name: String,
    pub tags: Tags,
    pub listeners: Vec<FakeListener>,
    pub target_groups: Vec<TargetGroupSummary>,
    pub deleted: bool,
}

impl FakeLoadBalancer {
    pub fn new(arn: &str, name: &str, tags: Tags) -> Self {
        Self {
            arn: arn.into(),
            name: name.into(),
            tags,
            listeners: Vec::new(),
            target_groups: Vec::new(),
            deleted: false,
        }
    }

    /// Every listener also gets the default rule AWS creates with it
    pub fn listener(mut self, arn: &str, rules: &[&str]) -> Self {
        let mut all = vec![ListenerRuleSummary {
            arn: format!("{arn}/default"),
            is_default: true,
        }];
        all.extend(rules.iter().map(|r| ListenerRuleSummary {
            arn: r.to_string(),
            is_default: false,
        }));
        self.listeners.push(FakeListener {
            arn: arn.into(),
            rules: all,
        });
        self
    }

    pub fn target_group(mut self, arn: &str, name: &str) -> Self {
        self.target_groups.push(TargetGroupSummary {
            arn: arn.into(),
            name: name.into(),
        });
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeDbSubnetGroup {
    pub name: String,
    /// Instances placed in the group
    pub members: Vec<String>,
}

impl FakeDbSubnetGroup {
    pub fn new(name: &str, members: &[&str]) -> Self {
        Self {
            name: name.into(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeFileSystem {
    pub id: String,
    pub name: String,
    pub tags: Tags,
    pub mount_targets: Vec<String>,
    pub access_points: Vec<String>,
    /// Mount targets deleted but still reported as deleting
    draining: Vec<String>,
}

impl FakeFileSystem {
    pub fn new(id: &str, name: &str, tags: Tags) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags,
            mount_targets: Vec::new(),
            access_points: Vec::new(),
            draining: Vec::new(),
        }
    }

    pub fn mount_targets(mut self, ids: &[&str]) -> Self {
        self.mount_targets.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn access_points(mut self, ids: &[&str]) -> Self {
        self.access_points.extend(ids.iter().map(|s| s.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeFunction {
    pub name: String,
    pub arn: String,
    pub tags: Tags,
    pub versions: Vec<String>,
}

impl FakeFunction {
    pub fn new(name: &str, arn: &str, tags: Tags) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            tags,
            versions: vec![LATEST_VERSION.to_string()],
        }
    }

    pub fn versions(mut self, versions: &[&str]) -> Self {
        self.versions.extend(versions.iter().map(|v| v.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeRule {
    pub name: String,
    pub targets: Vec<RuleTarget>,
}

impl FakeRule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            targets: Vec::new(),
        }
    }

    pub fn target(mut self, id: &str, arn: &str) -> Self {
        self.targets.push(RuleTarget {
            id: id.into(),
            arn: arn.into(),
        });
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeVpc {
    pub id: String,
    pub tags: Tags,
    pub security_groups: Vec<SecurityGroupSummary>,
    pub route_tables: Vec<RouteTableSummary>,
    pub internet_gateways: Vec<String>,
    pub nat_gateways: Vec<String>,
    pub subnets: Vec<String>,
    /// `(from, to)`: a rule in `from` names `to` as source or destination
    pub group_references: Vec<(String, String)>,
}

impl FakeVpc {
    pub fn new(id: &str, tags: Tags) -> Self {
        Self {
            id: id.into(),
            tags,
            security_groups: Vec::new(),
            route_tables: Vec::new(),
            internet_gateways: Vec::new(),
            nat_gateways: Vec::new(),
            subnets: Vec::new(),
            group_references: Vec::new(),
        }
    }

    pub fn group_reference(mut self, from: &str, to: &str) -> Self {
        self.group_references.push((from.into(), to.into()));
        self
    }

    pub fn security_group(mut self, sg: SecurityGroupSummary) -> Self {
        self.security_groups.push(sg);
        self
    }

    pub fn route_table(mut self, rt: RouteTableSummary) -> Self {
        self.route_tables.push(rt);
        self
    }

    pub fn internet_gateway(mut self, id: &str) -> Self {
        self.internet_gateways.push(id.into());
        self
    }

    pub fn nat_gateway(mut self, id: &str) -> Self {
        self.nat_gateways.push(id.into());
        self
    }

    pub fn subnet(mut self, id: &str) -> Self {
        self.subnets.push(id.into());
        self
    }

    /// Only the default group and the main route table may remain
    fn is_empty(&self) -> bool {
        self.security_groups.iter().all(SecurityGroupSummary::is_default)
            && self.route_tables.iter().all(RouteTableSummary::is_main)
            && self.internet_gateways.is_empty()
            && self.subnets.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRole {
    pub name: String,
    pub attached_policies: Vec<String>,
    pub inline_policies: Vec<String>,
    pub instance_profiles: Vec<String>,
}

impl FakeRole {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attached(mut self, arn: &str) -> Self {
        self.attached_policies.push(arn.into());
        self
    }

    pub fn inline(mut self, name: &str) -> Self {
        self.inline_policies.push(name.into());
        self
    }

    pub fn instance_profile(mut self, name: &str) -> Self {
        self.instance_profiles.push(name.into());
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub clusters: Vec<FakeCluster>,
    pub task_definitions: Vec<String>,
    pub load_balancers: Vec<FakeLoadBalancer>,
    pub db_instances: Vec<DbInstanceSummary>,
    pub db_subnet_groups: Vec<FakeDbSubnetGroup>,
    pub file_systems: Vec<FakeFileSystem>,
    pub functions: Vec<FakeFunction>,
    pub rules: Vec<FakeRule>,
    pub vpcs: Vec<FakeVpc>,
    pub roles: Vec<FakeRole>,
}

#[derive(Debug, Clone)]
struct Call {
    key: String,
    mutating: bool,
}

#[derive(Default)]
pub(crate) struct FakeCloud {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<String, String>>,
    linger: Mutex<u32>,
    lingering: Mutex<HashMap<String, u32>>,
}

fn not_found(what: &str, id: &str) -> ProviderError {
    classify_aws_error(Some("ResourceNotFoundException"), &format!("{what} {id} not found"))
}

fn in_use(code: &str, id: &str) -> ProviderError {
    classify_aws_error(Some(code), &format!("{id} is still in use"))
}

/// Remove the first element matching `pred`, or fail with not-found
fn take<T>(
    items: &mut Vec<T>,
    pred: impl Fn(&T) -> bool,
    what: &str,
    id: &str,
) -> Result<T, ProviderError> {
    match items.iter().position(pred) {
        Some(i) => Ok(items.remove(i)),
        None => Err(not_found(what, id)),
    }
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Keep deleted services, load balancers and mount targets visible for
    /// `polls` more status checks
    pub fn set_linger(&self, polls: u32) {
        *self.linger.lock().unwrap() = polls;
    }

    /// Fail every call with this key using the given AWS error code
    pub fn fail_on(&self, key: &str, code: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), code.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.key.clone()).collect()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    /// Calls that change state, in order
    pub fn mutations(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.mutating)
            .map(|c| c.key.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn read(&self, key: String) -> Result<(), ProviderError> {
        self.log(key, false)
    }

    fn write(&self, key: String) -> Result<(), ProviderError> {
        self.log(key, true)
    }

    fn log(&self, key: String, mutating: bool) -> Result<(), ProviderError> {
        let injected = self.failures.lock().unwrap().get(&key).cloned();
        self.calls.lock().unwrap().push(Call { key, mutating });
        match injected {
            Some(code) => Err(classify_aws_error(Some(&code), "injected failure")),
            None => Ok(()),
        }
    }

    fn start_lingering(&self, id: &str) -> bool {
        let polls = *self.linger.lock().unwrap();
        if polls > 0 {
            self.lingering.lock().unwrap().insert(id.to_string(), polls);
        }
        polls > 0
    }

    /// Whether a deleted resource is still reported by this poll
    fn still_lingering(&self, id: &str) -> bool {
        let mut lingering = self.lingering.lock().unwrap();
        match lingering.get_mut(id) {
            Some(0) => {
                lingering.remove(id);
                false
            }
            Some(remaining) => {
                *remaining -= 1;
                true
            }
            None => false,
        }
    }
}

impl EcsOperations for FakeCloud {
    async fn list_clusters(&self) -> Result<Vec<String>, ProviderError> {
        self.read("ecs.list_clusters".into())?;
        Ok(self.with_state(|s| s.clusters.iter().map(|c| c.arn.clone()).collect()))
    }

    async fn cluster_tags(&self, cluster_arn: &str) -> Result<Tags, ProviderError> {
        self.read(format!("ecs.cluster_tags:{cluster_arn}"))?;
        self.with_state(|s| {
            s.clusters
                .iter()
                .find(|c| c.arn == cluster_arn)
                .map(|c| c.tags.clone())
                .ok_or_else(|| not_found("cluster", cluster_arn))
        })
    }

    async fn list_services(&self, cluster_arn: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("ecs.list_services:{cluster_arn}"))?;
        self.with_state(|s| {
            s.clusters
                .iter()
                .find(|c| c.arn == cluster_arn)
                .map(|c| c.services.clone())
                .ok_or_else(|| not_found("cluster", cluster_arn))
        })
    }

    async fn scale_service_to_zero(
        &self,
        cluster_arn: &str,
        service_arn: &str,
    ) -> Result<(), ProviderError> {
        self.write(format!("ecs.scale_service_to_zero:{service_arn}"))?;
        self.with_state(|s| {
            let known = s
                .clusters
                .iter()
                .any(|c| c.arn == cluster_arn && c.services.iter().any(|svc| svc == service_arn));
            if known { Ok(()) } else { Err(not_found("service", service_arn)) }
        })
    }

    async fn delete_service(
        &self,
        cluster_arn: &str,
        service_arn: &str,
    ) -> Result<(), ProviderError> {
        self.write(format!("ecs.delete_service:{service_arn}"))?;
        self.with_state(|s| {
            let cluster = s
                .clusters
                .iter_mut()
                .find(|c| c.arn == cluster_arn)
                .ok_or_else(|| not_found("cluster", cluster_arn))?;
            take(&mut cluster.services, |svc| svc == service_arn, "service", service_arn)
        })?;
        self.start_lingering(service_arn);
        Ok(())
    }

    async fn service_status(
        &self,
        cluster_arn: &str,
        service_arn: &str,
    ) -> Result<Option<String>, ProviderError> {
        self.read(format!("ecs.service_status:{service_arn}"))?;
        let active = self.with_state(|s| {
            s.clusters
                .iter()
                .any(|c| c.arn == cluster_arn && c.services.iter().any(|svc| svc == service_arn))
        });
        if active {
            Ok(Some("ACTIVE".into()))
        } else if self.still_lingering(service_arn) {
            Ok(Some("DRAINING".into()))
        } else {
            Ok(None)
        }
    }

    async fn delete_cluster(&self, cluster_arn: &str) -> Result<(), ProviderError> {
        self.write(format!("ecs.delete_cluster:{cluster_arn}"))?;
        self.with_state(|s| {
            let busy = s
                .clusters
                .iter()
                .any(|c| c.arn == cluster_arn && !c.services.is_empty());
            if busy {
                return Err(in_use("ClusterContainsServicesException", cluster_arn));
            }
            take(&mut s.clusters, |c| c.arn == cluster_arn, "cluster", cluster_arn).map(|_| ())
        })
    }

    async fn list_task_definitions(&self) -> Result<Vec<String>, ProviderError> {
        self.read("ecs.list_task_definitions".into())?;
        Ok(self.with_state(|s| s.task_definitions.clone()))
    }

    async fn deregister_task_definition(&self, arn: &str) -> Result<(), ProviderError> {
        self.write(format!("ecs.deregister_task_definition:{arn}"))?;
        self.with_state(|s| {
            take(&mut s.task_definitions, |t| t == arn, "task definition", arn).map(|_| ())
        })
    }
}

impl ElbOperations for FakeCloud {
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancerSummary>, ProviderError> {
        self.read("elb.list_load_balancers".into())?;
        Ok(self.with_state(|s| {
            s.load_balancers
                .iter()
                .filter(|lb| !lb.deleted)
                .map(|lb| LoadBalancerSummary {
                    arn: lb.arn.clone(),
                    name: lb.name.clone(),
                })
                .collect()
        }))
    }

    async fn load_balancer_tags(&self, arn: &str) -> Result<Tags, ProviderError> {
        self.read(format!("elb.load_balancer_tags:{arn}"))?;
        self.with_state(|s| {
            s.load_balancers
                .iter()
                .find(|lb| lb.arn == arn && !lb.deleted)
                .map(|lb| lb.tags.clone())
                .ok_or_else(|| not_found("load balancer", arn))
        })
    }

    async fn list_listeners(&self, load_balancer_arn: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("elb.list_listeners:{load_balancer_arn}"))?;
        Ok(self.with_state(|s| {
            s.load_balancers
                .iter()
                .filter(|lb| lb.arn == load_balancer_arn)
                .flat_map(|lb| lb.listeners.iter().map(|l| l.arn.clone()))
                .collect()
        }))
    }

    async fn list_rules(
        &self,
        listener_arn: &str,
    ) -> Result<Vec<ListenerRuleSummary>, ProviderError> {
        self.read(format!("elb.list_rules:{listener_arn}"))?;
        self.with_state(|s| {
            s.load_balancers
                .iter()
                .flat_map(|lb| lb.listeners.iter())
                .find(|l| l.arn == listener_arn)
                .map(|l| l.rules.clone())
                .ok_or_else(|| not_found("listener", listener_arn))
        })
    }

    async fn delete_rule(&self, rule_arn: &str) -> Result<(), ProviderError> {
        self.write(format!("elb.delete_rule:{rule_arn}"))?;
        self.with_state(|s| {
            for listener in s.load_balancers.iter_mut().flat_map(|lb| lb.listeners.iter_mut()) {
                if let Some(i) = listener.rules.iter().position(|r| r.arn == rule_arn) {
                    if listener.rules[i].is_default {
                        return Err(classify_aws_error(
                            Some("OperationNotPermitted"),
                            "Default rules cannot be deleted",
                        ));
                    }
                    listener.rules.remove(i);
                    return Ok(());
                }
            }
            Err(not_found("rule", rule_arn))
        })
    }

    async fn delete_listener(&self, listener_arn: &str) -> Result<(), ProviderError> {
        self.write(format!("elb.delete_listener:{listener_arn}"))?;
        self.with_state(|s| {
            for lb in &mut s.load_balancers {
                if let Some(i) = lb.listeners.iter().position(|l| l.arn == listener_arn) {
                    lb.listeners.remove(i);
                    return Ok(());
                }
            }
            Err(not_found("listener", listener_arn))
        })
    }

    async fn list_target_groups(
        &self,
        load_balancer_arn: &str,
    ) -> Result<Vec<TargetGroupSummary>, ProviderError> {
        self.read(format!("elb.list_target_groups:{load_balancer_arn}"))?;
        Ok(self.with_state(|s| {
            s.load_balancers
                .iter()
                .filter(|lb| lb.arn == load_balancer_arn)
                .flat_map(|lb| lb.target_groups.clone())
                .collect()
        }))
    }

    async fn delete_load_balancer(&self, arn: &str) -> Result<(), ProviderError> {
        self.write(format!("elb.delete_load_balancer:{arn}"))?;
        self.with_state(|s| {
            let lb = s
                .load_balancers
                .iter_mut()
                .find(|lb| lb.arn == arn && !lb.deleted)
                .ok_or_else(|| not_found("load balancer", arn))?;
            lb.deleted = true;
            lb.listeners.clear();
            Ok::<_, ProviderError>(())
        })?;
        self.start_lingering(arn);
        Ok(())
    }

    async fn load_balancer_exists(&self, arn: &str) -> Result<bool, ProviderError> {
        self.read(format!("elb.load_balancer_exists:{arn}"))?;
        let live = self.with_state(|s| {
            s.load_balancers
                .iter()
                .any(|lb| lb.arn == arn && !lb.deleted)
        });
        Ok(live || self.still_lingering(arn))
    }

    async fn delete_target_group(&self, arn: &str) -> Result<(), ProviderError> {
        self.write(format!("elb.delete_target_group:{arn}"))?;
        let owner = self.with_state(|s| {
            s.load_balancers
                .iter()
                .find(|lb| lb.target_groups.iter().any(|tg| tg.arn == arn))
                .map(|lb| (lb.arn.clone(), lb.deleted))
        });
        let (lb_arn, lb_deleted) = owner.ok_or_else(|| not_found("target group", arn))?;
        if !lb_deleted || self.lingering.lock().unwrap().contains_key(&lb_arn) {
            return Err(in_use("ResourceInUse", arn));
        }
        self.with_state(|s| {
            for lb in &mut s.load_balancers {
                lb.target_groups.retain(|tg| tg.arn != arn);
            }
        });
        Ok(())
    }
}

impl RdsOperations for FakeCloud {
    async fn list_db_instances(&self) -> Result<Vec<DbInstanceSummary>, ProviderError> {
        self.read("rds.list_db_instances".into())?;
        Ok(self.with_state(|s| s.db_instances.clone()))
    }

    async fn delete_db_instance(&self, identifier: &str) -> Result<(), ProviderError> {
        self.write(format!("rds.delete_db_instance:{identifier}"))?;
        self.with_state(|s| {
            take(
                &mut s.db_instances,
                |db| db.identifier == identifier,
                "DB instance",
                identifier,
            )
            .map(|_| ())
        })
    }

    async fn list_db_subnet_groups(&self) -> Result<Vec<String>, ProviderError> {
        self.read("rds.list_db_subnet_groups".into())?;
        Ok(self.with_state(|s| s.db_subnet_groups.iter().map(|g| g.name.clone()).collect()))
    }

    async fn delete_db_subnet_group(&self, name: &str) -> Result<(), ProviderError> {
        self.write(format!("rds.delete_db_subnet_group:{name}"))?;
        self.with_state(|s| {
            let occupied = s.db_subnet_groups.iter().any(|g| {
                g.name == name
                    && g
                        .members
                        .iter()
                        .any(|m| s.db_instances.iter().any(|db| &db.identifier == m))
            });
            if occupied {
                return Err(in_use("InvalidDBSubnetGroupStateFault", name));
            }
            take(&mut s.db_subnet_groups, |g| g.name == name, "DB subnet group", name).map(|_| ())
        })
    }
}

impl EfsOperations for FakeCloud {
    async fn list_file_systems(&self) -> Result<Vec<FileSystemSummary>, ProviderError> {
        self.read("efs.list_file_systems".into())?;
        Ok(self.with_state(|s| {
            s.file_systems
                .iter()
                .map(|fs| FileSystemSummary {
                    id: fs.id.clone(),
                    name: fs.name.clone(),
                    tags: fs.tags.clone(),
                })
                .collect()
        }))
    }

    async fn list_mount_targets(
        &self,
        file_system_id: &str,
    ) -> Result<Vec<MountTargetSummary>, ProviderError> {
        self.read(format!("efs.list_mount_targets:{file_system_id}"))?;
        let (live, draining) = self.with_state(|s| {
            s.file_systems
                .iter()
                .find(|fs| fs.id == file_system_id)
                .map(|fs| (fs.mount_targets.clone(), fs.draining.clone()))
                .ok_or_else(|| not_found("filesystem", file_system_id))
        })?;

        let still_draining: Vec<_> = draining
            .into_iter()
            .filter(|id| self.still_lingering(id))
            .collect();
        self.with_state(|s| {
            if let Some(fs) = s.file_systems.iter_mut().find(|fs| fs.id == file_system_id) {
                fs.draining.clone_from(&still_draining);
            }
        });

        let summary = |id: String, deleting: bool| MountTargetSummary {
            subnet_id: format!("subnet-for-{id}"),
            id,
            deleting,
        };
        Ok(live
            .into_iter()
            .map(|id| summary(id, false))
            .chain(still_draining.into_iter().map(|id| summary(id, true)))
            .collect())
    }

    async fn delete_mount_target(&self, mount_target_id: &str) -> Result<(), ProviderError> {
        self.write(format!("efs.delete_mount_target:{mount_target_id}"))?;
        let lingers = self.start_lingering(mount_target_id);
        self.with_state(|s| {
            let fs = s
                .file_systems
                .iter_mut()
                .find(|fs| fs.mount_targets.iter().any(|mt| mt == mount_target_id))
                .ok_or_else(|| not_found("mount target", mount_target_id))?;
            fs.mount_targets.retain(|mt| mt != mount_target_id);
            if lingers {
                fs.draining.push(mount_target_id.to_string());
            }
            Ok(())
        })
    }

    async fn list_access_points(&self, file_system_id: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("efs.list_access_points:{file_system_id}"))?;
        Ok(self.with_state(|s| {
            s.file_systems
                .iter()
                .filter(|fs| fs.id == file_system_id)
                .flat_map(|fs| fs.access_points.clone())
                .collect()
        }))
    }

    async fn delete_access_point(&self, access_point_id: &str) -> Result<(), ProviderError> {
        self.write(format!("efs.delete_access_point:{access_point_id}"))?;
        self.with_state(|s| {
            let fs = s
                .file_systems
                .iter_mut()
                .find(|fs| fs.access_points.iter().any(|ap| ap == access_point_id))
                .ok_or_else(|| not_found("access point", access_point_id))?;
            fs.access_points.retain(|ap| ap != access_point_id);
            Ok(())
        })
    }

    async fn delete_file_system(&self, file_system_id: &str) -> Result<(), ProviderError> {
        self.write(format!("efs.delete_file_system:{file_system_id}"))?;
        self.with_state(|s| {
            let busy = s.file_systems.iter().any(|fs| {
                fs.id == file_system_id && !(fs.mount_targets.is_empty() && fs.draining.is_empty())
            });
            if busy {
                return Err(in_use("FileSystemInUse", file_system_id));
            }
            take(
                &mut s.file_systems,
                |fs| fs.id == file_system_id,
                "filesystem",
                file_system_id,
            )
            .map(|_| ())
        })
    }
}

impl ServerlessOperations for FakeCloud {
    async fn list_functions(&self) -> Result<Vec<FunctionSummary>, ProviderError> {
        self.read("lambda.list_functions".into())?;
        Ok(self.with_state(|s| {
            s.functions
                .iter()
                .map(|f| FunctionSummary {
                    name: f.name.clone(),
                    arn: f.arn.clone(),
                })
                .collect()
        }))
    }

    async fn function_tags(&self, function_arn: &str) -> Result<Tags, ProviderError> {
        self.read(format!("lambda.function_tags:{function_arn}"))?;
        self.with_state(|s| {
            s.functions
                .iter()
                .find(|f| f.arn == function_arn)
                .map(|f| f.tags.clone())
                .ok_or_else(|| not_found("function", function_arn))
        })
    }

    async fn list_versions(&self, function_name: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("lambda.list_versions:{function_name}"))?;
        self.with_state(|s| {
            s.functions
                .iter()
                .find(|f| f.name == function_name)
                .map(|f| f.versions.clone())
                .ok_or_else(|| not_found("function", function_name))
        })
    }

    async fn delete_function_version(
        &self,
        function_name: &str,
        version: &str,
    ) -> Result<(), ProviderError> {
        self.write(format!("lambda.delete_function_version:{function_name}:{version}"))?;
        if version == LATEST_VERSION {
            return Err(classify_aws_error(
                Some("InvalidParameterValueException"),
                "$LATEST version cannot be deleted without deleting the function",
            ));
        }
        self.with_state(|s| {
            let function = s
                .functions
                .iter_mut()
                .find(|f| f.name == function_name)
                .ok_or_else(|| not_found("function", function_name))?;
            take(&mut function.versions, |v| v == version, "version", version).map(|_| ())
        })
    }

    async fn delete_function(&self, function_name: &str) -> Result<(), ProviderError> {
        self.write(format!("lambda.delete_function:{function_name}"))?;
        self.with_state(|s| {
            take(&mut s.functions, |f| f.name == function_name, "function", function_name)
                .map(|_| ())
        })
    }

    async fn list_rules_targeting(&self, target_arn: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("events.list_rules_targeting:{target_arn}"))?;
        Ok(self.with_state(|s| {
            s.rules
                .iter()
                .filter(|r| r.targets.iter().any(|t| t.arn == target_arn))
                .map(|r| r.name.clone())
                .collect()
        }))
    }

    async fn list_rule_targets(&self, rule_name: &str) -> Result<Vec<RuleTarget>, ProviderError> {
        self.read(format!("events.list_rule_targets:{rule_name}"))?;
        self.with_state(|s| {
            s.rules
                .iter()
                .find(|r| r.name == rule_name)
                .map(|r| r.targets.clone())
                .ok_or_else(|| not_found("rule", rule_name))
        })
    }

    async fn remove_rule_target(
        &self,
        rule_name: &str,
        target_id: &str,
    ) -> Result<(), ProviderError> {
        self.write(format!("events.remove_rule_target:{target_id}"))?;
        self.with_state(|s| {
            let rule = s
                .rules
                .iter_mut()
                .find(|r| r.name == rule_name)
                .ok_or_else(|| not_found("rule", rule_name))?;
            take(&mut rule.targets, |t| t.id == target_id, "target", target_id).map(|_| ())
        })
    }

    async fn delete_rule(&self, rule_name: &str) -> Result<(), ProviderError> {
        self.write(format!("events.delete_rule:{rule_name}"))?;
        self.with_state(|s| {
            if s.rules.iter().any(|r| r.name == rule_name && !r.targets.is_empty()) {
                return Err(classify_aws_error(
                    Some("ValidationException"),
                    "Rule can't be deleted since it has targets.",
                ));
            }
            take(&mut s.rules, |r| r.name == rule_name, "rule", rule_name).map(|_| ())
        })
    }
}

impl FakeCloud {
    fn with_vpc<R>(
        &self,
        pred: impl Fn(&FakeVpc) -> bool,
        id: &str,
        f: impl FnOnce(&mut FakeVpc) -> Result<R, ProviderError>,
    ) -> Result<R, ProviderError> {
        self.with_state(|s| match s.vpcs.iter_mut().find(|v| pred(v)) {
            Some(vpc) => f(vpc),
            None => Err(not_found("VPC resource", id)),
        })
    }

    fn drop_group_references(&self, group_id: &str) {
        self.with_state(|s| {
            for vpc in &mut s.vpcs {
                vpc.group_references.retain(|(from, _)| from != group_id);
            }
        });
    }
}

impl NetworkOperations for FakeCloud {
    async fn list_vpcs(&self, project_tag: &str) -> Result<Vec<VpcSummary>, ProviderError> {
        self.read("ec2.list_vpcs".into())?;
        Ok(self.with_state(|s| {
            s.vpcs
                .iter()
                .filter(|v| v.tags.get(TAG_PROJECT).map(String::as_str) == Some(project_tag))
                .map(|v| VpcSummary {
                    id: v.id.clone(),
                    tags: v.tags.clone(),
                })
                .collect()
        }))
    }

    async fn list_security_groups(
        &self,
        vpc_id: &str,
    ) -> Result<Vec<SecurityGroupSummary>, ProviderError> {
        self.read(format!("ec2.list_security_groups:{vpc_id}"))?;
        self.with_vpc(|v| v.id == vpc_id, vpc_id, |v| Ok(v.security_groups.clone()))
    }

    async fn revoke_ingress_rules(&self, group_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.revoke_ingress_rules:{group_id}"))?;
        self.drop_group_references(group_id);
        Ok(())
    }

    async fn revoke_egress_rules(&self, group_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.revoke_egress_rules:{group_id}"))?;
        self.drop_group_references(group_id);
        Ok(())
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.delete_security_group:{group_id}"))?;
        self.with_vpc(
            |v| v.security_groups.iter().any(|sg| sg.id == group_id),
            group_id,
            |v| {
                let referenced = v
                    .group_references
                    .iter()
                    .any(|(from, to)| to == group_id && from != group_id);
                if referenced {
                    return Err(in_use("DependencyViolation", group_id));
                }
                v.security_groups.retain(|sg| sg.id != group_id);
                v.group_references.retain(|(from, _)| from != group_id);
                Ok(())
            },
        )
    }

    async fn list_route_tables(
        &self,
        vpc_id: &str,
    ) -> Result<Vec<RouteTableSummary>, ProviderError> {
        self.read(format!("ec2.list_route_tables:{vpc_id}"))?;
        self.with_vpc(|v| v.id == vpc_id, vpc_id, |v| Ok(v.route_tables.clone()))
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.disassociate_route_table:{association_id}"))?;
        let owns = |rt: &RouteTableSummary| rt.associations.iter().any(|a| a.id == association_id);
        self.with_vpc(
            |v| v.route_tables.iter().any(owns),
            association_id,
            |v| {
                for rt in &mut v.route_tables {
                    rt.associations.retain(|a| a.id != association_id);
                }
                Ok(())
            },
        )
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.delete_route_table:{route_table_id}"))?;
        self.with_vpc(
            |v| v.route_tables.iter().any(|rt| rt.id == route_table_id),
            route_table_id,
            |v| {
                if v
                    .route_tables
                    .iter()
                    .any(|rt| rt.id == route_table_id && !rt.associations.is_empty())
                {
                    return Err(in_use("DependencyViolation", route_table_id));
                }
                v.route_tables.retain(|rt| rt.id != route_table_id);
                Ok(())
            },
        )
    }

    async fn list_internet_gateways(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("ec2.list_internet_gateways:{vpc_id}"))?;
        self.with_vpc(|v| v.id == vpc_id, vpc_id, |v| Ok(v.internet_gateways.clone()))
    }

    async fn detach_internet_gateway(
        &self,
        gateway_id: &str,
        vpc_id: &str,
    ) -> Result<(), ProviderError> {
        self.write(format!("ec2.detach_internet_gateway:{gateway_id}"))?;
        self.with_vpc(
            |v| v.id == vpc_id && v.internet_gateways.iter().any(|g| g == gateway_id),
            gateway_id,
            |_| Ok(()),
        )
    }

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.delete_internet_gateway:{gateway_id}"))?;
        self.with_vpc(
            |v| v.internet_gateways.iter().any(|g| g == gateway_id),
            gateway_id,
            |v| {
                v.internet_gateways.retain(|g| g != gateway_id);
                Ok(())
            },
        )
    }

    async fn list_nat_gateways(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("ec2.list_nat_gateways:{vpc_id}"))?;
        self.with_vpc(|v| v.id == vpc_id, vpc_id, |v| Ok(v.nat_gateways.clone()))
    }

    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.delete_nat_gateway:{nat_gateway_id}"))?;
        self.with_vpc(
            |v| v.nat_gateways.iter().any(|n| n == nat_gateway_id),
            nat_gateway_id,
            |v| {
                v.nat_gateways.retain(|n| n != nat_gateway_id);
                Ok(())
            },
        )
    }

    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("ec2.list_subnets:{vpc_id}"))?;
        self.with_vpc(|v| v.id == vpc_id, vpc_id, |v| Ok(v.subnets.clone()))
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.delete_subnet:{subnet_id}"))?;
        self.with_vpc(
            |v| v.subnets.iter().any(|s| s == subnet_id),
            subnet_id,
            |v| {
                v.subnets.retain(|s| s != subnet_id);
                Ok(())
            },
        )
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), ProviderError> {
        self.write(format!("ec2.delete_vpc:{vpc_id}"))?;
        self.with_state(|s| {
            let vpc = s
                .vpcs
                .iter()
                .find(|v| v.id == vpc_id)
                .ok_or_else(|| not_found("VPC", vpc_id))?;
            if !vpc.is_empty() {
                return Err(in_use("DependencyViolation", vpc_id));
            }
            s.vpcs.retain(|v| v.id != vpc_id);
            Ok(())
        })
    }
}

impl FakeCloud {
    fn with_role<R>(
        &self,
        role_name: &str,
        f: impl FnOnce(&mut FakeRole) -> Result<R, ProviderError>,
    ) -> Result<R, ProviderError> {
        self.with_state(|s| match s.roles.iter_mut().find(|r| r.name == role_name) {
            Some(role) => f(role),
            None => Err(classify_aws_error(
                Some("NoSuchEntity"),
                &format!("The role with name {role_name} cannot be found."),
            )),
        })
    }
}

impl IamOperations for FakeCloud {
    async fn list_roles(&self) -> Result<Vec<String>, ProviderError> {
        self.read("iam.list_roles".into())?;
        Ok(self.with_state(|s| s.roles.iter().map(|r| r.name.clone()).collect()))
    }

    async fn list_attached_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("iam.list_attached_policies:{role_name}"))?;
        self.with_role(role_name, |r| Ok(r.attached_policies.clone()))
    }

    async fn detach_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), ProviderError> {
        self.write(format!("iam.detach_policy:{role_name}:{policy_arn}"))?;
        self.with_role(role_name, |r| {
            take(&mut r.attached_policies, |p| p == policy_arn, "policy", policy_arn).map(|_| ())
        })
    }

    async fn list_inline_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("iam.list_inline_policies:{role_name}"))?;
        self.with_role(role_name, |r| Ok(r.inline_policies.clone()))
    }

    async fn delete_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> Result<(), ProviderError> {
        self.write(format!("iam.delete_inline_policy:{role_name}:{policy_name}"))?;
        self.with_role(role_name, |r| {
            take(&mut r.inline_policies, |p| p == policy_name, "policy", policy_name).map(|_| ())
        })
    }

    async fn list_instance_profiles(&self, role_name: &str) -> Result<Vec<String>, ProviderError> {
        self.read(format!("iam.list_instance_profiles:{role_name}"))?;
        self.with_role(role_name, |r| Ok(r.instance_profiles.clone()))
    }

    async fn remove_role_from_instance_profile(
        &self,
        role_name: &str,
        profile_name: &str,
    ) -> Result<(), ProviderError> {
        self.write(format!("iam.remove_role_from_instance_profile:{role_name}:{profile_name}"))?;
        self.with_role(role_name, |r| {
            take(&mut r.instance_profiles, |p| p == profile_name, "profile", profile_name)
                .map(|_| ())
        })
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), ProviderError> {
        self.write(format!("iam.delete_role:{role_name}"))?;
        self.with_state(|s| {
            let role = s
                .roles
                .iter()
                .find(|r| r.name == role_name)
                .ok_or_else(|| classify_aws_error(Some("NoSuchEntity"), role_name))?;
            if !(role.attached_policies.is_empty()
                && role.inline_policies.is_empty()
                && role.instance_profiles.is_empty())
            {
                return Err(in_use("DeleteConflict", role_name));
            }
            s.roles.retain(|r| r.name != role_name);
            Ok(())
        })
    }
}
