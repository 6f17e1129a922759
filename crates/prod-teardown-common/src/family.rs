//! Resource families and teardown ordering
//!
//! Every resource the tool can delete belongs to exactly one family, and
//! families are torn down in a single fixed order so that nothing is deleted
//! while something else still references it.

use serde::Serialize;

/// A category of cloud resource with its own internal teardown sub-steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceFamily {
    /// ECS clusters, services and task definitions
    Compute,
    /// Application load balancers, listeners, rules and target groups
    LoadBalancer,
    /// RDS instances and DB subnet groups
    Database,
    /// EFS filesystems, mount targets and access points
    FileSystem,
    /// Lambda functions and the EventBridge rules that invoke them
    Serverless,
    /// VPCs and everything inside them
    Network,
    /// IAM roles
    Identity,
}

/// The one teardown order every run follows.
///
/// - Compute goes first: services hold load balancer target registrations,
///   filesystem mounts and network interfaces.
/// - Load balancers must be gone before their target groups, and both before
///   the subnets and security groups they sit in.
/// - Databases and filesystems own ENIs and mount targets inside the VPC.
/// - Functions may be VPC-attached.
/// - The network can only be deleted once nothing lives in it.
/// - Roles go last since every other family may still be assuming them.
pub const FAMILY_ORDER: [ResourceFamily; 7] = [
    ResourceFamily::Compute,
    ResourceFamily::LoadBalancer,
    ResourceFamily::Database,
    ResourceFamily::FileSystem,
    ResourceFamily::Serverless,
    ResourceFamily::Network,
    ResourceFamily::Identity,
];

impl ResourceFamily {
    /// Stable identifier used in logs and JSON output
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceFamily::Compute => "compute",
            ResourceFamily::LoadBalancer => "load-balancer",
            ResourceFamily::Database => "database",
            ResourceFamily::FileSystem => "filesystem",
            ResourceFamily::Serverless => "serverless",
            ResourceFamily::Network => "network",
            ResourceFamily::Identity => "identity",
        }
    }

    /// Human-readable heading for the inventory report
    pub fn display_name(self) -> &'static str {
        match self {
            ResourceFamily::Compute => "ECS clusters and services",
            ResourceFamily::LoadBalancer => "Load balancers",
            ResourceFamily::Database => "RDS databases",
            ResourceFamily::FileSystem => "EFS filesystems",
            ResourceFamily::Serverless => "Lambda functions",
            ResourceFamily::Network => "VPCs",
            ResourceFamily::Identity => "IAM roles",
        }
    }
}

impl std::fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete resource types, top-level and nested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    EcsCluster,
    EcsService,
    TaskDefinition,
    LoadBalancer,
    Listener,
    ListenerRule,
    TargetGroup,
    DbInstance,
    DbSubnetGroup,
    FileSystem,
    MountTarget,
    AccessPoint,
    Function,
    FunctionVersion,
    EventRule,
    /// Rule that also invokes targets outside the project; only unbound
    SharedEventRule,
    EventTarget,
    Vpc,
    SecurityGroup,
    RouteTable,
    RouteTableAssociation,
    InternetGateway,
    NatGateway,
    Subnet,
    IamRole,
    AttachedPolicy,
    InlinePolicy,
    InstanceProfile,
}

impl ResourceKind {
    /// The family whose handler owns this kind
    pub fn family(self) -> ResourceFamily {
        use ResourceKind::*;
        match self {
            EcsCluster | EcsService | TaskDefinition => ResourceFamily::Compute,
            LoadBalancer | Listener | ListenerRule | TargetGroup => ResourceFamily::LoadBalancer,
            DbInstance | DbSubnetGroup => ResourceFamily::Database,
            FileSystem | MountTarget | AccessPoint => ResourceFamily::FileSystem,
            Function | FunctionVersion | EventRule | SharedEventRule | EventTarget => {
                ResourceFamily::Serverless
            }
            Vpc | SecurityGroup | RouteTable | RouteTableAssociation | InternetGateway
            | NatGateway | Subnet => ResourceFamily::Network,
            IamRole | AttachedPolicy | InlinePolicy | InstanceProfile => ResourceFamily::Identity,
        }
    }

    pub fn as_str(self) -> &'static str {
        use ResourceKind::*;
        match self {
            EcsCluster => "cluster",
            EcsService => "service",
            TaskDefinition => "task definition",
            LoadBalancer => "load balancer",
            Listener => "listener",
            ListenerRule => "listener rule",
            TargetGroup => "target group",
            DbInstance => "DB instance",
            DbSubnetGroup => "DB subnet group",
            FileSystem => "filesystem",
            MountTarget => "mount target",
            AccessPoint => "access point",
            Function => "function",
            FunctionVersion => "function version",
            EventRule => "EventBridge rule",
            SharedEventRule => "shared EventBridge rule",
            EventTarget => "rule target",
            Vpc => "VPC",
            SecurityGroup => "security group",
            RouteTable => "route table",
            RouteTableAssociation => "route table association",
            InternetGateway => "internet gateway",
            NatGateway => "NAT gateway",
            Subnet => "subnet",
            IamRole => "IAM role",
            AttachedPolicy => "attached policy",
            InlinePolicy => "inline policy",
            InstanceProfile => "instance profile",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
