//! Container cluster, load balancer and services.

use super::{Handle, Output, StackBuilder};
use crate::core::types::*;
use indexmap::IndexMap;
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct Cluster {
    pub cluster: Handle,
}

impl Cluster {
    pub fn arn(&self) -> Output {
        self.cluster.output("arn")
    }
}

pub fn cluster(b: &mut StackBuilder, id: &str) -> Cluster {
    let cluster = b.add(
        id,
        ResourceKind::ComputeCluster(ComputeClusterSpec::default()),
    );
    Cluster { cluster }
}

#[derive(Debug, Clone)]
pub struct LoadBalancer {
    pub balancer: Handle,
}

impl LoadBalancer {
    pub fn dns_name(&self) -> Output {
        self.balancer.output("dns_name")
    }

    pub fn target_group(&self) -> Output {
        self.balancer.output("target_group_arn")
    }
}

/// HTTP :80 and HTTPS :443 in front of one target group.
pub fn load_balancer(
    b: &mut StackBuilder,
    id: &str,
    certificate: &Handle,
    target_port: u16,
) -> LoadBalancer {
    let balancer = b.add(
        id,
        ResourceKind::LoadBalancer(LoadBalancerSpec {
            listeners: vec![
                Listener {
                    port: 80,
                    protocol: ListenerProtocol::Http,
                    certificate_arn: None,
                },
                Listener {
                    port: 443,
                    protocol: ListenerProtocol::Https,
                    certificate_arn: Some(certificate.output("arn").to_string()),
                },
            ],
            target_port,
            health_check_path: "/".to_string(),
        }),
    );
    LoadBalancer { balancer }
}

#[derive(Debug, Clone)]
pub struct Service {
    pub service: Handle,
}

impl Service {
    pub fn name(&self) -> Output {
        self.service.output("name")
    }
}

/// Container settings shared by every service.
pub struct ServiceArgs<'a> {
    pub name: &'a str,
    pub image: &'a dyn Display,
    pub cpu: u32,
    pub memory: u32,
    pub environment: IndexMap<String, String>,
}

fn service_spec(cluster: &Cluster, args: ServiceArgs<'_>) -> ServiceSpec {
    ServiceSpec {
        cluster: cluster.arn().to_string(),
        image: args.image.to_string(),
        container_name: Some(args.name.to_string()),
        cpu: args.cpu,
        memory: args.memory,
        essential: true,
        assign_public_ip: true,
        desired_count: 1,
        port_mappings: Vec::new(),
        environment: args.environment,
    }
}

/// A service reachable through the load balancer's target group.
pub fn api_service(
    b: &mut StackBuilder,
    id: &str,
    cluster: &Cluster,
    balancer: &LoadBalancer,
    container_port: u16,
    args: ServiceArgs<'_>,
) -> Service {
    let mut spec = service_spec(cluster, args);
    spec.port_mappings.push(PortMapping {
        container_port,
        target_group: Some(balancer.target_group().to_string()),
    });
    Service {
        service: b.add(id, ResourceKind::Service(spec)),
    }
}

/// A background service with no inbound traffic.
pub fn worker_service(
    b: &mut StackBuilder,
    id: &str,
    cluster: &Cluster,
    args: ServiceArgs<'_>,
) -> Service {
    Service {
        service: b.add(id, ResourceKind::Service(service_spec(cluster, args))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::frontend::certificate;

    #[test]
    fn test_api_service_binds_target_group() {
        let mut b = StackBuilder::new("t");
        let arn = "arn:aws:acm:eu-central-1:000000000000:certificate/x";
        let cert = certificate(&mut b, "cert", &arn);
        let ecs = cluster(&mut b, "cluster");
        let lb = load_balancer(&mut b, "lb", &cert, 80);
        let api = api_service(
            &mut b,
            "api",
            &ecs,
            &lb,
            80,
            ServiceArgs {
                name: "api",
                image: &"img",
                cpu: 128,
                memory: 512,
                environment: IndexMap::new(),
            },
        );
        let worker = worker_service(
            &mut b,
            "worker",
            &ecs,
            ServiceArgs {
                name: "worker",
                image: &"img",
                cpu: 128,
                memory: 512,
                environment: IndexMap::new(),
            },
        );
        assert_eq!(api.name().to_string(), "{{api.name}}");
        assert_eq!(lb.dns_name().to_string(), "{{lb.dns_name}}");

        let config = b.build();
        match (
            &config.resources[api.service.id()].kind,
            &config.resources[worker.service.id()].kind,
        ) {
            (ResourceKind::Service(a), ResourceKind::Service(w)) => {
                assert_eq!(a.cluster, "{{cluster.arn}}");
                assert_eq!(
                    a.port_mappings[0].target_group.as_deref(),
                    Some("{{lb.target_group_arn}}")
                );
                assert!(w.port_mappings.is_empty());
            }
            other => panic!("unexpected kinds: {:?}", other),
        }
    }
}
