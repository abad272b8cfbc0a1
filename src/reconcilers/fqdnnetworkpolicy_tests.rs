#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{
        FQDNNetworkPolicy, FQDNNetworkPolicyEgressRule, FQDNNetworkPolicyIngressRule,
        FQDNNetworkPolicyPeer, FQDNNetworkPolicySpec,
    };
    use crate::derive::{DerivedRule, Derived};
    use k8s_openapi::api::networking::v1::{IPBlock, NetworkPolicyPeer, NetworkPolicyPort};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use std::time::Duration;

    fn peer(cidr: &str) -> NetworkPolicyPeer {
        NetworkPolicyPeer {
            ip_block: Some(IPBlock {
                cidr: cidr.to_string(),
                except: None,
            }),
            namespace_selector: None,
            pod_selector: None,
        }
    }

    fn port(value: i32) -> NetworkPolicyPort {
        NetworkPolicyPort {
            port: Some(IntOrString::Int(value)),
            protocol: Some("TCP".to_string()),
            end_port: None,
        }
    }

    fn bare_policy(spec: FQDNNetworkPolicySpec) -> FQDNNetworkPolicy {
        FQDNNetworkPolicy::new("p", spec)
    }

    #[test]
    fn policy_types_use_explicit_value_when_present() {
        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: Some(vec!["Ingress".to_string(), "Egress".to_string()]),
            ingress: None,
            egress: None,
        };
        assert_eq!(
            derive_policy_types(&spec),
            vec!["Ingress".to_string(), "Egress".to_string()]
        );
    }

    #[test]
    fn policy_types_derived_from_egress_only() {
        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: None,
            ingress: None,
            egress: Some(vec![]),
        };
        assert_eq!(derive_policy_types(&spec), vec!["Egress".to_string()]);
    }

    #[test]
    fn policy_types_derived_from_ingress_only() {
        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: None,
            ingress: Some(vec![]),
            egress: None,
        };
        assert_eq!(derive_policy_types(&spec), vec!["Ingress".to_string()]);
    }

    #[test]
    fn policy_types_derived_from_both() {
        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: None,
            ingress: Some(vec![]),
            egress: Some(vec![]),
        };
        assert_eq!(
            derive_policy_types(&spec),
            vec!["Ingress".to_string(), "Egress".to_string()]
        );
    }

    #[test]
    fn build_network_policy_carries_ports_and_peers_and_owned_by_annotation() {
        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: None,
            ingress: None,
            egress: Some(vec![FQDNNetworkPolicyEgressRule {
                ports: Some(vec![port(443)]),
                to: vec![FQDNNetworkPolicyPeer {
                    fqdns: vec!["example.com".to_string()],
                }],
            }]),
        };
        let policy = bare_policy(spec);

        let egress = Derived {
            rules: vec![DerivedRule {
                ports: Some(vec![port(443)]),
                peers: vec![peer("93.184.216.34/32")],
            }],
            next_sync_in: Duration::from_secs(60),
        };
        let ingress = Derived {
            rules: vec![],
            next_sync_in: Duration::from_secs(30),
        };

        let np = build_network_policy(&policy, "p", "default", None, &egress, &ingress);

        assert_eq!(
            np.metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(ANNOTATION_OWNED_BY)),
            Some(&"p".to_string())
        );
        let spec = np.spec.unwrap();
        assert_eq!(spec.policy_types, Some(vec!["Egress".to_string()]));
        let egress_rules = spec.egress.unwrap();
        assert_eq!(egress_rules.len(), 1);
        assert_eq!(
            egress_rules[0].to.as_ref().unwrap()[0]
                .ip_block
                .as_ref()
                .unwrap()
                .cidr,
            "93.184.216.34/32"
        );
        // ingress was never declared on the object, so it is omitted entirely.
        assert!(spec.ingress.is_none());
    }

    #[test]
    fn empty_resolution_omits_rule_but_keeps_declared_direction_as_empty_array() {
        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: None,
            ingress: None,
            egress: Some(vec![FQDNNetworkPolicyEgressRule {
                ports: None,
                to: vec![FQDNNetworkPolicyPeer {
                    fqdns: vec!["nonexistent.example".to_string()],
                }],
            }]),
        };
        let policy = bare_policy(spec);

        let egress = Derived {
            rules: vec![],
            next_sync_in: Duration::from_secs(30),
        };
        let ingress = Derived {
            rules: vec![],
            next_sync_in: Duration::from_secs(30),
        };

        let np = build_network_policy(&policy, "p", "default", None, &egress, &ingress);
        let spec = np.spec.unwrap();
        assert_eq!(spec.policy_types, Some(vec!["Egress".to_string()]));
        assert_eq!(spec.egress, Some(vec![]));
        assert!(spec.ingress.is_none());
    }

    #[test]
    fn ingress_direction_omitted_entirely_when_not_declared() {
        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: None,
            ingress: Some(vec![FQDNNetworkPolicyIngressRule {
                ports: None,
                from: vec![FQDNNetworkPolicyPeer {
                    fqdns: vec!["example.com".to_string()],
                }],
            }]),
            egress: None,
        };
        let policy = bare_policy(spec);

        let egress = Derived {
            rules: vec![],
            next_sync_in: Duration::from_secs(30),
        };
        let ingress = Derived {
            rules: vec![DerivedRule {
                ports: None,
                peers: vec![peer("10.0.0.1/32")],
            }],
            next_sync_in: Duration::from_secs(45),
        };

        let np = build_network_policy(&policy, "p", "default", None, &egress, &ingress);
        let spec = np.spec.unwrap();
        assert!(spec.egress.is_none());
        assert_eq!(spec.ingress.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn build_network_policy_preserves_existing_annotations_and_labels_on_update() {
        use crate::labels::{ANNOTATION_DELETE_POLICY, DELETE_POLICY_ABANDON};

        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: None,
            ingress: None,
            egress: Some(vec![FQDNNetworkPolicyEgressRule {
                ports: Some(vec![port(443)]),
                to: vec![FQDNNetworkPolicyPeer {
                    fqdns: vec!["example.com".to_string()],
                }],
            }]),
        };
        let policy = bare_policy(spec);

        let egress = Derived {
            rules: vec![DerivedRule {
                ports: Some(vec![port(443)]),
                peers: vec![peer("93.184.216.34/32")],
            }],
            next_sync_in: Duration::from_secs(60),
        };
        let ingress = Derived {
            rules: vec![],
            next_sync_in: Duration::from_secs(30),
        };

        let mut existing_annotations = std::collections::BTreeMap::new();
        existing_annotations.insert(
            ANNOTATION_DELETE_POLICY.to_string(),
            DELETE_POLICY_ABANDON.to_string(),
        );
        existing_annotations.insert(ANNOTATION_OWNED_BY.to_string(), "p".to_string());
        let mut existing_labels = std::collections::BTreeMap::new();
        existing_labels.insert("team".to_string(), "networking".to_string());

        let existing = k8s_openapi::api::networking::v1::NetworkPolicy {
            metadata: ObjectMeta {
                name: Some("p".to_string()),
                namespace: Some("default".to_string()),
                resource_version: Some("123".to_string()),
                annotations: Some(existing_annotations),
                labels: Some(existing_labels),
                ..Default::default()
            },
            spec: Some(Default::default()),
            status: None,
        };

        let np = build_network_policy(&policy, "p", "default", Some(&existing), &egress, &ingress);

        assert_eq!(np.metadata.resource_version, Some("123".to_string()));
        let annotations = np.metadata.annotations.unwrap();
        assert_eq!(
            annotations.get(ANNOTATION_DELETE_POLICY),
            Some(&DELETE_POLICY_ABANDON.to_string()),
            "delete-policy=abandon must survive an update, not be wiped"
        );
        assert_eq!(annotations.get(ANNOTATION_OWNED_BY), Some(&"p".to_string()));
        assert_eq!(
            np.metadata.labels.unwrap().get("team"),
            Some(&"networking".to_string()),
            "pre-existing labels must survive an update"
        );

        let spec = np.spec.unwrap();
        assert_eq!(
            spec.egress.unwrap()[0].to.as_ref().unwrap()[0]
                .ip_block
                .as_ref()
                .unwrap()
                .cidr,
            "93.184.216.34/32"
        );
    }

    #[test]
    fn owned_by_matches_true_when_annotation_equals_policy_name() {
        let mut np = k8s_openapi::api::networking::v1::NetworkPolicy {
            metadata: ObjectMeta::default(),
            spec: None,
            status: None,
        };
        let mut annotations = std::collections::BTreeMap::new();
        annotations.insert(ANNOTATION_OWNED_BY.to_string(), "p".to_string());
        np.metadata.annotations = Some(annotations);

        assert!(owned_by_matches(&np, "p"));
        assert!(!owned_by_matches(&np, "other"));
    }

    #[test]
    fn owned_by_matches_false_when_annotation_absent() {
        let np = k8s_openapi::api::networking::v1::NetworkPolicy {
            metadata: ObjectMeta::default(),
            spec: None,
            status: None,
        };
        assert!(!owned_by_matches(&np, "p"));
    }

    #[test]
    fn dns_query_timeout_defaults_without_env_var() {
        std::env::remove_var("FQDNNP_DNS_QUERY_TIMEOUT_SECS");
        assert_eq!(
            dns_query_timeout(),
            Duration::from_secs(crate::constants::DEFAULT_DNS_QUERY_TIMEOUT_SECS)
        );
    }
}
