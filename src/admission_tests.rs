#[cfg(test)]
mod tests {
    use crate::admission::{default_spec, validate};
    use crate::crd::{
        FQDNNetworkPolicyEgressRule, FQDNNetworkPolicyIngressRule, FQDNNetworkPolicyPeer,
        FQDNNetworkPolicySpec,
    };
    use k8s_openapi::api::networking::v1::NetworkPolicyPort;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    fn port(value: i32, protocol: Option<&str>) -> NetworkPolicyPort {
        NetworkPolicyPort {
            port: Some(IntOrString::Int(value)),
            protocol: protocol.map(str::to_string),
            end_port: None,
        }
    }

    fn spec_with_egress(ports: Vec<NetworkPolicyPort>, fqdns: &[&str]) -> FQDNNetworkPolicySpec {
        FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: Some(vec!["Egress".to_string()]),
            ingress: None,
            egress: Some(vec![FQDNNetworkPolicyEgressRule {
                ports: Some(ports),
                to: vec![FQDNNetworkPolicyPeer {
                    fqdns: fqdns.iter().map(|s| s.to_string()).collect(),
                }],
            }]),
        }
    }

    #[test]
    fn defaulting_sets_empty_protocol_to_tcp() {
        let mut spec = spec_with_egress(vec![port(443, None)], &["example.com"]);
        default_spec(&mut spec);
        assert_eq!(
            spec.egress.unwrap()[0].ports.as_ref().unwrap()[0].protocol,
            Some("TCP".to_string())
        );
    }

    #[test]
    fn defaulting_leaves_explicit_protocol_untouched() {
        let mut spec = spec_with_egress(vec![port(53, Some("UDP"))], &["example.com"]);
        default_spec(&mut spec);
        assert_eq!(
            spec.egress.unwrap()[0].ports.as_ref().unwrap()[0].protocol,
            Some("UDP".to_string())
        );
    }

    #[test]
    fn defaulting_is_idempotent() {
        let mut spec = spec_with_egress(vec![port(443, None)], &["example.com"]);
        default_spec(&mut spec);
        let once = spec.clone();
        default_spec(&mut spec);
        assert_eq!(once.egress.unwrap()[0].ports, spec.egress.unwrap()[0].ports);
    }

    #[test]
    fn port_zero_validates_successfully() {
        let spec = spec_with_egress(vec![port(0, Some("TCP"))], &["example.com"]);
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn port_above_range_fails_validation() {
        let spec = spec_with_egress(vec![port(70000, Some("TCP"))], &["example.com"]);
        let errors = validate(&spec);
        assert!(!errors.is_ok());
        assert!(errors.errors.iter().any(|e| e.field.ends_with(".port")));
    }

    #[test]
    fn negative_port_fails_validation() {
        let spec = spec_with_egress(vec![port(-1, Some("TCP"))], &["example.com"]);
        assert!(!validate(&spec).is_ok());
    }

    #[test]
    fn unrecognized_protocol_fails_validation() {
        let spec = spec_with_egress(vec![port(443, Some("QUIC"))], &["example.com"]);
        let errors = validate(&spec);
        assert!(!errors.is_ok());
        assert!(errors.errors.iter().any(|e| e.field.ends_with(".protocol")));
    }

    #[test]
    fn empty_protocol_string_is_accepted_before_defaulting_runs() {
        let spec = spec_with_egress(vec![port(443, Some(""))], &["example.com"]);
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn valid_fqdn_passes_validation() {
        let spec = spec_with_egress(vec![], &["example.com"]);
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn wildcard_fqdn_fails_validation() {
        let spec = spec_with_egress(vec![], &["*.example.com"]);
        let errors = validate(&spec);
        assert!(!errors.is_ok());
        assert!(errors.errors.iter().any(|e| e.field.contains("fqdns")));
    }

    #[test]
    fn fqdn_over_253_bytes_fails_validation() {
        let long_label = "a".repeat(60);
        let fqdn = format!("{long_label}.{long_label}.{long_label}.{long_label}.com");
        assert!(fqdn.len() > 253);
        let spec = spec_with_egress(vec![], &[&fqdn]);
        assert!(!validate(&spec).is_ok());
    }

    #[test]
    fn single_label_over_63_bytes_fails_validation() {
        let label = "a".repeat(64);
        let fqdn = format!("{label}.com");
        let spec = spec_with_egress(vec![], &[&fqdn]);
        assert!(!validate(&spec).is_ok());
    }

    #[test]
    fn validation_collects_every_error_without_short_circuiting() {
        let spec = spec_with_egress(vec![port(99999, Some("QUIC"))], &["*.example.com"]);
        let errors = validate(&spec);
        assert_eq!(errors.errors.len(), 3);
    }

    #[test]
    fn ingress_rules_are_validated_the_same_way_as_egress() {
        let spec = FQDNNetworkPolicySpec {
            pod_selector: Default::default(),
            policy_types: Some(vec!["Ingress".to_string()]),
            ingress: Some(vec![FQDNNetworkPolicyIngressRule {
                ports: Some(vec![port(-5, Some("TCP"))]),
                from: vec![FQDNNetworkPolicyPeer {
                    fqdns: vec!["*.bad.example".to_string()],
                }],
            }]),
            egress: None,
        };
        let errors = validate(&spec);
        assert_eq!(errors.errors.len(), 2);
    }

    #[test]
    fn validation_is_deterministic_on_object_content_alone() {
        let spec = spec_with_egress(vec![port(443, Some("TCP"))], &["example.com"]);
        let first = validate(&spec);
        let second = validate(&spec);
        assert_eq!(first.errors, second.errors);
    }
}
