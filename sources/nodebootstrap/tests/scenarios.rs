use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use maplit::btreemap;
use nodebootstrap::bootstrapper::{Bootstrapper, UserData};
use nodebootstrap::nodeconfig::NodeConfig;
use nodebootstrap::{ClusterRuntimeStatus, NodeBootstrapSpec, NodeGroupKind, OsFamily};
use serde_json::json;

fn status() -> ClusterRuntimeStatus {
    ClusterRuntimeStatus {
        name: "al2023-test".to_string(),
        region: "us-west-2".to_string(),
        endpoint: "https://test.xxx.us-west-2.eks.amazonaws.com".to_string(),
        certificate_authority_data: b"test CA".to_vec(),
        service_ipv4_cidr: Some("10.100.0.0/16".to_string()),
        service_ipv6_cidr: None,
    }
}

fn decode(user_data: &str) -> String {
    String::from_utf8(BASE64.decode(user_data).unwrap()).unwrap()
}

/// Splits a multipart message into (content type, body) pairs.
fn mime_parts(message: &str, boundary: &str) -> Vec<(String, String)> {
    let delimiter = format!("--{}\r\n", boundary);
    let terminator = format!("--{}--\r\n", boundary);
    let body = message.strip_suffix(&terminator).unwrap();
    body.split(&delimiter)
        .skip(1)
        .map(|part| {
            let (header, body) = part.split_once("\r\n\r\n").unwrap();
            (
                header.trim_start_matches("Content-Type: ").to_string(),
                body.strip_suffix("\r\n").unwrap().to_string(),
            )
        })
        .collect()
}

#[test]
fn al2023_native_image_node_config() {
    let status = status();
    let mut spec = NodeBootstrapSpec::new(OsFamily::AmazonLinux2023);
    spec.max_pods_per_node = 4;
    spec.labels = btreemap! {
        "alpha.eksctl.io/nodegroup-name".to_string() => "al2023-mng-test".to_string(),
    };

    let user_data = Bootstrapper::new(&spec, &status)
        .unwrap()
        .with_mime_boundary(Some("//".to_string()))
        .user_data()
        .unwrap();
    let message = decode(&user_data);
    assert!(message.starts_with(
        "MIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=//\r\n\r\n"
    ));

    let node_configs: Vec<_> = mime_parts(&message, "//")
        .into_iter()
        .filter(|(content_type, _)| content_type == "application/node.eks.aws")
        .collect();
    assert_eq!(node_configs.len(), 1);
    let document = &node_configs[0].1;
    assert_eq!(document, include_str!("./fixtures/al2023_nodeconfig.yaml"));

    let config: NodeConfig = serde_yaml::from_str(document).unwrap();
    assert_eq!(
        config.spec.cluster.api_server_endpoint,
        "https://test.xxx.us-west-2.eks.amazonaws.com"
    );
    assert_eq!(config.spec.cluster.certificate_authority, "dGVzdCBDQQ==");
    assert_eq!(config.spec.cluster.cidr, "10.100.0.0/16");
    assert_eq!(config.spec.cluster.name, "al2023-test");
    assert_eq!(config.spec.kubelet.config.max_pods, Some(4));
    assert_eq!(config.spec.kubelet.config.cluster_dns, vec!["10.100.0.10"]);
    assert_eq!(
        config.spec.kubelet.flags,
        vec!["--node-labels=alpha.eksctl.io/nodegroup-name=al2023-mng-test"]
    );
}

#[test]
fn managed_bottlerocket_defaults() {
    let status = status();
    let mut spec = NodeBootstrapSpec::new(OsFamily::Bottlerocket);
    spec.kind = NodeGroupKind::Managed;

    let user_data = nodebootstrap::user_data(&spec, &status).unwrap();
    assert_eq!(
        decode(&user_data),
        include_str!("./fixtures/managed_bottlerocket_default.toml")
    );
}

#[test]
fn managed_bottlerocket_cluster_certificate_rejected() {
    let status = status();
    let mut spec = NodeBootstrapSpec::new(OsFamily::Bottlerocket);
    spec.kind = NodeGroupKind::Managed;
    spec.bottlerocket.settings = match json!({"kubernetes": {"cluster-certificate": "x"}}) {
        serde_json::Value::Object(map) => Some(map),
        _ => unreachable!(),
    };

    let err = nodebootstrap::user_data(&spec, &status).unwrap_err();
    assert!(err
        .to_string()
        .contains("EKS automatically injects cluster bootstrapping fields into user-data"));
}

#[test]
fn every_family_renders() {
    let status = status();
    let families = [
        OsFamily::AmazonLinux2,
        OsFamily::AmazonLinux2023,
        OsFamily::Ubuntu1804,
        OsFamily::Ubuntu2004,
        OsFamily::Ubuntu2204,
        OsFamily::Bottlerocket,
        OsFamily::WindowsServer2019CoreContainer,
        OsFamily::WindowsServer2019FullContainer,
        OsFamily::WindowsServer2022CoreContainer,
        OsFamily::WindowsServer2022FullContainer,
    ];
    for family in families {
        let mut spec = NodeBootstrapSpec::new(family);
        spec.pre_bootstrap_commands = vec!["echo hello".to_string()];
        for kind in [NodeGroupKind::SelfManaged, NodeGroupKind::Managed] {
            spec.kind = kind;
            let user_data = nodebootstrap::user_data(&spec, &status).unwrap();
            assert!(!user_data.is_empty(), "{} {:?}", family, kind);
            assert!(BASE64.decode(&user_data).is_ok(), "{} {:?}", family, kind);
        }
    }
}
