//! Integration tests for configuration module

use bypass_core::config::{BypassConfig, Method, ServiceConfig};
use bypass_core::{Error, TransformBuilder};

#[test]
fn test_example_config_valid() {
    let config = ServiceConfig::example();
    assert!(config.validate().is_ok());

    let methods: Vec<_> = config.bypasses.iter().map(|b| b.method).collect();
    assert_eq!(
        methods,
        vec![Method::Shadowsocks, Method::Obfs4, Method::Custom, Method::V2ray]
    );

    // Every sample entry must also build its transform
    for bypass in &config.bypasses {
        assert!(TransformBuilder::from_config(bypass).is_ok(), "{}", bypass.id);
    }
}

#[test]
fn test_toml_serialization_roundtrip() {
    let config = ServiceConfig::example();
    let toml = config.to_toml().unwrap();

    assert!(toml.contains("[[bypass]]"));
    assert!(toml.contains("method = \"obfs4\""));

    let parsed = ServiceConfig::from_toml(&toml).unwrap();
    assert_eq!(parsed.bypasses, config.bypasses);
    assert_eq!(parsed.runtime.stats_interval_secs, 60);
}

#[test]
fn test_toml_custom_config() {
    let toml_content = r#"
[logging]
level = "debug"
json_format = true

[runtime]
stats_interval_secs = 5

[[bypass]]
id = "hybrid-1"
name = "Hybrid edge"
method = "tcp_fragment"
local_port = 2080
remote_host = "::1"
remote_port = 443
password = "hunter2"

[bypass.parameters]
obfuscation_mode = "fragment"
fragment_size = "256"

[[bypass]]
id = "tls-1"
method = "v2ray"
local_port = 2443
remote_host = "127.0.0.1"
remote_port = 10086
encryption = "tls"
"#;

    let config = ServiceConfig::from_toml(toml_content).unwrap();
    assert!(config.validate().is_ok());
    assert!(config.logging.json_format);
    assert_eq!(config.runtime.stats_interval_secs, 5);

    let hybrid = &config.bypasses[0];
    assert_eq!(hybrid.name, "Hybrid edge");
    assert_eq!(hybrid.method, Method::TcpFragment);
    assert_eq!(hybrid.remote_addr(), "[::1]:443");
    assert_eq!(hybrid.param("fragment_size", 1024usize).unwrap(), 256);
    assert_eq!(TransformBuilder::from_config(hybrid).unwrap().name(), "custom");

    let tls = &config.bypasses[1];
    assert!(tls.uses_tls());
    assert!(tls.password.is_empty());
}

#[test]
fn test_config_validation_errors() {
    let valid = BypassConfig::new("a", Method::Shadowsocks, 1080, "127.0.0.1", 8388);

    let mut config = ServiceConfig::default();
    config.bypasses = vec![valid.clone(), BypassConfig { id: "b".into(), ..valid.clone() }];
    assert!(matches!(config.validate(), Err(Error::ConfigValue { ref key, .. }) if key == "bypass.local_port"));

    config.bypasses = vec![BypassConfig { remote_host: String::new(), ..valid.clone() }];
    assert!(config.validate().is_err());

    config.bypasses = vec![valid];
    config.runtime.stats_interval_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_unsupported_method_in_file() {
    let toml_content = r#"
[[bypass]]
id = "wg"
method = "wireguard"
remote_host = "127.0.0.1"
remote_port = 51820
"#;
    assert!(matches!(
        ServiceConfig::from_toml(toml_content),
        Err(Error::TomlParse(_))
    ));
}
