//! Integration tests for adapter lifecycle

use bypass_core::adapter::{CustomAdapter, Obfs4Adapter, ShadowsocksAdapter, V2rayAdapter};
use bypass_core::{Adapter, AdapterFactory, BypassConfig, Error, Method};
use std::net::TcpListener;

fn config(id: &str, method: Method) -> BypassConfig {
    BypassConfig::new(id, method, 0, "127.0.0.1", 9).with_password("testpass")
}

fn all_adapters() -> Vec<(Box<dyn Adapter>, Method)> {
    vec![
        (Box::new(ShadowsocksAdapter::new()), Method::Shadowsocks),
        (Box::new(Obfs4Adapter::new()), Method::Obfs4),
        (Box::new(CustomAdapter::new()), Method::Custom),
        (Box::new(V2rayAdapter::new()), Method::V2ray),
    ]
}

// ============ Lifecycle Tests ============

#[tokio::test]
async fn test_start_stop_symmetry() {
    for (adapter, method) in all_adapters() {
        let cfg = config("sym", method);

        adapter.start(&cfg).unwrap();
        assert!(adapter.is_running("sym"), "{method} not running after start");
        assert!(adapter.stats("sym").unwrap().is_some());

        adapter.stop("sym").unwrap();
        assert!(!adapter.is_running("sym"), "{method} still running after stop");
        assert!(adapter.stats("sym").unwrap().is_none());
        assert!(adapter.local_addr("sym").is_none());
    }
}

#[tokio::test]
async fn test_restart_same_id() {
    let adapter = Obfs4Adapter::new();
    let cfg = config("again", Method::Obfs4);

    adapter.start(&cfg).unwrap();
    adapter.stop("again").unwrap();
    adapter.start(&cfg).unwrap();
    assert!(adapter.is_running("again"));
    adapter.stop("again").unwrap();
}

#[tokio::test]
async fn test_stop_releases_port() {
    let adapter = ShadowsocksAdapter::new();
    adapter.start(&config("port", Method::Shadowsocks)).unwrap();
    let port = adapter.local_addr("port").unwrap().port();
    adapter.stop("port").unwrap();

    let refused = std::net::TcpStream::connect(("127.0.0.1", port));
    assert!(refused.is_err(), "port {port} still accepting after stop");

    let cfg = BypassConfig { local_port: port, ..config("port", Method::Shadowsocks) };
    adapter.start(&cfg).unwrap();
    assert_eq!(adapter.local_addr("port").unwrap().port(), port);
    adapter.stop("port").unwrap();
}

#[tokio::test]
async fn test_router_stop_releases_port() {
    let router = bypass_core::Router::new();
    router.start(&config("routed", Method::Custom)).unwrap();
    let port = router.local_addr("routed").unwrap().port();
    router.stop("routed").unwrap();

    assert!(std::net::TcpStream::connect(("127.0.0.1", port)).is_err());
    let cfg = BypassConfig { local_port: port, ..config("routed", Method::Obfs4) };
    router.start(&cfg).unwrap();
    router.stop_all();
}

// ============ Error Tests ============

#[tokio::test]
async fn test_duplicate_id_rejected() {
    for (adapter, method) in all_adapters() {
        let cfg = config("dup", method);
        adapter.start(&cfg).unwrap();

        let err = adapter.start(&cfg).unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning { .. }));
        assert_eq!(err.to_string(), format!("{method} connection already running: dup"));

        adapter.stop("dup").unwrap();
    }
}

#[tokio::test]
async fn test_port_conflict() {
    let occupied = TcpListener::bind("0.0.0.0:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let adapter = CustomAdapter::new();
    let cfg = BypassConfig { local_port: port, ..config("busy", Method::Custom) };

    let err = adapter.start(&cfg).unwrap_err();
    assert!(matches!(err, Error::Listen { .. }));
    assert!(err.to_string().starts_with("failed to create listener"));
    assert!(!adapter.is_running("busy"));
    assert!(adapter.stats("busy").unwrap().is_none());
}

#[tokio::test]
async fn test_stop_unknown_id() {
    for (adapter, _) in all_adapters() {
        let err = adapter.stop("nobody").unwrap_err();
        assert_eq!(err.to_string(), "bypass connection not found: nobody");
        assert!(adapter.stats("nobody").unwrap().is_none());
    }
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let adapter = AdapterFactory::create(Method::Shadowsocks);
    let cfg = BypassConfig { remote_port: 0, ..config("zero", Method::Shadowsocks) };
    assert!(adapter.start(&cfg).unwrap_err().is_config());
    assert!(!adapter.is_running("zero"));
}

#[tokio::test]
async fn test_concurrent_starts_single_winner() {
    let adapter = std::sync::Arc::new(ShadowsocksAdapter::new());
    let cfg = config("race", Method::Shadowsocks);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let adapter = std::sync::Arc::clone(&adapter);
            let cfg = cfg.clone();
            tokio::spawn(async move { adapter.start(&cfg).is_ok() })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    adapter.stop("race").unwrap();
}
