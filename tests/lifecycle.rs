//!
//! 证书生命周期集成测试
//!
//! 覆盖 CA 初始化、签发、到期轮换、TTL 管理以及凭据包操作。
//!

mod common;

use std::time::Duration;

use cert_depot::depot::{get_certificate, get_encrypted_private_key, get_private_key};
use cert_depot::pki::Key;
use cert_depot::{
    CertDepot, CertificateOptions, Depot, ErrorKind, LifecycleState, Tag, TtlDepot,
    validity_bounds,
};
use chrono::Utc;
use common::{HOUR, MINUTE};

fn for_each_backend(test: impl Fn(&dyn CertDepot)) {
    let (_dir, file) = common::file_depot_with(common::root_defaults());
    test(&file);
    let sqlite = common::sqlite_depot_with(common::root_defaults());
    test(&sqlite);
}

// === CA 初始化 ===

#[test]
fn test_init_creates_ca_key_and_crl() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();

        let ca = get_certificate(depot, "root").unwrap();
        let info = ca.info().unwrap();
        assert!(info.is_ca);
        assert_eq!(info.subject, info.issuer);
        assert!(depot.check(&Tag::private_key("root")));
        assert!(depot.check(&Tag::crl("root")));
    });
}

#[test]
fn test_init_fails_on_existing_without_changes() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();
        let crt = depot.get(&Tag::certificate("root")).unwrap();
        let key = depot.get(&Tag::private_key("root")).unwrap();

        let err = common::ca_options("root", HOUR).init(depot).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(depot.get(&Tag::certificate("root")).unwrap(), crt);
        assert_eq!(depot.get(&Tag::private_key("root")).unwrap(), key);
    });
}

#[test]
fn test_init_with_only_key_present_fails() {
    for_each_backend(|depot| {
        depot.put(&Tag::private_key("root"), b"stale key").unwrap();
        let err = common::ca_options("root", HOUR).init(depot).unwrap_err();
        assert!(err.is_conflict());
        assert!(!depot.check(&Tag::certificate("root")));
    });
}

#[test]
fn test_init_requires_common_name() {
    for_each_backend(|depot| {
        let err = CertificateOptions::default().init(depot).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    });
}

#[test]
fn test_encrypted_ca_key() {
    for_each_backend(|depot| {
        let ca = CertificateOptions {
            passphrase: "correct horse".into(),
            ..common::ca_options("root", HOUR)
        };
        ca.init(depot).unwrap();

        assert!(get_private_key(depot, "root").is_err());
        get_encrypted_private_key(depot, "root", b"correct horse").unwrap();

        // 未提供 CA 口令时签名失败
        let mut host = common::host_options("svc", "root", MINUTE);
        assert!(host.create_certificate(depot).is_err());

        let mut host = CertificateOptions {
            ca_passphrase: "correct horse".into(),
            ..common::host_options("svc2", "root", MINUTE)
        };
        host.create_certificate(depot).unwrap();
    });
}

// === 签发 ===

#[test]
fn test_create_certificate() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();

        let mut opts = CertificateOptions {
            ip: vec!["127.0.0.1, ::1".into()],
            uri: vec!["spiffe://example.org/svc".into()],
            ..common::host_options("localhost", "root", MINUTE)
        };
        opts.create_certificate(depot).unwrap();
        assert_eq!(opts.request_state(), LifecycleState::Persisted);
        assert_eq!(opts.sign_state(), LifecycleState::Persisted);

        assert!(depot.check(&Tag::csr("localhost")));
        assert!(depot.check(&Tag::private_key("localhost")));
        let crt = get_certificate(depot, "localhost").unwrap().info().unwrap();
        let ca = get_certificate(depot, "root").unwrap().info().unwrap();
        assert!(!crt.is_ca);
        assert_eq!(crt.issuer, ca.subject);

        // 已存在的证书不会被覆盖
        let mut again = common::host_options("localhost", "root", MINUTE);
        assert!(again.create_certificate(depot).unwrap_err().is_conflict());
    });
}

#[test]
fn test_sign_requires_host_and_ca() {
    for_each_backend(|depot| {
        let mut opts = CertificateOptions {
            common_name: "svc".into(),
            ..Default::default()
        };
        opts.cert_request_in_memory().unwrap();
        assert_eq!(
            opts.sign_in_memory(depot).unwrap_err().kind(),
            ErrorKind::Validation
        );

        opts.host = "svc".into();
        assert_eq!(
            opts.sign_in_memory(depot).unwrap_err().kind(),
            ErrorKind::Validation
        );

        opts.ca = "missing".into();
        assert!(opts.sign_in_memory(depot).unwrap_err().is_not_found());
    });
}

#[test]
fn test_struct_update_carries_lifecycle_cache() {
    let mut opts = CertificateOptions {
        common_name: "svc".into(),
        ..Default::default()
    };
    assert_eq!(opts.request_state(), LifecycleState::Empty);
    assert_eq!(opts.sign_state(), LifecycleState::Empty);
    opts.cert_request_in_memory().unwrap();

    // 结构体更新语法会带上已计算的请求
    let copy = CertificateOptions {
        host: "svc".into(),
        ..opts.clone()
    };
    assert_eq!(copy.request_state(), LifecycleState::Computed);

    let fresh = CertificateOptions {
        cache: Default::default(),
        ..opts
    };
    assert_eq!(fresh.request_state(), LifecycleState::Empty);
}

// === 显式私钥路径 ===

#[test]
fn test_cert_request_uses_key_path() {
    for_each_backend(|depot| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.key");
        let key = Key::generate(2048).unwrap();
        std::fs::write(&path, key.export_private().unwrap().as_bytes()).unwrap();

        let mut opts = CertificateOptions {
            key_path: Some(path),
            ..common::host_options("svc", "root", MINUTE)
        };
        opts.cert_request(depot).unwrap();

        assert_eq!(get_private_key(depot, "svc").unwrap(), key);
        assert!(depot.check(&Tag::csr("svc")));
    });
}

#[test]
fn test_unreadable_key_path_fails_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.key");
    let mut opts = CertificateOptions {
        key_path: Some(missing.clone()),
        ..common::host_options("svc", "root", MINUTE)
    };
    let err = opts.cert_request_in_memory().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(err.to_string().contains("reading private key"));
    assert!(err.to_string().contains(&missing.display().to_string()));
    assert_eq!(opts.request_state(), LifecycleState::Empty);

    let garbage = dir.path().join("garbage.key");
    std::fs::write(&garbage, b"not a key").unwrap();
    opts.key_path = Some(garbage);
    let err = opts.cert_request_in_memory().unwrap_err();
    assert!(err.to_string().contains("decoding private key"));
}

#[test]
fn test_intermediate_ca_can_sign() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();

        let mut intermediate = CertificateOptions {
            intermediate: true,
            ..common::host_options("issuing", "root", HOUR)
        };
        intermediate.create_certificate(depot).unwrap();
        assert!(get_certificate(depot, "issuing").unwrap().info().unwrap().is_ca);

        let mut leaf = common::host_options("leaf", "issuing", MINUTE);
        leaf.create_certificate(depot).unwrap();
        let info = get_certificate(depot, "leaf").unwrap().info().unwrap();
        assert!(info.issuer.contains("issuing"));
    });
}

// === 到期轮换 ===

#[test]
fn test_create_on_expiration_when_missing() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();
        let mut opts = common::host_options("svc", "root", MINUTE);
        assert!(opts.create_certificate_on_expiration(depot, MINUTE).unwrap());
        assert!(depot.check(&Tag::certificate("svc")));
    });
}

#[test]
fn test_create_on_expiration_rotates_expiring() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();
        let mut opts = common::host_options("svc", "root", MINUTE);
        opts.create_certificate(depot).unwrap();
        let old = depot.get(&Tag::certificate("svc")).unwrap();

        // 证书在一小时内到期，需要轮换；选项中的缓存会被重置
        assert!(opts.create_certificate_on_expiration(depot, HOUR).unwrap());
        let new = depot.get(&Tag::certificate("svc")).unwrap();
        assert_ne!(old, new);
        assert_eq!(opts.sign_state(), LifecycleState::Persisted);
    });
}

#[test]
fn test_create_on_expiration_keeps_valid() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR * 2).init(depot).unwrap();
        let mut opts = common::host_options("svc", "root", HOUR);
        opts.create_certificate(depot).unwrap();
        let old = depot.get(&Tag::certificate("svc")).unwrap();
        let old_key = depot.get(&Tag::private_key("svc")).unwrap();

        assert!(!opts.create_certificate_on_expiration(depot, MINUTE).unwrap());
        assert_eq!(depot.get(&Tag::certificate("svc")).unwrap(), old);
        assert_eq!(depot.get(&Tag::private_key("svc")).unwrap(), old_key);
    });
}

#[test]
fn test_validity_bounds() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();
        let (not_before, not_after) = validity_bounds(depot, "root").unwrap();
        assert!(not_before < not_after);
        assert!(not_after > Utc::now());
    });
}

// === TTL ===

#[test]
fn test_ttl_recorded_on_issuance() {
    let depot = common::sqlite_depot_with(common::root_defaults());
    common::ca_options("root", HOUR).init(&depot).unwrap();
    common::host_options("svc", "root", MINUTE)
        .create_certificate(&depot)
        .unwrap();

    let root = depot.find_record("root").unwrap();
    let svc = depot.find_record("svc").unwrap();
    let (_, svc_not_after) = validity_bounds(&depot, "svc").unwrap();
    assert_eq!(svc.ttl, Some(svc_not_after));
    assert!(root.ttl.unwrap() > svc.ttl.unwrap());

    let cutoff = Utc::now() + chrono::Duration::minutes(5);
    let expiring = depot.find_expires_before(cutoff).unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].id, "svc");

    assert_eq!(depot.delete_expires_before(cutoff).unwrap(), 1);
    assert!(!depot.check(&Tag::certificate("svc")));
    assert!(!depot.check(&Tag::private_key("svc")));
    assert!(depot.check(&Tag::certificate("root")));
}

// === 凭据包 ===

#[test]
fn test_find_returns_stored_ca() {
    for_each_backend(|depot| {
        common::ca_options("root", MINUTE).init(depot).unwrap();
        common::host_options("localhost", "root", MINUTE)
            .create_certificate(depot)
            .unwrap();

        let creds = depot.find("localhost").unwrap();
        assert_eq!(creds.ca_cert, depot.get(&Tag::certificate("root")).unwrap());
        assert_eq!(creds.cert, depot.get(&Tag::certificate("localhost")).unwrap());
        assert_eq!(creds.key, depot.get(&Tag::private_key("localhost")).unwrap());
        assert_eq!(creds.server_name, "localhost");

        assert!(depot.find("nobody").unwrap_err().is_not_found());
    });
}

#[test]
fn test_generate_does_not_persist() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();

        let creds = depot.generate("svc").unwrap();
        assert_eq!(creds.server_name, "svc");
        assert_eq!(creds.ca_cert, depot.get(&Tag::certificate("root")).unwrap());
        assert!(!creds.certificate_info().unwrap().is_ca);

        assert!(!depot.check(&Tag::csr("svc")));
        assert!(!depot.check(&Tag::private_key("svc")));
        assert!(!depot.check(&Tag::certificate("svc")));
    });
}

#[test]
fn test_generate_with_options_uses_defaults() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();

        let creds = depot
            .generate_with_options(CertificateOptions {
                common_name: "svc".into(),
                host: "svc".into(),
                ..Default::default()
            })
            .unwrap();
        let info = creds.certificate_info().unwrap();
        assert!(info.not_after <= Utc::now() + chrono::Duration::minutes(1));
        assert!(!depot.check(&Tag::certificate("svc")));
    });
}

#[test]
fn test_generate_rejects_empty_input() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();

        let err = depot.generate("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = depot
            .generate_with_options(CertificateOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    });
}

#[test]
fn test_save_replaces_credentials() {
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();
        common::host_options("svc", "root", MINUTE)
            .create_certificate(depot)
            .unwrap();

        let creds = depot.generate("svc").unwrap();
        depot.save("svc", &creds).unwrap();

        assert_eq!(depot.get(&Tag::certificate("svc")).unwrap(), creds.cert);
        assert_eq!(depot.get(&Tag::private_key("svc")).unwrap(), creds.key);
        assert!(!depot.check(&Tag::csr("svc")));
        assert_eq!(depot.find("svc").unwrap(), creds);
    });
}

#[test]
fn test_expiring_window_is_duration() {
    // 零窗口意味着只有已经过期的证书才会被删除
    for_each_backend(|depot| {
        common::ca_options("root", HOUR).init(depot).unwrap();
        common::host_options("svc", "root", MINUTE)
            .create_certificate(depot)
            .unwrap();
        assert!(!cert_depot::delete_on_expiration(depot, "svc", Duration::ZERO).unwrap());
    });
}
