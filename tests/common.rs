//!
//! 集成测试的通用辅助函数
//!
#![allow(dead_code)]

use std::time::Duration;

use cert_depot::{CertificateOptions, DepotOptions, FileDepot, SqliteDepot, SqliteDepotOptions};
use tempfile::TempDir;

pub const MINUTE: Duration = Duration::from_secs(60);
pub const HOUR: Duration = Duration::from_secs(3600);

/// 在临时目录中创建文件仓库；返回的 `TempDir` 必须存活到测试结束。
pub fn file_depot() -> (TempDir, FileDepot) {
    file_depot_with(DepotOptions::default())
}

pub fn file_depot_with(options: DepotOptions) -> (TempDir, FileDepot) {
    let dir = tempfile::tempdir().unwrap();
    let depot = FileDepot::with_options(dir.path(), options).unwrap();
    (dir, depot)
}

/// 内存中的 SQLite 仓库。
pub fn sqlite_depot() -> SqliteDepot {
    sqlite_depot_with(DepotOptions::default())
}

pub fn sqlite_depot_with(options: DepotOptions) -> SqliteDepot {
    SqliteDepot::open(&SqliteDepotOptions {
        depot: options,
        ..Default::default()
    })
    .unwrap()
}

/// 仓库默认值：以 "root" 为 CA。
pub fn root_defaults() -> DepotOptions {
    DepotOptions {
        ca: "root".into(),
        default_expiration: MINUTE,
    }
}

pub fn ca_options(name: &str, expires: Duration) -> CertificateOptions {
    CertificateOptions {
        common_name: name.into(),
        organization: "Cert Depot Tests".into(),
        expires,
        ..Default::default()
    }
}

pub fn host_options(name: &str, ca: &str, expires: Duration) -> CertificateOptions {
    CertificateOptions {
        common_name: name.into(),
        host: name.into(),
        ca: ca.into(),
        domain: vec![name.into()],
        expires,
        ..Default::default()
    }
}
