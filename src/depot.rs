//! The depot module: storage of PKI artifacts addressed by [`Tag`](crate::tag::Tag).
// 中文: 仓库模块，按标签存储 PKI 工件。

pub mod artifacts;
pub mod bundle;
pub mod file;
pub mod record;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use artifacts::*;
pub use bundle::delete_if_exists;
pub use file::FileDepot;
pub use record::DepotRecord;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDepot;
pub use traits::{CertDepot, Depot, TtlDepot};
