//! Filesystem-backed depot: one file per (identity, kind).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::bundle;
use super::traits::{CertDepot, Depot};
use crate::config::DepotOptions;
use crate::credentials::Credentials;
use crate::error::{Error, Result, ResultExt};
use crate::options::CertificateOptions;
use crate::tag::{ArtifactKind, Tag};

/// 文件仓库
///
/// 每个工件保存为 `<identity>.<ext>`，扩展名为 crt/key/csr/crl。
/// 写入使用独占创建，已存在的文件永远不会被覆盖。
#[derive(Debug, Clone)]
pub struct FileDepot {
    dir: PathBuf,
    options: DepotOptions,
}

impl FileDepot {
    /// Opens (creating if needed) a depot rooted at `dir` with empty defaults.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::with_options(dir, DepotOptions::default())
    }

    /// Opens a depot whose `find`/`generate` use the given defaults.
    pub fn with_options<P: AsRef<Path>>(dir: P, options: DepotOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating depot directory {}", dir.display()))?;
        Ok(Self { dir, options })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn options(&self) -> &DepotOptions {
        &self.options
    }

    /// Lists every stored artifact as a tag of its storage name.
    pub fn list(&self) -> Result<Vec<Tag>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("reading depot directory {}", self.dir.display()))?;

        let mut tags = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|e| e.to_str()),
            ) else {
                continue;
            };
            if let Some(kind) = ArtifactKind::from_extension(ext) {
                tags.push(Tag::new(stem, kind));
            }
        }
        Ok(tags)
    }

    fn path(&self, tag: &Tag) -> Result<PathBuf> {
        let name = tag.storage_name();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
        {
            return Err(Error::Validation(format!(
                "'{}' is not a valid depot name",
                tag.name()
            )));
        }
        Ok(self.dir.join(format!("{}.{}", name, tag.kind().extension())))
    }
}

/// Private material is owner-only, public material world-readable.
fn file_mode(kind: ArtifactKind) -> u32 {
    match kind {
        ArtifactKind::PrivateKey | ArtifactKind::CertificateSigningRequest => 0o600,
        ArtifactKind::Certificate | ArtifactKind::CertificateRevocationList => 0o644,
    }
}

fn create_file_with_mode(path: &Path, mode: u32) -> io::Result<File> {
    let mut opts = fs::OpenOptions::new();
    opts.create_new(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    opts.open(path)
}

impl Depot for FileDepot {
    fn put(&self, tag: &Tag, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::Validation(format!("data for '{}' is empty", tag)));
        }
        let path = self.path(tag)?;

        let mut file = match create_file_with_mode(&path, file_mode(tag.kind())) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::Conflict(format!("'{}' already exists", tag)));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("creating {}", path.display()));
            }
        };

        let written = file.write_all(data).and_then(|_| file.sync_all());
        if let Err(e) = written {
            // 不留下写了一半的文件
            let _ = fs::remove_file(&path);
            return Err(e).with_context(|| format!("writing {}", path.display()));
        }

        debug!(op = "put", id = %tag.storage_name(), kind = %tag.kind(), dir = %self.dir.display(), "stored artifact");
        Ok(())
    }

    fn get(&self, tag: &Tag) -> Result<Vec<u8>> {
        let path = self.path(tag)?;
        match fs::read(&path) {
            Ok(data) if data.is_empty() => Err(Error::NotFound(format!("'{}' is empty", tag))),
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("'{}' does not exist", tag)))
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn check_with_error(&self, tag: &Tag) -> Result<bool> {
        let path = self.path(tag)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("checking {}", path.display())),
        }
    }

    fn delete(&self, tag: &Tag) -> Result<()> {
        let path = self.path(tag)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(op = "delete", id = %tag.storage_name(), kind = %tag.kind(), dir = %self.dir.display(), "deleted artifact");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("'{}' does not exist", tag)))
            }
            Err(e) => Err(e).with_context(|| format!("deleting {}", path.display())),
        }
    }
}

impl CertDepot for FileDepot {
    fn save(&self, name: &str, creds: &Credentials) -> Result<()> {
        bundle::save(self, name, creds)
    }

    fn find(&self, name: &str) -> Result<Credentials> {
        bundle::find(self, name, &self.options)
    }

    fn generate(&self, name: &str) -> Result<Credentials> {
        bundle::generate_default(self, name, &self.options)
    }

    fn generate_with_options(&self, opts: CertificateOptions) -> Result<Credentials> {
        let name = opts.common_name.clone();
        bundle::generate(self, &name, &self.options, opts)
    }
}
