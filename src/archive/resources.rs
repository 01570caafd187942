use anyhow::{Context, Result};
use md5::{Digest, Md5};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Maps a remote URL referenced by a message to a locally downloaded copy.
/// Only rendering/export consumes this; thread reconstruction never does.
pub trait ResourceResolver {
    fn resolve_local(&self, url: &str) -> Option<PathBuf>;
}

/// Resolver for runs without any downloaded resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

impl ResourceResolver for NoResources {
    fn resolve_local(&self, _url: &str) -> Option<PathBuf> {
        None
    }
}

/// Leading 8 hex digits of the MD5 of `url`, the suffix downloaded files carry.
pub fn url_hash(url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}

fn hash_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, hash) = stem.rsplit_once('_')?;
    (hash.len() == 8 && hash.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| hash.to_ascii_lowercase())
}

/// Downloads directory with files named `<stem>_<hash8><ext>`, where `hash8`
/// is the leading 8 hex digits of the MD5 of the source URL.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    by_hash: BTreeMap<String, PathBuf>,
}

impl DirectoryResolver {
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut by_hash = BTreeMap::new();
        if !dir.is_dir() {
            return Ok(Self { by_hash });
        }

        let read_dir =
            fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
        for entry in read_dir {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(hash) = hash_from_file_name(&path) {
                by_hash.entry(hash).or_insert(path);
            }
        }
        tracing::debug!(dir = %dir.display(), files = by_hash.len(), "indexed downloaded resources");
        Ok(Self { by_hash })
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }
}

impl ResourceResolver for DirectoryResolver {
    fn resolve_local(&self, url: &str) -> Option<PathBuf> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return None;
        }
        self.by_hash.get(&url_hash(url)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resolves_by_url_hash_suffix() {
        let tmp = tempdir().expect("tempdir");
        let url = "https://files.slack.com/files-pri/T1-F1/diagram.png";
        let name = format!("diagram_{}.png", url_hash(url));
        fs::write(tmp.path().join(&name), b"png").expect("write");
        fs::write(tmp.path().join("notes.txt"), b"x").expect("write");

        let resolver = DirectoryResolver::scan(tmp.path()).expect("scan");
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.resolve_local(url), Some(tmp.path().join(name)));
        assert_eq!(resolver.resolve_local("https://example.com/other.png"), None);
        assert_eq!(resolver.resolve_local("mailto:someone@example.com"), None);
    }

    #[test]
    fn missing_directory_resolves_nothing() {
        let tmp = tempdir().expect("tempdir");
        let resolver = DirectoryResolver::scan(&tmp.path().join("absent")).expect("scan");
        assert_eq!(resolver.len(), 0);
        assert_eq!(NoResources.resolve_local("https://example.com/a.png"), None);
    }

    #[test]
    fn url_hash_is_short_lowercase_hex() {
        let hash = url_hash("https://example.com");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, url_hash("https://example.com"));
        assert_eq!(url_hash("abc"), "90015098");
    }
}
