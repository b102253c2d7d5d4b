//! Turns a manifest into concrete (URL, destination) transfer items.
//!
//! Pure transformation: the only environment access is reading the working
//! directory when the manifest has no absolute destination root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::ManifestError;
use crate::manifest::Manifest;

/// One resolved transfer: absolute source URL and absolute destination path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub url: String,
    pub destination: PathBuf,
}

/// Resolves `manifest` against its destination root (working directory when unset).
/// Rename entries come first, then path entries, each in declaration order.
pub fn resolve(manifest: &Manifest) -> Result<Vec<TransferItem>, ManifestError> {
    let root = destination_root(manifest.destination_root.as_deref())?;
    resolve_with_root(manifest, &root)
}

/// Resolves `manifest` against an explicit destination root, ignoring the
/// manifest's own `destination_root`.
pub fn resolve_with_root(
    manifest: &Manifest,
    root: &Path,
) -> Result<Vec<TransferItem>, ManifestError> {
    let base = parse_base_url(&manifest.source_base_url)?;

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(manifest.len());
    for entry in &manifest.rename {
        if !seen.insert(entry.source.as_str()) {
            return Err(ManifestError::DuplicateRename {
                source_path: entry.source.clone(),
            });
        }
        items.push(TransferItem {
            url: join_url(&base, &entry.source)?,
            destination: join_destination(root, &entry.destination)?,
        });
    }
    for source in &manifest.paths {
        items.push(TransferItem {
            url: join_url(&base, source)?,
            destination: join_destination(root, source)?,
        });
    }
    check_unique_destinations(&items)?;
    Ok(items)
}

/// Rejects items that would write the same destination file.
pub fn check_unique_destinations(items: &[TransferItem]) -> Result<(), ManifestError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.destination.as_path()) {
            return Err(ManifestError::DuplicateDestination {
                path: item.destination.clone(),
            });
        }
    }
    Ok(())
}

/// Absolute destination root: `root` as given when absolute, otherwise
/// relative to the working directory.
pub fn destination_root(root: Option<&Path>) -> Result<PathBuf, ManifestError> {
    match root {
        Some(r) if r.is_absolute() => Ok(r.to_path_buf()),
        other => {
            let cwd = std::env::current_dir().map_err(ManifestError::WorkingDir)?;
            Ok(match other {
                Some(r) => cwd.join(r),
                None => cwd,
            })
        }
    }
}

/// Parses a base URL, requiring http(s) and a host.
pub fn parse_base_url(raw: &str) -> Result<Url, ManifestError> {
    let url = Url::parse(raw).map_err(|source| ManifestError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ManifestError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().is_none() {
        return Err(ManifestError::MissingHost {
            url: raw.to_string(),
        });
    }
    Ok(url)
}

/// Final path segment of a URL (query and fragment ignored).
pub fn url_basename(raw: &str) -> Result<String, ManifestError> {
    let url = parse_base_url(raw)?;
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(str::to_string)
        .ok_or_else(|| ManifestError::MissingBasename {
            url: raw.to_string(),
        })
}

/// Splits a relative path into its meaningful segments, rejecting empty,
/// absolute, and traversing paths.
fn relative_segments(path: &str) -> Result<Vec<&str>, ManifestError> {
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return Err(ManifestError::AbsolutePath {
            path: path.to_string(),
        });
    }
    let mut segments = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(ManifestError::PathTraversal {
                    path: path.to_string(),
                })
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(ManifestError::EmptyPath);
    }
    Ok(segments)
}

/// scheme://host[:port] followed by the joined (base path, relative path).
fn join_url(base: &Url, relative: &str) -> Result<String, ManifestError> {
    let rel = relative_segments(relative)?;
    let mut path = String::new();
    for segment in base
        .path()
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .chain(rel)
    {
        path.push('/');
        path.push_str(segment);
    }

    let host = base.host_str().unwrap_or_default();
    let authority = match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let joined = format!("{}://{}{}", base.scheme(), authority, path);
    let url = Url::parse(&joined).map_err(|source| ManifestError::InvalidBaseUrl {
        url: joined.clone(),
        source,
    })?;
    Ok(url.to_string())
}

fn join_destination(root: &Path, relative: &str) -> Result<PathBuf, ManifestError> {
    let mut dest = root.to_path_buf();
    for segment in relative_segments(relative)? {
        dest.push(segment);
    }
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[TransferItem]) -> Vec<&str> {
        items.iter().map(|i| i.url.as_str()).collect()
    }

    #[test]
    fn resolves_paths_under_base_and_root() {
        let m = Manifest::new("https://example.com/pkg").paths(["a.txt", "dir/b.txt"]);
        let items = resolve_with_root(&m, Path::new("/tmp/out")).unwrap();
        assert_eq!(
            items,
            vec![
                TransferItem {
                    url: "https://example.com/pkg/a.txt".to_string(),
                    destination: PathBuf::from("/tmp/out/a.txt"),
                },
                TransferItem {
                    url: "https://example.com/pkg/dir/b.txt".to_string(),
                    destination: PathBuf::from("/tmp/out/dir/b.txt"),
                },
            ]
        );
    }

    #[test]
    fn rename_entries_come_first_in_declaration_order() {
        let m = Manifest::new("https://example.com/pkg")
            .path("list-1")
            .rename("z-src", "z-dest")
            .path("list-2")
            .rename("a-src", "a-dest");
        let items = resolve_with_root(&m, Path::new("/out")).unwrap();
        assert_eq!(items.len(), m.len());
        assert_eq!(
            urls(&items),
            vec![
                "https://example.com/pkg/z-src",
                "https://example.com/pkg/a-src",
                "https://example.com/pkg/list-1",
                "https://example.com/pkg/list-2",
            ]
        );
        assert_eq!(items[0].destination, PathBuf::from("/out/z-dest"));
        assert_eq!(items[1].destination, PathBuf::from("/out/a-dest"));
    }

    #[test]
    fn url_join_collapses_slashes_and_keeps_port() {
        let m = Manifest::new("http://127.0.0.1:8080/raw/main/?ref=x#top")
            .paths(["./src//lib.rs", "b.txt"]);
        let items = resolve_with_root(&m, Path::new("/out")).unwrap();
        assert_eq!(
            urls(&items),
            vec![
                "http://127.0.0.1:8080/raw/main/src/lib.rs",
                "http://127.0.0.1:8080/raw/main/b.txt",
            ]
        );
        assert_eq!(items[0].destination, PathBuf::from("/out/src/lib.rs"));
    }

    #[test]
    fn root_base_url_and_encoding() {
        let m = Manifest::new("https://example.com").path("docs/read me.txt");
        let items = resolve_with_root(&m, Path::new("/out")).unwrap();
        assert_eq!(items[0].url, "https://example.com/docs/read%20me.txt");
        assert_eq!(items[0].destination, PathBuf::from("/out/docs/read me.txt"));
    }

    #[test]
    fn invalid_base_urls_are_rejected() {
        let not_absolute = Manifest::new("example.com/pkg").path("a");
        assert!(matches!(
            resolve_with_root(&not_absolute, Path::new("/out")),
            Err(ManifestError::InvalidBaseUrl { .. })
        ));
        let ftp = Manifest::new("ftp://example.com/pkg").path("a");
        assert!(matches!(
            resolve_with_root(&ftp, Path::new("/out")),
            Err(ManifestError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn traversal_and_absolute_paths_are_rejected() {
        let root = Path::new("/out");
        let up = Manifest::new("https://example.com/pkg").path("../secret");
        assert!(matches!(
            resolve_with_root(&up, root),
            Err(ManifestError::PathTraversal { .. })
        ));
        let nested = Manifest::new("https://example.com/pkg").path("a/../../b");
        assert!(matches!(
            resolve_with_root(&nested, root),
            Err(ManifestError::PathTraversal { .. })
        ));
        let rename_up = Manifest::new("https://example.com/pkg").rename("a", "..\\b");
        assert!(matches!(
            resolve_with_root(&rename_up, root),
            Err(ManifestError::PathTraversal { .. })
        ));
        let absolute = Manifest::new("https://example.com/pkg").path("/etc/passwd");
        assert!(matches!(
            resolve_with_root(&absolute, root),
            Err(ManifestError::AbsolutePath { .. })
        ));
        let empty = Manifest::new("https://example.com/pkg").path("./");
        assert!(matches!(
            resolve_with_root(&empty, root),
            Err(ManifestError::EmptyPath)
        ));
    }

    #[test]
    fn duplicate_rename_source_is_rejected() {
        let m = Manifest::new("https://example.com/pkg")
            .rename("a", "one")
            .rename("a", "two");
        assert!(matches!(
            resolve_with_root(&m, Path::new("/out")),
            Err(ManifestError::DuplicateRename { .. })
        ));
    }

    #[test]
    fn duplicate_destinations_are_rejected() {
        let root = Path::new("/out");
        let twice = Manifest::new("https://example.com/pkg").paths(["a.txt", "./a.txt"]);
        match resolve_with_root(&twice, root) {
            Err(ManifestError::DuplicateDestination { path }) => {
                assert_eq!(path, PathBuf::from("/out/a.txt"))
            }
            other => panic!("expected DuplicateDestination, got {:?}", other),
        }
        let rename_onto_path = Manifest::new("https://example.com/pkg")
            .rename("other.txt", "dir/b.txt")
            .path("dir/b.txt");
        assert!(matches!(
            resolve_with_root(&rename_onto_path, root),
            Err(ManifestError::DuplicateDestination { .. })
        ));
        let two_renames = Manifest::new("https://example.com/pkg")
            .rename("x", "same")
            .rename("y", "same");
        assert!(matches!(
            resolve_with_root(&two_renames, root),
            Err(ManifestError::DuplicateDestination { .. })
        ));
    }

    #[test]
    fn empty_manifest_resolves_to_nothing() {
        let m = Manifest::new("https://example.com/pkg");
        assert!(resolve_with_root(&m, Path::new("/out")).unwrap().is_empty());
    }

    #[test]
    fn relative_root_is_anchored_at_working_directory() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(destination_root(None).unwrap(), cwd);
        assert_eq!(destination_root(Some(Path::new("out"))).unwrap(), cwd.join("out"));
        assert_eq!(
            destination_root(Some(Path::new("/abs"))).unwrap(),
            PathBuf::from("/abs")
        );
    }

    #[test]
    fn basename_of_url() {
        assert_eq!(
            url_basename("https://example.com/releases/v1/tool.tar.gz?sig=1").unwrap(),
            "tool.tar.gz"
        );
        assert!(matches!(
            url_basename("https://example.com/"),
            Err(ManifestError::MissingBasename { .. })
        ));
    }
}
