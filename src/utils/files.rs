// file: src/utils/files.rs
// description: collision-free file creation shared by staging, routing and archiving
// reference: https://doc.rust-lang.org/std/fs/struct.OpenOptions.html#method.create_new

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

const MAX_ATTEMPTS: usize = 1000;

/// `name` with `-suffix` inserted before the extension.
pub fn suffixed_name(name: &str, suffix: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}-{}", stem, suffix),
    }
}

fn candidate_name(name: &str, tag: &str, attempt: usize) -> String {
    match (attempt, tag.is_empty()) {
        (0, _) => name.to_string(),
        (n, true) => suffixed_name(name, &n.to_string()),
        (1, false) => suffixed_name(name, tag),
        (n, false) => suffixed_name(name, &format!("{}-{}", tag, n)),
    }
}

/// Atomically claims a fresh file in `dir`.
///
/// Tries `name` first, then `stem-<tag>.ext`, `stem-<tag>-2.ext`, ... (or
/// `stem-1.ext`, `stem-2.ext`, ... when `tag` is empty). The returned handle
/// is open for writing and no other caller can be handed the same path.
pub fn create_unique(dir: &Path, name: &str, tag: &str) -> io::Result<(PathBuf, File)> {
    for attempt in 0..MAX_ATTEMPTS {
        let candidate = dir.join(candidate_name(name, tag, attempt));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", name, dir.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_suffixed_name() {
        assert_eq!(suffixed_name("scan.pdf", "abcd1234"), "scan-abcd1234.pdf");
        assert_eq!(suffixed_name("README", "2"), "README-2");
        assert_eq!(suffixed_name("archive.tar.gz", "x"), "archive.tar-x.gz");
    }

    #[test]
    fn test_first_claim_keeps_name() {
        let temp = TempDir::new().unwrap();
        let (path, _) = create_unique(temp.path(), "a.txt", "beef").unwrap();
        assert_eq!(path, temp.path().join("a.txt"));
    }

    #[test]
    fn test_taken_names_get_tag_then_counter() {
        let temp = TempDir::new().unwrap();
        let names: Vec<PathBuf> = (0..3)
            .map(|_| create_unique(temp.path(), "a.txt", "beef").unwrap().0)
            .collect();

        assert_eq!(
            names,
            vec![
                temp.path().join("a.txt"),
                temp.path().join("a-beef.txt"),
                temp.path().join("a-beef-2.txt"),
            ]
        );
    }

    #[test]
    fn test_untagged_counter() {
        let temp = TempDir::new().unwrap();
        create_unique(temp.path(), "001.eml", "").unwrap();
        let (second, _) = create_unique(temp.path(), "001.eml", "").unwrap();
        assert_eq!(second, temp.path().join("001-1.eml"));
    }

    #[test]
    fn test_concurrent_claims_never_share_a_path() {
        let temp = TempDir::new().unwrap();
        let workers = 8;
        let barrier = Arc::new(Barrier::new(workers));

        let claimed: Vec<PathBuf> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let barrier = barrier.clone();
                    let dir = temp.path();
                    scope.spawn(move || {
                        barrier.wait();
                        create_unique(dir, "same.txt", "cafe").unwrap().0
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let distinct: HashSet<&PathBuf> = claimed.iter().collect();
        assert_eq!(distinct.len(), workers);
    }
}
