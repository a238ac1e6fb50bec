//! Directory-backed object store.
//!
//! Treats a local directory as a namespace: first-level subdirectories are
//! buckets, files below them are objects keyed by their `/`-joined relative
//! path. This is the store the CLI and integration tests run against;
//! network clients plug in behind the same trait.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::SkiffError;
use crate::store::{BucketInfo, ObjectBody, ObjectInfo, ObjectStore};

/// Buffer size for object reads: 256KB.
const BUF_SIZE: usize = 256 * 1024;

pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open a store rooted at `root`. The directory must already exist.
    pub fn open(root: &Path) -> Result<Self, SkiffError> {
        if !root.is_dir() {
            return Err(SkiffError::Connection {
                endpoint: root.display().to_string(),
                reason: "store root is not a directory".to_string(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.bucket_dir(bucket);
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

impl ObjectStore for DirStore {
    fn list_buckets(&self) -> Result<Vec<BucketInfo>, SkiffError> {
        let read_dir = std::fs::read_dir(&self.root).map_err(|e| SkiffError::Connection {
            endpoint: self.root.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut buckets = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                buckets.push(BucketInfo {
                    name: entry.file_name().to_string_lossy().to_string(),
                });
            }
        }
        // read_dir order is platform-dependent; sort for a stable listing
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>, SkiffError> {
        let base = self.bucket_dir(bucket);
        if !base.is_dir() {
            return Err(SkiffError::List {
                bucket: bucket.to_string(),
                reason: "no such bucket".to_string(),
            });
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(|e| SkiffError::List {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&base).map_err(|_| SkiffError::List {
                bucket: bucket.to_string(),
                reason: format!("entry outside bucket: {}", entry.path().display()),
            })?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let size = entry.metadata().ok().map(|m| m.len());
            objects.push(ObjectInfo { key, size });
        }
        Ok(objects)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, SkiffError> {
        let path = self.object_path(bucket, key);
        let file = std::fs::File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SkiffError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => SkiffError::Io { source: e },
        })?;
        let len = file.metadata().ok().map(|m| m.len());
        Ok((Box::new(BufReader::with_capacity(BUF_SIZE, file)), len))
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        _len: Option<u64>,
    ) -> Result<(), SkiffError> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&path)?;
        std::io::copy(body, &mut file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn seed(dir: &TempDir, bucket: &str, key: &str, content: &[u8]) {
        let mut path = dir.path().join(bucket);
        for segment in key.split('/') {
            path.push(segment);
        }
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn list_buckets_returns_top_level_dirs() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "alpha", "x.txt", b"x");
        seed(&dir, "beta", "y.txt", b"y");
        std::fs::write(dir.path().join("stray.txt"), b"not a bucket").unwrap();

        let store = DirStore::open(dir.path()).unwrap();
        let names: Vec<String> = store
            .list_buckets()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn list_objects_yields_slash_joined_keys() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "bucket1", "a/b/file1.txt", b"one");
        seed(&dir, "bucket1", "a/file2.txt", b"two");

        let store = DirStore::open(dir.path()).unwrap();
        let mut keys: Vec<String> = store
            .list_objects("bucket1")
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["a/b/file1.txt", "a/file2.txt"]);
    }

    #[test]
    fn list_objects_missing_bucket_is_list_error() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        match store.list_objects("ghost") {
            Err(SkiffError::List { bucket, .. }) => assert_eq!(bucket, "ghost"),
            other => panic!("Expected List error, got: {:?}", other),
        }
    }

    #[test]
    fn get_object_reports_length() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "bucket1", "file.bin", b"hello skiff");

        let store = DirStore::open(dir.path()).unwrap();
        let (mut body, len) = store.get_object("bucket1", "file.bin").unwrap();
        assert_eq!(len, Some(11));
        let mut buf = Vec::new();
        body.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello skiff");
    }

    #[test]
    fn get_object_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "bucket1", "file.bin", b"data");

        let store = DirStore::open(dir.path()).unwrap();
        match store.get_object("bucket1", "missing.bin") {
            Err(SkiffError::ObjectNotFound { bucket, key }) => {
                assert_eq!(bucket, "bucket1");
                assert_eq!(key, "missing.bin");
            }
            Err(other) => panic!("Expected ObjectNotFound, got: {:?}", other),
            Ok(_) => panic!("Expected ObjectNotFound, got an object"),
        }
    }

    #[test]
    fn put_object_creates_intermediate_dirs_and_overwrites() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("bucket1")).unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        let mut body: &[u8] = b"first";
        store
            .put_object("bucket1", "deep/nested/obj.txt", &mut body, Some(5))
            .unwrap();
        let mut body: &[u8] = b"second";
        store
            .put_object("bucket1", "deep/nested/obj.txt", &mut body, Some(6))
            .unwrap();

        let written =
            std::fs::read(dir.path().join("bucket1/deep/nested/obj.txt")).unwrap();
        assert_eq!(written, b"second");
    }
}
