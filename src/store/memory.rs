//! In-memory object store with failure injection, used by tests.
//!
//! Buckets and objects keep insertion order so tree-building tests can
//! assert on listing order exactly as a real backend reported it.

use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::sync::Mutex;

use crate::error::SkiffError;
use crate::store::{BucketInfo, ObjectBody, ObjectInfo, ObjectStore};

#[derive(Default)]
struct Inner {
    /// (bucket, objects) in insertion order; objects are (key, bytes).
    buckets: Vec<(String, Vec<(String, Vec<u8>)>)>,
    /// `bucket/key` paths whose reads are forced to fail.
    poisoned: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, creating the bucket on first use.
    pub fn insert(&self, bucket: &str, key: &str, content: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        let idx = match inner.buckets.iter().position(|(b, _)| b == bucket) {
            Some(i) => i,
            None => {
                inner.buckets.push((bucket.to_string(), Vec::new()));
                inner.buckets.len() - 1
            }
        };
        let objects = &mut inner.buckets[idx].1;
        match objects.iter_mut().find(|(k, _)| k == key) {
            Some((_, bytes)) => *bytes = content.to_vec(),
            None => objects.push((key.to_string(), content.to_vec())),
        }
    }

    /// Force subsequent reads of `bucket/key` to fail.
    pub fn poison(&self, bucket: &str, key: &str) {
        self.inner
            .lock()
            .unwrap()
            .poisoned
            .insert(format!("{}/{}", bucket, key));
    }

    /// Fetch stored bytes, for asserting upload results.
    pub fn contents(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner
            .buckets
            .iter()
            .find(|(b, _)| b == bucket)?
            .1
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, bytes)| bytes.clone())
    }
}

impl ObjectStore for MemoryStore {
    fn list_buckets(&self) -> Result<Vec<BucketInfo>, SkiffError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .buckets
            .iter()
            .map(|(name, _)| BucketInfo { name: name.clone() })
            .collect())
    }

    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>, SkiffError> {
        let inner = self.inner.lock().unwrap();
        let objects = inner
            .buckets
            .iter()
            .find(|(b, _)| b == bucket)
            .map(|(_, objects)| objects)
            .ok_or_else(|| SkiffError::List {
                bucket: bucket.to_string(),
                reason: "no such bucket".to_string(),
            })?;
        Ok(objects
            .iter()
            .map(|(key, bytes)| ObjectInfo {
                key: key.clone(),
                size: Some(bytes.len() as u64),
            })
            .collect())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, SkiffError> {
        let inner = self.inner.lock().unwrap();
        if inner.poisoned.contains(&format!("{}/{}", bucket, key)) {
            return Err(SkiffError::Transfer {
                path: format!("{}/{}", bucket, key),
                reason: "injected read failure".to_string(),
            });
        }
        let bytes = inner
            .buckets
            .iter()
            .find(|(b, _)| b == bucket)
            .and_then(|(_, objects)| objects.iter().find(|(k, _)| k == key))
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| SkiffError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        let len = bytes.len() as u64;
        Ok((Box::new(Cursor::new(bytes)), Some(len)))
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        _len: Option<u64>,
    ) -> Result<(), SkiffError> {
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)?;
        self.insert(bucket, key, &bytes);
        Ok(())
    }
}
