pub mod dir;
pub mod memory;

use std::io::Read;

use crate::error::SkiffError;

/// A bucket in the store's top-level namespace.
#[derive(Debug, Clone)]
pub struct BucketInfo {
    pub name: String,
}

/// One object in a bucket's flat keyspace.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Full `/`-delimited key within the bucket.
    pub key: String,
    /// Size in bytes when the listing reports it.
    pub size: Option<u64>,
}

/// Readable object body plus its total length when known.
///
/// Some sources (chunked HTTP responses, pipes) cannot report a length
/// up front; progress consumers must tolerate `None`.
pub type ObjectBody = (Box<dyn Read + Send>, Option<u64>);

/// Core abstraction over an object-storage backend.
///
/// The engine and tree builder consume this contract and never construct
/// a concrete client themselves; a handle is passed in explicitly so that
/// reconnect/disconnect stays the caller's concern and tests can supply
/// fakes. Implementations must be safe to share immutably across worker
/// threads.
pub trait ObjectStore: Send + Sync {
    /// Enumerate buckets, in the order the backend reports them.
    fn list_buckets(&self) -> Result<Vec<BucketInfo>, SkiffError>;

    /// Enumerate all objects in a bucket, recursively, in listing order.
    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>, SkiffError>;

    /// Open an object for reading.
    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, SkiffError>;

    /// Store an object, replacing any existing object under the same key.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        len: Option<u64>,
    ) -> Result<(), SkiffError>;
}
