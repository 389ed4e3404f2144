//! Shared and mutable byte buffers for planes and samples
//!
//! `Buffer` is an immutable, reference-counted view (cheap to clone), used
//! for finished frames and for history a decoder keeps for prediction.
//! `BufferRef` is the exclusively owned, writable counterpart a decoder fills
//! during one decode call before freezing it.

use bytes::{Bytes, BytesMut};

/// A reference-counted, read-only buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    data: Bytes,
}

impl Buffer {
    /// Create a new buffer from bytes
    pub fn new(data: Bytes) -> Self {
        Buffer { data }
    }

    /// Create a buffer from a vector
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Buffer {
            data: Bytes::from(vec),
        }
    }

    /// Create an empty buffer
    pub fn empty() -> Self {
        Buffer { data: Bytes::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Clone the bytes (reference counted, no copy)
    pub fn clone_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Copy the contents into a fresh writable buffer.
    ///
    /// The shared original stays untouched, so every other holder keeps
    /// seeing the old contents.
    pub fn to_mut(&self) -> BufferRef {
        BufferRef {
            data: BytesMut::from(self.as_slice()),
        }
    }

    /// Whether both handles view the same allocation
    pub fn shares_storage_with(&self, other: &Buffer) -> bool {
        self.data.as_ptr() == other.data.as_ptr() && self.len() == other.len()
    }
}

/// An exclusively owned, writable buffer
#[derive(Debug)]
pub struct BufferRef {
    data: BytesMut,
}

impl BufferRef {
    /// Create a zero-filled buffer of `len` bytes
    pub fn zeroed(len: usize) -> Self {
        BufferRef {
            data: BytesMut::zeroed(len),
        }
    }

    /// Create an empty buffer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        BufferRef {
            data: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the buffer into an immutable Buffer
    pub fn freeze(self) -> Buffer {
        Buffer {
            data: self.data.freeze(),
        }
    }

    /// Extend the buffer with data
    pub fn extend_from_slice(&mut self, slice: &[u8]) {
        self.data.extend_from_slice(slice);
    }
}

impl Default for BufferRef {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
