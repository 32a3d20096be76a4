//! Safe Wrappers Module
//!
//! One Boundary Adapter per wrapped library. Each adapter forwards into the
//! library and only marshals memory; no wrapped algorithm is reimplemented
//! here.
//!
//! # Call Shapes
//!
//! 1. **Pure value transform** - slice in, primitive out (hashes, math).
//! 2. **Allocating transform** - slice in, [`OwnedBuffer`] out.
//! 3. **Capacity-bounded transform** - slice in, `&mut [u8]` out, bytes
//!    written reported, nothing written past the end of the destination.
//! 4. **Stateful session** - a value created, mutated, read and dropped
//!    (`Xxh3Stream`, `JqFilter`, `JsonDocument`, `Matrix`, filters).
//!
//! # Usage
//!
//! ```rust
//! use hostbridge::wrappers::{compression, WrapperRegistry};
//! use hostbridge::runtime::OwnedBuffer;
//!
//! let packed = compression::lz4_compress(b"hello hello hello").unwrap();
//! let unpacked = compression::lz4_decompress(&packed, 17).unwrap();
//! assert_eq!(unpacked.as_slice(), b"hello hello hello");
//!
//! // The same operations by name
//! let registry = WrapperRegistry::with_builtins();
//! let out = registry
//!     .call_by_name("xxhash32", &[OwnedBuffer::from_str("abc")])
//!     .unwrap();
//! assert_eq!(out.len(), 4);
//! ```

pub mod blurhash;
pub mod compression;
pub mod dsp;
pub mod expr;
pub mod hashing;
pub mod image;
pub mod jq;
pub mod json;
pub mod linalg;
pub mod math3d;
pub mod qoi;
pub mod sanitize;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

pub use crate::runtime::OwnedBuffer;

/// Error type for wrapper operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WrapperError {
    /// Invalid argument provided
    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    /// The wrapped library rejected the input
    #[error("{adapter}: invalid input: {reason}")]
    InvalidInput {
        adapter: &'static str,
        reason: String,
    },

    /// Destination capacity exceeded
    #[error("Buffer too small: required {required}, provided {provided}")]
    BufferTooSmall { required: usize, provided: usize },

    /// Allocation could not be satisfied
    #[error("Allocation of {requested} bytes failed")]
    AllocationFailed { requested: usize },

    /// Handle not found (never created, or already destroyed)
    #[error("Handle not found: {0}")]
    HandleNotFound(u64),

    /// Operation not supported
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// A panic was caught at the boundary
    #[error("Internal panic in {0}")]
    Panicked(String),
}

impl WrapperError {
    /// Shorthand for [`WrapperError::InvalidInput`]
    pub fn invalid(adapter: &'static str, reason: impl fmt::Display) -> Self {
        WrapperError::InvalidInput {
            adapter,
            reason: reason.to_string(),
        }
    }
}

impl From<std::str::Utf8Error> for WrapperError {
    fn from(e: std::str::Utf8Error) -> Self {
        WrapperError::InvalidArg(format!("not UTF-8: {}", e))
    }
}

impl From<std::string::FromUtf8Error> for WrapperError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        WrapperError::InvalidArg(format!("not UTF-8: {}", e))
    }
}

/// Result type for wrapper operations
pub type WrapperResult<T> = Result<T, WrapperError>;

/// Reject an output size derived from untrusted input above `limit`
pub(crate) fn check_output_size(adapter: &'static str, size: usize, limit: usize) -> WrapperResult<()> {
    if size > limit {
        return Err(WrapperError::invalid(
            adapter,
            format!("output of {} bytes exceeds limit of {} bytes", size, limit),
        ));
    }
    Ok(())
}

// =============================================================================
// Registry argument helpers
// =============================================================================

/// Borrow argument `index`
pub(crate) fn arg<'a>(args: &'a [OwnedBuffer], index: usize, name: &str) -> WrapperResult<&'a OwnedBuffer> {
    args.get(index)
        .ok_or_else(|| WrapperError::InvalidArg(format!("missing argument {} ({})", index, name)))
}

/// Argument `index` as UTF-8 text
pub(crate) fn arg_str<'a>(args: &'a [OwnedBuffer], index: usize, name: &str) -> WrapperResult<&'a str> {
    Ok(arg(args, index, name)?.as_str()?)
}

/// Argument `index` as a little-endian unsigned integer of at most 8 bytes
pub(crate) fn arg_u64(args: &[OwnedBuffer], index: usize, name: &str) -> WrapperResult<u64> {
    let bytes = arg(args, index, name)?.as_slice();
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(WrapperError::InvalidArg(format!(
            "{} must be 1 to 8 little-endian bytes, got {}",
            name,
            bytes.len()
        )));
    }
    Ok(bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Optional argument `index` as a little-endian integer, `default` if absent
pub(crate) fn arg_u64_or(args: &[OwnedBuffer], index: usize, name: &str, default: u64) -> WrapperResult<u64> {
    if index < args.len() {
        arg_u64(args, index, name)
    } else {
        Ok(default)
    }
}

/// Argument `index` as a `u32`
pub(crate) fn arg_u32(args: &[OwnedBuffer], index: usize, name: &str) -> WrapperResult<u32> {
    let value = arg_u64(args, index, name)?;
    u32::try_from(value)
        .map_err(|_| WrapperError::InvalidArg(format!("{} out of range: {}", name, value)))
}

// =============================================================================
// Registry
// =============================================================================

/// Function signature for a wrapper
pub type WrapperFn = Arc<dyn Fn(&[OwnedBuffer]) -> WrapperResult<OwnedBuffer> + Send + Sync>;

/// Information about a registered wrapper
#[derive(Clone, Serialize)]
pub struct WrapperInfo {
    /// Unique ID for this wrapper
    pub id: u64,
    /// Primary name of the wrapper
    pub name: String,
    /// Description of what the wrapper does
    pub description: String,
    /// Category for organization
    pub category: WrapperCategory,
    /// Number of required input arguments
    pub arg_count: usize,
}

impl fmt::Debug for WrapperInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("arg_count", &self.arg_count)
            .finish()
    }
}

/// Categories of wrappers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapperCategory {
    /// Compression/decompression
    Compression,
    /// Non-cryptographic hashing
    Hashing,
    /// Image codecs
    Image,
    /// JSON parsing and filtering
    Json,
    /// Text grammars and sanitizers
    Text,
    /// Other
    Other,
}

impl WrapperCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WrapperCategory::Compression => "compression",
            WrapperCategory::Hashing => "hashing",
            WrapperCategory::Image => "image",
            WrapperCategory::Json => "json",
            WrapperCategory::Text => "text",
            WrapperCategory::Other => "other",
        }
    }
}

/// Flat function table of buffer-in / buffer-out adapter operations
pub struct WrapperRegistry {
    /// Wrapper ID -> Wrapper info
    wrappers: HashMap<u64, WrapperInfo>,
    /// Wrapper ID -> Wrapper function
    functions: HashMap<u64, WrapperFn>,
    /// Name -> Wrapper ID (exact lookup)
    by_name: HashMap<String, u64>,
    /// Next available ID
    next_id: u64,
}

impl WrapperRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            wrappers: HashMap::new(),
            functions: HashMap::new(),
            by_name: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create a new registry with all bundled wrappers registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Register all built-in wrappers
    pub fn register_builtins(&mut self) {
        compression::register(self);
        hashing::register(self);
        qoi::register(self);
        blurhash::register(self);
        image::register(self);
        json::register(self);
        jq::register(self);
        expr::register(self);
        sanitize::register(self);
    }

    /// Register a wrapper
    pub fn register_wrapper<F>(
        &mut self,
        name: &str,
        description: &str,
        category: WrapperCategory,
        arg_count: usize,
        func: F,
    ) -> u64
    where
        F: Fn(&[OwnedBuffer]) -> WrapperResult<OwnedBuffer> + Send + Sync + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        let info = WrapperInfo {
            id,
            name: name.to_string(),
            description: description.to_string(),
            category,
            arg_count,
        };

        self.wrappers.insert(id, info);
        self.functions.insert(id, Arc::new(func));
        self.by_name.insert(name.to_lowercase(), id);

        id
    }

    /// Get a wrapper by ID
    pub fn get(&self, id: u64) -> Option<&WrapperInfo> {
        self.wrappers.get(&id)
    }

    /// Get a wrapper by exact name
    pub fn get_by_name(&self, name: &str) -> Option<&WrapperInfo> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.wrappers.get(id))
    }

    /// Get a wrapper ID by name
    pub fn get_id(&self, name: &str) -> Option<u64> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Call a wrapper by ID
    pub fn call(&self, id: u64, args: &[OwnedBuffer]) -> WrapperResult<OwnedBuffer> {
        let info = self.wrappers.get(&id).ok_or(WrapperError::HandleNotFound(id))?;
        if args.len() < info.arg_count {
            return Err(WrapperError::InvalidArg(format!(
                "{} expects {} argument(s), got {}",
                info.name,
                info.arg_count,
                args.len()
            )));
        }
        let func = self
            .functions
            .get(&id)
            .ok_or(WrapperError::HandleNotFound(id))?;
        func(args)
    }

    /// Call a wrapper by name
    pub fn call_by_name(&self, name: &str, args: &[OwnedBuffer]) -> WrapperResult<OwnedBuffer> {
        let id = self
            .get_id(name)
            .ok_or_else(|| WrapperError::InvalidArg(format!("Unknown wrapper: {}", name)))?;
        self.call(id, args)
    }

    /// List all registered wrappers, ordered by ID
    pub fn list(&self) -> Vec<&WrapperInfo> {
        let mut all: Vec<&WrapperInfo> = self.wrappers.values().collect();
        all.sort_by_key(|w| w.id);
        all
    }

    /// List wrappers by category
    pub fn list_by_category(&self, category: WrapperCategory) -> Vec<&WrapperInfo> {
        self.list()
            .into_iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// JSON array describing every registered wrapper
    pub fn catalog_json(&self) -> String {
        serde_json::to_string(&self.list()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Get the number of registered wrappers
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }
}

impl Default for WrapperRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = WrapperRegistry::with_builtins();
        assert!(!registry.is_empty());
        for name in ["lz4_compress", "xxhash64", "qoi_encode", "jq_filter", "html_clean"] {
            assert!(registry.get_by_name(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_wrapper_registration() {
        let mut registry = WrapperRegistry::new();

        let id = registry.register_wrapper(
            "echo",
            "Return the first argument",
            WrapperCategory::Other,
            1,
            |args| Ok(arg(args, 0, "input")?.clone()),
        );

        assert!(registry.get(id).is_some());
        assert_eq!(registry.get_id("ECHO"), Some(id));
        let out = registry
            .call_by_name("echo", &[OwnedBuffer::from_str("hi")])
            .unwrap();
        assert_eq!(out.as_slice(), b"hi");
    }

    #[test]
    fn test_arity_is_checked_before_dispatch() {
        let mut registry = WrapperRegistry::new();
        registry.register_wrapper("two", "Needs two", WrapperCategory::Other, 2, |_| {
            Ok(OwnedBuffer::new())
        });
        let err = registry
            .call_by_name("two", &[OwnedBuffer::new()])
            .unwrap_err();
        assert!(matches!(err, WrapperError::InvalidArg(_)));
    }

    #[test]
    fn test_unknown_name_and_id() {
        let registry = WrapperRegistry::new();
        assert!(matches!(
            registry.call_by_name("nope", &[]),
            Err(WrapperError::InvalidArg(_))
        ));
        assert!(matches!(
            registry.call(99, &[]),
            Err(WrapperError::HandleNotFound(99))
        ));
    }

    #[test]
    fn test_catalog_json_lists_categories() {
        let registry = WrapperRegistry::with_builtins();
        let catalog: serde_json::Value = serde_json::from_str(&registry.catalog_json()).unwrap();
        let entries = catalog.as_array().unwrap();
        assert_eq!(entries.len(), registry.len());
        assert!(entries
            .iter()
            .any(|e| e["name"] == "lz4_compress" && e["category"] == "compression"));
        assert!(!registry.list_by_category(WrapperCategory::Hashing).is_empty());
    }

    #[test]
    fn test_integer_arguments_are_little_endian() {
        let args = [OwnedBuffer::from_vec(vec![0x01, 0x02])];
        assert_eq!(arg_u64(&args, 0, "n").unwrap(), 0x0201);
        assert_eq!(arg_u64_or(&args, 3, "n", 7).unwrap(), 7);
        let wide = [OwnedBuffer::from_vec(vec![0, 0, 0, 0, 1])];
        assert!(arg_u32(&wide, 0, "n").is_err());
    }
}
