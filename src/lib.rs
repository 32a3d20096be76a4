//! Hostbridge - Boundary Adapters for Native Libraries
//!
//! Exposes a set of well-known libraries to foreign hosts (C, Go, WASM
//! runtimes) through a flat C ABI: byte buffers and numbers cross the
//! boundary, sessions live behind integer handles, and every buffer handed
//! to the host is owned by a tracked allocation table until the host frees it.
//!
//! # Features
//!
//! - **Compression**: LZ4 (fast, HC, size-prefixed) and Snappy raw blocks
//! - **Hashing**: xxHash32/64 and XXH3 64/128 with streaming sessions
//! - **Images**: QOI encode/decode, BlurHash, stb-style decode and format probes
//! - **JSON**: validation, parsed-document sessions, jq filters
//! - **Expressions**: arithmetic grammar parsing and validation
//! - **Linear algebra**: dense matrix sessions, solves, eigenvalues
//! - **3D math**: vec3/mat4/quaternion operations on flat float arrays
//! - **DSP**: Butterworth and RBJ biquad filter sessions
//! - **HTML**: whitelist sanitizing
//!
//! # Error Convention
//!
//! Exports never unwind into the host. A failing call returns its sentinel
//! (null, 0, -1 or NaN, documented per export) and records a message that
//! the host reads with `bridge_last_error_message`.
//!
//! # Example
//!
//! ```rust
//! use hostbridge::{OwnedBuffer, WrapperRegistry};
//!
//! let registry = WrapperRegistry::with_builtins();
//! let packed = registry
//!     .call_by_name("lz4_compress_sized", &[OwnedBuffer::from_slice(b"aaaaaaaaaaaaaaaa")])
//!     .unwrap();
//! let unpacked = registry.call_by_name("lz4_decompress_sized", &[packed]).unwrap();
//!
//! assert_eq!(unpacked.as_slice(), b"aaaaaaaaaaaaaaaa");
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Host          │  C / Go / WASM runtime
//! └────────┬────────┘
//!          │  pointers, lengths, handles
//!          ▼
//! ┌─────────────────┐
//! │   ffi           │  #[no_mangle] exports, guard, last error
//! └────────┬────────┘
//!          │
//!     ┌────┴────┐
//!     ▼         ▼
//! ┌───────┐  ┌──────────┐
//! │runtime│  │ wrappers │  safe Rust adapters
//! └───────┘  └────┬─────┘
//!  buffers,       │
//!  handles        ▼
//! ┌─────────────────────┐
//! │   Library crates    │  lz4, snap, xxhash, qoi, image, jaq, ...
//! └─────────────────────┘
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod ffi;
pub mod runtime;
pub mod wrappers;

// Configuration
pub use config::{BridgeConfig, ConfigError, ConfigResult};

// Host memory and sessions
pub use runtime::{Allocations, Handle, HandleTable, HostSlice, HostSliceMut};

// Safe wrappers
pub use wrappers::{OwnedBuffer, WrapperCategory, WrapperError, WrapperRegistry, WrapperResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_package() {
        assert!(!VERSION.is_empty());
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
