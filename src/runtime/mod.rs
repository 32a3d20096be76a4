//! Runtime module
//!
//! Ownership primitives shared by every adapter:
//!
//! - [`OwnedBuffer`] - the Rust-side result of any allocating transform
//! - [`HandleTable`] - opaque `u32` handles for stateful sessions
//! - [`Allocations`] - the single owner of buffers handed to the host
//! - [`HostSlice`] / [`HostSliceMut`] - bounds-checked views of host memory

pub mod buffer;
pub mod handles;
pub mod memory;

pub use buffer::OwnedBuffer;
pub use handles::{Handle, HandleTable};
pub use memory::{Allocations, HostAllocation, HostSlice, HostSliceMut};
