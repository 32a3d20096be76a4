//! Host Memory
//!
//! Two halves of the ownership story at the boundary:
//!
//! - [`Allocations`] owns every buffer handed to the host. A pointer is
//!   released only through [`Allocations::release`]; unknown or already
//!   released pointers are ignored.
//! - [`HostSlice`] / [`HostSliceMut`] are bounds-checked views of memory the
//!   host owns, built from a `(ptr, len)` pair and never retained past the
//!   call that created them.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::wrappers::{WrapperError, WrapperResult};

// =============================================================================
// Adapter-owned allocations
// =============================================================================

/// A buffer handed to the host: its address and its logical length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAllocation {
    pub ptr: *mut u8,
    pub len: usize,
}

#[derive(Debug)]
struct Block {
    // u64 words keep every address 8-byte aligned
    words: Box<[u64]>,
    len: usize,
}

/// The single owner of buffers whose ownership passed to the host
#[derive(Debug, Default)]
pub struct Allocations {
    blocks: HashMap<usize, Block>,
    live_bytes: usize,
}

fn zeroed_words(len: usize) -> WrapperResult<Vec<u64>> {
    let count = len.div_ceil(8).max(1);
    let mut words: Vec<u64> = Vec::new();
    words
        .try_reserve_exact(count)
        .map_err(|_| WrapperError::AllocationFailed { requested: len })?;
    words.resize(count, 0);
    Ok(words)
}

impl Allocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `len` zeroed bytes for the host to fill
    pub fn alloc(&mut self, len: usize) -> WrapperResult<HostAllocation> {
        let words = zeroed_words(len)?;
        Ok(self.register(words.into_boxed_slice(), len))
    }

    /// Copy `bytes` into a new host-owned buffer
    pub fn adopt(&mut self, bytes: &[u8]) -> WrapperResult<HostAllocation> {
        let mut words = zeroed_words(bytes.len())?;
        for (word, chunk) in words.iter_mut().zip(bytes.chunks(8)) {
            let mut raw = [0u8; 8];
            raw[..chunk.len()].copy_from_slice(chunk);
            *word = u64::from_ne_bytes(raw);
        }
        Ok(self.register(words.into_boxed_slice(), bytes.len()))
    }

    fn register(&mut self, mut words: Box<[u64]>, len: usize) -> HostAllocation {
        let ptr = words.as_mut_ptr() as *mut u8;
        self.blocks.insert(ptr as usize, Block { words, len });
        self.live_bytes += len;
        tracing::debug!(addr = ptr as usize, len, "buffer handed to host");
        HostAllocation { ptr, len }
    }

    /// Release a buffer. Returns `false` (and does nothing) for pointers this
    /// table does not own, including ones already released.
    pub fn release(&mut self, ptr: *const u8) -> bool {
        match self.blocks.remove(&(ptr as usize)) {
            Some(block) => {
                self.live_bytes -= block.len;
                tracing::debug!(addr = ptr as usize, len = block.len, "buffer released");
                true
            }
            None => {
                if !ptr.is_null() {
                    tracing::warn!(addr = ptr as usize, "release of unowned pointer ignored");
                }
                false
            }
        }
    }

    /// Logical length of an owned buffer
    pub fn len_of(&self, ptr: *const u8) -> Option<usize> {
        self.blocks.get(&(ptr as usize)).map(|b| b.len)
    }

    /// Check if `ptr` is a live buffer owned by this table
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.blocks.contains_key(&(ptr as usize))
    }

    /// Contents of an owned buffer
    pub fn bytes(&self, ptr: *const u8) -> Option<&[u8]> {
        self.blocks.get(&(ptr as usize)).map(|block| {
            // SAFETY: the block holds at least `len` initialized bytes and is
            // borrowed for the lifetime of the returned slice.
            unsafe { std::slice::from_raw_parts(block.words.as_ptr() as *const u8, block.len) }
        })
    }

    /// Number of buffers currently owned by the host
    pub fn live_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total logical bytes currently owned by the host
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }
}

// =============================================================================
// Views of host-owned memory
// =============================================================================

fn check_raw<T>(addr: usize, len: usize) -> WrapperResult<()> {
    if addr == 0 {
        return Err(WrapperError::InvalidArg(format!(
            "null pointer with length {}",
            len
        )));
    }
    if addr % std::mem::align_of::<T>() != 0 {
        return Err(WrapperError::InvalidArg(format!(
            "pointer {:#x} is not aligned to {} bytes",
            addr,
            std::mem::align_of::<T>()
        )));
    }
    let bytes = len.checked_mul(std::mem::size_of::<T>());
    if !matches!(bytes, Some(b) if b <= isize::MAX as usize) {
        return Err(WrapperError::InvalidArg(format!(
            "length {} is out of range",
            len
        )));
    }
    Ok(())
}

/// Read-only view of caller-owned memory
#[derive(Debug, Clone, Copy)]
pub struct HostSlice<'a, T = u8> {
    data: &'a [T],
}

impl<'a, T> HostSlice<'a, T> {
    /// Build a view from a host `(ptr, len)` pair. Null is accepted only
    /// with length 0.
    ///
    /// # Safety
    ///
    /// When `len > 0`, `ptr` must point to `len` initialized values that stay
    /// valid and unmodified for `'a`.
    pub unsafe fn from_raw(ptr: *const T, len: usize) -> WrapperResult<Self> {
        if len == 0 {
            return Ok(Self { data: &[] });
        }
        check_raw::<T>(ptr as usize, len)?;
        Ok(Self {
            data: std::slice::from_raw_parts(ptr, len),
        })
    }

    pub fn from_slice(data: &'a [T]) -> Self {
        Self { data }
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<'a> HostSlice<'a, u8> {
    /// Interpret the view as UTF-8 text
    pub fn as_str(&self, what: &str) -> WrapperResult<&'a str> {
        std::str::from_utf8(self.data)
            .map_err(|e| WrapperError::InvalidArg(format!("{} is not UTF-8: {}", what, e)))
    }
}

/// Writable view of caller-owned memory with a fixed capacity
#[derive(Debug)]
pub struct HostSliceMut<'a, T = u8> {
    base: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

impl<'a, T: Copy> HostSliceMut<'a, T> {
    /// Build a writable view from a host `(ptr, capacity)` pair.
    ///
    /// # Safety
    ///
    /// When `len > 0`, `ptr` must be valid for writes of `len` values and not
    /// aliased by any other live reference for `'a`.
    pub unsafe fn from_raw(ptr: *mut T, len: usize) -> WrapperResult<Self> {
        if len == 0 {
            return Ok(Self {
                base: std::ptr::NonNull::dangling().as_ptr(),
                len: 0,
                _marker: PhantomData,
            });
        }
        check_raw::<T>(ptr as usize, len)?;
        Ok(Self {
            base: ptr,
            len,
            _marker: PhantomData,
        })
    }

    pub fn from_mut_slice(slice: &'a mut [T]) -> Self {
        Self {
            base: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    /// Capacity of the view
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Copy `data` at `offset`. Fails without writing anything when it would
    /// run past the capacity.
    pub fn write(&mut self, offset: usize, data: &[T]) -> WrapperResult<usize> {
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= self.len)
            .ok_or(WrapperError::BufferTooSmall {
                required: offset.saturating_add(data.len()),
                provided: self.len,
            })?;
        self.as_mut_slice()[offset..end].copy_from_slice(data);
        Ok(data.len())
    }

    /// Copy `data` at the start of the view
    pub fn write_all(&mut self, data: &[T]) -> WrapperResult<usize> {
        self.write(0, data)
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: `from_raw` / `from_mut_slice` established that `base` is
        // valid for `len` writes for 'a, and `&mut self` makes this borrow
        // exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.base, self.len) }
    }
}
