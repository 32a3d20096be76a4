//! Hashing Wrappers
//!
//! Non-cryptographic xxHash family via `xxhash-rust`.
//!
//! # Supported Algorithms
//!
//! - **XXH32** - 32-bit, seedable
//! - **XXH64** - 64-bit, seedable
//! - **XXH3** - 64-bit and 128-bit one-shot, plus the [`Xxh3Stream`] session
//!
//! Wide results cross the boundary as [`Digest64`] / [`Digest128`]: fixed
//! `#[repr(C)]` records of `u32` words, low word first.

use serde::Serialize;
use xxhash_rust::xxh3::{self, Xxh3};
use xxhash_rust::{xxh32, xxh64};

use super::{arg, arg_u64_or, OwnedBuffer, WrapperCategory, WrapperError, WrapperRegistry, WrapperResult};

/// Adapter version string
pub fn xxhash_version() -> &'static str {
    concat!("xxhash-adapter ", env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// Digest records
// =============================================================================

/// 64-bit digest as two `u32` words, low word first
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Digest64 {
    pub low: u32,
    pub high: u32,
}

impl Digest64 {
    pub fn from_u64(value: u64) -> Self {
        Self {
            low: value as u32,
            high: (value >> 32) as u32,
        }
    }

    pub fn to_u64(self) -> u64 {
        (u64::from(self.high) << 32) | u64::from(self.low)
    }

    /// Canonical big-endian hex form, as printed by `xxhsum`
    pub fn to_hex(self) -> String {
        hex::encode(self.to_u64().to_be_bytes())
    }
}

impl From<u64> for Digest64 {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

/// 128-bit digest as four `u32` words: low 64 bits (low, high) then high
/// 64 bits (low, high)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Digest128 {
    pub low0: u32,
    pub high0: u32,
    pub low1: u32,
    pub high1: u32,
}

impl Digest128 {
    pub fn from_u128(value: u128) -> Self {
        let low = Digest64::from_u64(value as u64);
        let high = Digest64::from_u64((value >> 64) as u64);
        Self {
            low0: low.low,
            high0: low.high,
            low1: high.low,
            high1: high.high,
        }
    }

    pub fn to_u128(self) -> u128 {
        let low = Digest64 {
            low: self.low0,
            high: self.high0,
        };
        let high = Digest64 {
            low: self.low1,
            high: self.high1,
        };
        (u128::from(high.to_u64()) << 64) | u128::from(low.to_u64())
    }

    /// Canonical big-endian hex form
    pub fn to_hex(self) -> String {
        hex::encode(self.to_u128().to_be_bytes())
    }
}

impl From<u128> for Digest128 {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

// =============================================================================
// One-shot hashes
// =============================================================================

pub fn xxhash32(data: &[u8], seed: u32) -> u32 {
    xxh32::xxh32(data, seed)
}

pub fn xxhash64(data: &[u8], seed: u64) -> Digest64 {
    Digest64::from_u64(xxh64::xxh64(data, seed))
}

pub fn xxh3_64(data: &[u8]) -> Digest64 {
    Digest64::from_u64(xxh3::xxh3_64(data))
}

pub fn xxh3_64_with_seed(data: &[u8], seed: u64) -> Digest64 {
    Digest64::from_u64(xxh3::xxh3_64_with_seed(data, seed))
}

pub fn xxh3_128(data: &[u8]) -> Digest128 {
    Digest128::from_u128(xxh3::xxh3_128(data))
}

// =============================================================================
// Streaming session
// =============================================================================

/// Incremental XXH3 state. Feeding the same bytes in any chunking yields the
/// one-shot digest.
#[derive(Clone)]
pub struct Xxh3Stream {
    state: Box<Xxh3>,
    seed: u64,
}

impl Xxh3Stream {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Box::new(Xxh3::with_seed(seed)),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// 64-bit digest of everything fed so far; the state stays usable
    pub fn digest(&self) -> Digest64 {
        Digest64::from_u64(self.state.digest())
    }

    /// 128-bit digest of everything fed so far
    pub fn digest128(&self) -> Digest128 {
        Digest128::from_u128(self.state.digest128())
    }

    /// Forget all input, keeping the seed
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

impl Default for Xxh3Stream {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Register all hashing wrappers with the registry. Digests are returned as
/// little-endian bytes.
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "xxhash32",
        "XXH32 of the input (optional second arg: LE seed)",
        WrapperCategory::Hashing,
        1,
        |args| {
            let seed = u32::try_from(arg_u64_or(args, 1, "seed", 0)?)
                .map_err(|_| WrapperError::invalid("xxhash32", "seed does not fit in 32 bits"))?;
            let hash = xxhash32(arg(args, 0, "input")?, seed);
            Ok(OwnedBuffer::from_slice(&hash.to_le_bytes()))
        },
    );

    registry.register_wrapper(
        "xxhash64",
        "XXH64 of the input (optional second arg: LE seed)",
        WrapperCategory::Hashing,
        1,
        |args| {
            let seed = arg_u64_or(args, 1, "seed", 0)?;
            let hash = xxhash64(arg(args, 0, "input")?, seed);
            Ok(OwnedBuffer::from_slice(&hash.to_u64().to_le_bytes()))
        },
    );

    registry.register_wrapper(
        "xxh3_64",
        "XXH3 64-bit hash of the input (optional second arg: LE seed)",
        WrapperCategory::Hashing,
        1,
        |args| {
            let seed = arg_u64_or(args, 1, "seed", 0)?;
            let hash = xxh3_64_with_seed(arg(args, 0, "input")?, seed);
            Ok(OwnedBuffer::from_slice(&hash.to_u64().to_le_bytes()))
        },
    );

    registry.register_wrapper(
        "xxh3_128",
        "XXH3 128-bit hash of the input",
        WrapperCategory::Hashing,
        1,
        |args| -> WrapperResult<OwnedBuffer> {
            let hash = xxh3_128(arg(args, 0, "input")?);
            Ok(OwnedBuffer::from_slice(&hash.to_u128().to_le_bytes()))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(xxhash32(b"", 0), 0x02CC_5D05);
        assert_eq!(xxhash64(b"", 0).to_u64(), 0xEF46_DB37_51D8_E999);
        assert_eq!(xxh3_64(b"").to_u64(), 0x2D06_8005_38D3_94C2);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let data = b"The quick brown fox jumps over the lazy dog";
        assert_eq!(xxhash32(data, 7), xxhash32(data, 7));
        assert_ne!(xxhash32(data, 7), xxhash32(data, 8));
        assert_eq!(xxhash64(data, 99), xxhash64(data, 99));
        assert_ne!(xxh3_64_with_seed(data, 1), xxh3_64_with_seed(data, 2));
        assert_eq!(xxh3_64_with_seed(data, 0), xxh3_64(data));
    }

    #[test]
    fn test_digest_word_order() {
        let d = Digest64::from_u64(0x1122_3344_5566_7788);
        assert_eq!(d.low, 0x5566_7788);
        assert_eq!(d.high, 0x1122_3344);
        assert_eq!(d.to_hex(), "1122334455667788");

        let wide = Digest128::from_u128(0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10);
        assert_eq!(wide.low0, 0x0D0E_0F10);
        assert_eq!(wide.high0, 0x090A_0B0C);
        assert_eq!(wide.low1, 0x0506_0708);
        assert_eq!(wide.high1, 0x0102_0304);
        assert_eq!(wide.to_u128(), 0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10);
    }

    #[test]
    fn test_stream_matches_one_shot() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let mut stream = Xxh3Stream::with_seed(42);
        for chunk in data.chunks(37) {
            stream.update(chunk);
        }
        assert_eq!(stream.digest(), xxh3_64_with_seed(&data, 42));

        let mut plain = Xxh3Stream::new();
        plain.update(&data);
        assert_eq!(plain.digest128(), xxh3_128(&data));
    }

    #[test]
    fn test_registry_xxhash32_seed_range() {
        let mut registry = WrapperRegistry::new();
        register(&mut registry);
        let input = OwnedBuffer::from_slice(b"seeded");

        let seeded = registry
            .call_by_name("xxhash32", &[input.clone(), OwnedBuffer::from_slice(&7u32.to_le_bytes())])
            .unwrap();
        assert_eq!(seeded.as_slice(), &xxhash32(b"seeded", 7).to_le_bytes());

        let wide = OwnedBuffer::from_slice(&(1u64 << 32 | 7).to_le_bytes());
        let err = registry.call_by_name("xxhash32", &[input, wide]).unwrap_err();
        assert!(matches!(err, WrapperError::InvalidInput { adapter: "xxhash32", .. }));
    }

    #[test]
    fn test_stream_reset_keeps_seed() {
        let mut stream = Xxh3Stream::with_seed(5);
        stream.update(b"discarded");
        stream.reset();
        stream.update(b"kept");
        assert_eq!(stream.seed(), 5);
        assert_eq!(stream.digest(), xxh3_64_with_seed(b"kept", 5));
    }
}
