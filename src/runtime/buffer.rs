//! Adapter Results
//!
//! Every allocating adapter returns an [`OwnedBuffer`]. At the C ABI its bytes
//! move into the allocation table (see [`super::memory`]) and the host owns
//! the copy.

/// Bytes produced by an adapter, owned until handed to the host
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OwnedBuffer {
    data: Vec<u8>,
}

impl OwnedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `size` zero bytes, for decoders that write in place and then shrink
    pub fn zeroed(size: usize) -> Self {
        Self { data: vec![0u8; size] }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self { data: data.to_vec() }
    }

    /// Registry argument from text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Self {
        Self::from_slice(text.as_bytes())
    }

    /// Text result (JSON, jq output, hashes, sanitized HTML)
    pub fn from_string(text: String) -> Self {
        Self { data: text.into_bytes() }
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

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// View as UTF-8, failing on invalid bytes
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }

    /// Drop everything past `len` bytes actually produced
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }
}

impl std::ops::Deref for OwnedBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_then_truncated() {
        let mut buf = OwnedBuffer::zeroed(8);
        assert_eq!(buf.len(), 8);
        buf.as_mut_slice()[..3].copy_from_slice(b"abc");
        buf.truncate(3);
        assert_eq!(buf.as_str().unwrap(), "abc");
        assert!(OwnedBuffer::new().is_empty());
    }

    #[test]
    fn test_as_str_rejects_invalid_utf8() {
        assert!(OwnedBuffer::from_vec(vec![0xff, 0xfe]).as_str().is_err());
        assert_eq!(OwnedBuffer::from_string("ok".to_string()).into_vec(), b"ok");
        assert_eq!(OwnedBuffer::from_str("x").as_slice(), b"x");
    }
}
