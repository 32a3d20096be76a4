//! JSON and jq Exports
//!
//! Parsed documents and compiled jq filters are sessions behind `u32`
//! handles. Compiled filters are not `Send`, so their table is per thread:
//! a filter handle is only valid on the thread that compiled it.

use std::cell::RefCell;
use std::os::raw::c_char;

use parking_lot::Mutex;

use super::{guard, guard_alloc, hand_over_text, host_str, static_c_str, store_required};
use crate::runtime::{Handle, HandleTable};
use crate::wrappers::jq::{self, JqFilter};
use crate::wrappers::json::{self, JsonDocument};
use crate::wrappers::{WrapperError, WrapperResult};

lazy_static::lazy_static! {
    static ref DOCUMENTS: Mutex<HandleTable<JsonDocument>> = Mutex::new(HandleTable::new("json_document"));
}

thread_local! {
    static FILTERS: RefCell<HandleTable<JqFilter>> = RefCell::new(HandleTable::new("jq_filter"));
}

/// Run `f` against a live document and the looked-up key
unsafe fn with_document<R>(
    handle: Handle,
    key: *const u8,
    key_len: usize,
    f: impl FnOnce(&JsonDocument, &str) -> WrapperResult<R>,
) -> WrapperResult<R> {
    let key = host_str(key, key_len, "key")?;
    let documents = DOCUMENTS.lock();
    let document = documents
        .get(handle)
        .ok_or(WrapperError::HandleNotFound(handle.into()))?;
    f(document, key)
}

fn missing(key: &str, kind: &str) -> WrapperError {
    WrapperError::invalid("json", format!("no {} at `{}`", kind, key))
}

// ========== Validation ==========

/// 1 for well-formed JSON, 0 otherwise
///
/// # Safety
///
/// `text` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn json_validate(text: *const u8, len: usize) -> i32 {
    guard("json_validate", 0, || Ok(json::validate(host_str(text, len, "json")?) as i32))
}

/// `"ok"` or `"error: <message>"` as host-owned text
///
/// # Safety
///
/// `text` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn json_parse_status(text: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("json_parse_status", out_len, || {
        hand_over_text(json::parse_status(host_str(text, len, "json")?), out_len)
    })
}

// ========== Document sessions ==========

/// Parse a document; returns its handle, 0 on malformed JSON
///
/// # Safety
///
/// `text` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn json_parse(text: *const u8, len: usize) -> Handle {
    guard("json_parse", 0, || {
        let document = JsonDocument::parse(host_str(text, len, "json")?)?;
        Ok(DOCUMENTS.lock().insert(document))
    })
}

/// String at `key` as host-owned text; null when absent or not a string
///
/// # Safety
///
/// `key` must be valid for `key_len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn json_get_string(
    handle: Handle,
    key: *const u8,
    key_len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    guard_alloc("json_get_string", out_len, || {
        let value = with_document(handle, key, key_len, |doc, key| {
            doc.get_str(key).map(str::to_string).ok_or_else(|| missing(key, "string"))
        })?;
        hand_over_text(value, out_len)
    })
}

/// Integer at `key` into `out`. 1 when found, 0 otherwise.
///
/// # Safety
///
/// `key` must be valid for `key_len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn json_get_int64(handle: Handle, key: *const u8, key_len: usize, out: *mut i64) -> i32 {
    guard("json_get_int64", 0, || {
        let value = with_document(handle, key, key_len, |doc, key| {
            doc.get_i64(key).ok_or_else(|| missing(key, "integer"))
        })?;
        store_required(out, value, "out")?;
        Ok(1)
    })
}

/// Number at `key` into `out`. 1 when found, 0 otherwise.
///
/// # Safety
///
/// `key` must be valid for `key_len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn json_get_double(handle: Handle, key: *const u8, key_len: usize, out: *mut f64) -> i32 {
    guard("json_get_double", 0, || {
        let value = with_document(handle, key, key_len, |doc, key| {
            doc.get_f64(key).ok_or_else(|| missing(key, "number"))
        })?;
        store_required(out, value, "out")?;
        Ok(1)
    })
}

/// Boolean at `key` into `out` (0 or 1). 1 when found, 0 otherwise.
///
/// # Safety
///
/// `key` must be valid for `key_len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn json_get_bool(handle: Handle, key: *const u8, key_len: usize, out: *mut i32) -> i32 {
    guard("json_get_bool", 0, || {
        let value = with_document(handle, key, key_len, |doc, key| {
            doc.get_bool(key).ok_or_else(|| missing(key, "boolean"))
        })?;
        store_required(out, value as i32, "out")?;
        Ok(1)
    })
}

/// Length of the array at `key` (empty key = root), -1 when absent
///
/// # Safety
///
/// `key` must be valid for `key_len` reads.
#[no_mangle]
pub unsafe extern "C" fn json_count_array(handle: Handle, key: *const u8, key_len: usize) -> i64 {
    guard("json_count_array", -1, || {
        let count = with_document(handle, key, key_len, |doc, key| {
            doc.count_array(key).ok_or_else(|| missing(key, "array"))
        })?;
        Ok(count as i64)
    })
}

/// Destroy a document. 1 when it existed, 0 otherwise.
#[no_mangle]
pub extern "C" fn json_destroy(handle: Handle) -> i32 {
    guard("json_destroy", 0, || Ok(DOCUMENTS.lock().remove(handle).is_some() as i32))
}

// ========== jq ==========

/// NUL-terminated jq adapter version
#[no_mangle]
pub extern "C" fn jq_version() -> *const c_char {
    static_c_str(jq::jq_version())
}

/// Compile a filter; returns its handle, 0 when the filter does not compile
/// (nothing runs in that case)
///
/// # Safety
///
/// `filter` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn jq_compile(filter: *const u8, len: usize) -> Handle {
    guard("jq_compile", 0, || {
        let compiled = JqFilter::compile(host_str(filter, len, "filter")?)?;
        Ok(FILTERS.with(|table| table.borrow_mut().insert(compiled)))
    })
}

/// Run a compiled filter against JSON text; result as host-owned text
///
/// # Safety
///
/// `json` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn jq_run(handle: Handle, json: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("jq_run", out_len, || {
        let input = host_str(json, len, "json")?;
        let result = FILTERS.with(|table| {
            table
                .borrow()
                .with(handle, |filter| filter.run(input))
                .ok_or(WrapperError::HandleNotFound(handle.into()))
        })??;
        hand_over_text(result, out_len)
    })
}

/// Compile and run in one call; null when the filter does not compile
///
/// # Safety
///
/// `filter` and `json` must be valid for their lengths; `out_len` null or
/// writable.
#[no_mangle]
pub unsafe extern "C" fn jq_filter(
    filter: *const u8,
    filter_len: usize,
    json: *const u8,
    json_len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    guard_alloc("jq_filter", out_len, || {
        let filter = host_str(filter, filter_len, "filter")?;
        let input = host_str(json, json_len, "json")?;
        hand_over_text(jq::filter(filter, input)?, out_len)
    })
}

/// Destroy a compiled filter. 1 when it existed, 0 otherwise.
#[no_mangle]
pub extern "C" fn jq_destroy(handle: Handle) -> i32 {
    guard("jq_destroy", 0, || {
        Ok(FILTERS.with(|table| table.borrow_mut().remove(handle)).is_some() as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{bridge_free, buffer_contents};

    fn text_of(ptr: *mut u8, len: usize) -> String {
        let bytes = buffer_contents(ptr).unwrap();
        assert_eq!(bytes[len], 0);
        String::from_utf8(bytes[..len].to_vec()).unwrap()
    }

    #[test]
    fn test_document_session() {
        let doc = br#"{"name": "widget", "size": {"w": 3, "h": 1.5}, "ok": true, "tags": [1, 2, 3]}"#;
        let handle = unsafe { json_parse(doc.as_ptr(), doc.len()) };
        assert_ne!(handle, 0);

        let mut len = 0usize;
        let name = unsafe { json_get_string(handle, b"name".as_ptr(), 4, &mut len) };
        assert_eq!(text_of(name, len), "widget");
        bridge_free(name);

        let mut w = 0i64;
        assert_eq!(unsafe { json_get_int64(handle, b"size.w".as_ptr(), 6, &mut w) }, 1);
        assert_eq!(w, 3);
        let mut h = 0f64;
        assert_eq!(unsafe { json_get_double(handle, b"size.h".as_ptr(), 6, &mut h) }, 1);
        assert_eq!(h, 1.5);
        let mut ok = 0i32;
        assert_eq!(unsafe { json_get_bool(handle, b"ok".as_ptr(), 2, &mut ok) }, 1);
        assert_eq!(ok, 1);
        assert_eq!(unsafe { json_count_array(handle, b"tags".as_ptr(), 4) }, 3);
        assert_eq!(unsafe { json_count_array(handle, b"name".as_ptr(), 4) }, -1);

        assert_eq!(json_destroy(handle), 1);
        assert_eq!(json_destroy(handle), 0);
        assert_eq!(unsafe { json_get_int64(handle, b"size.w".as_ptr(), 6, &mut w) }, 0);
    }

    #[test]
    fn test_malformed_json_has_no_handle() {
        let bad = b"{\"a\": ";
        assert_eq!(unsafe { json_parse(bad.as_ptr(), bad.len()) }, 0);
        assert_eq!(unsafe { json_validate(bad.as_ptr(), bad.len()) }, 0);
        let mut len = 0usize;
        let status = unsafe { json_parse_status(bad.as_ptr(), bad.len(), &mut len) };
        assert!(text_of(status, len).starts_with("error: "));
        bridge_free(status);
    }

    #[test]
    fn test_jq_session() {
        let filter = b".items | map(.id)";
        let handle = unsafe { jq_compile(filter.as_ptr(), filter.len()) };
        assert_ne!(handle, 0);

        let input = br#"{"items": [{"id": 1}, {"id": 2}]}"#;
        let mut len = 0usize;
        let out = unsafe { jq_run(handle, input.as_ptr(), input.len(), &mut len) };
        assert_eq!(text_of(out, len), "[1,2]");
        bridge_free(out);

        assert_eq!(jq_destroy(handle), 1);
        let stale = unsafe { jq_run(handle, input.as_ptr(), input.len(), &mut len) };
        assert!(stale.is_null());
    }

    #[test]
    fn test_jq_invalid_filter_sentinel() {
        let bad = b".[";
        assert_eq!(unsafe { jq_compile(bad.as_ptr(), bad.len()) }, 0);
        assert!(crate::ffi::last_error().unwrap().starts_with("jq_compile"));

        let input = b"{}";
        let out = unsafe { jq_filter(bad.as_ptr(), bad.len(), input.as_ptr(), input.len(), std::ptr::null_mut()) };
        assert!(out.is_null());
    }
}
