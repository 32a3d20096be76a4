//! Text Exports
//!
//! Arithmetic-expression parsing and HTML sanitizing.

use super::{guard, guard_alloc, hand_over_text, host_str};
use crate::wrappers::{expr, sanitize};

/// Parse an expression. Returns `SUCCESS\nTokens: ...` or `ERROR: ...` as
/// host-owned text; null only when `text` itself is unusable.
///
/// # Safety
///
/// `text` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn expr_parse(text: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("expr_parse", out_len, || {
        hand_over_text(expr::parse(host_str(text, len, "expression")?).render(), out_len)
    })
}

/// 1 when `text` is a complete expression, 0 otherwise
///
/// # Safety
///
/// `text` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn expr_validate(text: *const u8, len: usize) -> i32 {
    guard("expr_validate", 0, || Ok(expr::validate(host_str(text, len, "expression")?) as i32))
}

/// Sanitized HTML as host-owned text
///
/// # Safety
///
/// `html` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn html_clean(html: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("html_clean", out_len, || {
        hand_over_text(sanitize::clean(host_str(html, len, "html")?), out_len)
    })
}

/// 1 when sanitizing leaves `html` unchanged, 0 otherwise
///
/// # Safety
///
/// `html` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn html_is_safe(html: *const u8, len: usize) -> i32 {
    guard("html_is_safe", 0, || Ok(sanitize::is_safe(host_str(html, len, "html")?) as i32))
}
