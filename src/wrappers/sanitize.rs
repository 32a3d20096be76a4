//! HTML Sanitizer Wrappers
//!
//! Whitelist-based HTML cleaning via ammonia. Disallowed tags are stripped
//! (their text kept), `<script>` and `<style>` are dropped with their content,
//! and unsafe attributes and URL schemes are removed.

use std::collections::HashSet;

use ammonia::Builder;

use super::{arg_str, OwnedBuffer, WrapperCategory, WrapperRegistry};

/// Tags whose content is always removed; they can never be whitelisted
const CONTENT_TAGS: [&str; 2] = ["script", "style"];

/// Clean `html` with the default whitelist
pub fn clean(html: &str) -> String {
    ammonia::clean(html)
}

/// Clean `html` allowing only `tags` (plus nothing else)
pub fn clean_with_tags(html: &str, tags: &[&str]) -> String {
    let allowed: HashSet<&str> = tags
        .iter()
        .copied()
        .filter(|tag| !CONTENT_TAGS.contains(&tag.to_ascii_lowercase().as_str()))
        .collect();
    Builder::default().tags(allowed).clean(html).to_string()
}

/// True when cleaning would leave `html` unchanged
pub fn is_safe(html: &str) -> bool {
    let cleaned = clean(html);
    if cleaned != html {
        tracing::debug!(
            input_len = html.len(),
            cleaned_len = cleaned.len(),
            "html altered by sanitizer"
        );
        return false;
    }
    true
}

// =============================================================================
// Registration
// =============================================================================

/// Register the sanitizer with the registry
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "html_clean",
        "Sanitize HTML with the default whitelist",
        WrapperCategory::Text,
        1,
        |args| Ok(OwnedBuffer::from_string(clean(arg_str(args, 0, "html")?))),
    );

    registry.register_wrapper(
        "html_is_safe",
        "Check whether HTML survives sanitizing unchanged (returns 1 or 0)",
        WrapperCategory::Text,
        1,
        |args| Ok(OwnedBuffer::from_vec(vec![is_safe(arg_str(args, 0, "html")?) as u8])),
    );
}
