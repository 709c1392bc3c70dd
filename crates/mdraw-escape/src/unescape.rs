//! Placeholder substitution: restore escaped spans from the store.

use mdraw_store::RawStore;

use crate::error::UnescapeError;
use crate::span::PLACEHOLDER;

/// Replace every placeholder tag in `text` with its stored content.
///
/// A single left-to-right pass: each `<escaped hash="H"></escaped>`
/// occurrence is resolved through the store and substituted in place.
/// Substituted content is not re-scanned (placeholders never nest).
///
/// # Errors
///
/// [`UnescapeError::MissingContent`] when a referenced hash has no store
/// entry. The document cannot be reconstructed, so the tag is never
/// silently dropped or blanked.
pub fn unescape(text: &str, store: &dyn RawStore) -> Result<String, UnescapeError> {
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;

    for caps in PLACEHOLDER.captures_iter(text) {
        let matched = caps.get(0).expect("capture 0 is the whole match");
        let hash = &caps["hash"];

        let Some(content) = store.read(hash)? else {
            return Err(UnescapeError::MissingContent {
                hash: hash.to_owned(),
            });
        };
        tracing::debug!("restored span {hash} ({} bytes)", content.len());

        output.push_str(&text[cursor..matched.start()]);
        output.push_str(&content);
        cursor = matched.end();
    }

    output.push_str(&text[cursor..]);
    Ok(output)
}
