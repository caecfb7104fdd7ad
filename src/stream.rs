//! Normalization and assembly of the glyph stream tiles sample from.
//!
//! Raw transaction identifiers arrive as `0x`-prefixed 64-digit hex strings
//! in whatever case the data source uses. They are canonicalized to
//! lowercase, deduplicated in first-seen order, and joined with a three-space
//! separator so consecutive hashes read as distinct runs on the board.

/// Separator between hashes; renders as blank tiles.
const SEPARATOR: &str = "   ";

/// Canonicalizes a raw transaction hash.
///
/// Accepts exactly `0x` followed by 64 hex digits (any case) and returns the
/// lowercase form; everything else is `None`.
pub fn normalize_hash(raw: &str) -> Option<String> {
    let lower = raw.trim().to_ascii_lowercase();
    let body = lower.strip_prefix("0x")?;
    if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(lower)
}

/// The concatenated character stream consumed cyclically by the board.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HashStream {
    text: String,
}

impl HashStream {
    /// Builds a stream from raw hashes. Invalid entries are dropped and
    /// duplicates (after canonicalization) keep only their first occurrence.
    /// An empty result means "no new data": callers keep the previous stream.
    pub fn build<S: AsRef<str>>(hashes: &[S]) -> HashStream {
        let mut seen: Vec<String> = Vec::new();
        for raw in hashes {
            let Some(h) = normalize_hash(raw.as_ref()) else {
                continue;
            };
            if !seen.contains(&h) {
                seen.push(h);
            }
        }
        HashStream {
            text: seen.join(SEPARATOR),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Glyph at `offset`, taken modulo the stream length. The stream only
    /// ever holds ASCII, so byte indexing is safe.
    pub fn glyph_at(&self, offset: usize) -> char {
        if self.text.is_empty() {
            return ' ';
        }
        self.text.as_bytes()[offset % self.text.len()] as char
    }
}
