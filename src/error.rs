use thiserror::Error;

/// The one genuinely fallible input this crate accepts: a caller-supplied
/// base URL for relative-link resolution (§7). HTML parsing never fails —
/// `kuchikiki` degrades malformed markup into a best-effort tree instead
/// of raising an error — so this is the only variant defined.
#[derive(Debug, Error)]
pub enum ReadabilityError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}
