//! Outbound web links stored on profiles.

use thiserror::Error;

/// A link that is not a plain `http`/`https` address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a web address: {0}")]
pub struct LinkError(pub String);

/// Validate a user-supplied web address.
///
/// Surrounding whitespace is trimmed and bare domains (`acme.org`) get an
/// `https://` scheme. Anything other than an `http` or `https` URL with a
/// host is rejected, so a stored link can be rendered as an `href`.
///
/// # Errors
///
/// Returns `LinkError` for other schemes (`javascript:`, `data:`), for
/// URLs without a host, and for text that does not parse as a URL.
pub fn normalize_link(value: &str) -> Result<String, LinkError> {
    let value = value.trim();
    let candidate = match url::Url::parse(value) {
        Ok(_) => value.to_owned(),
        Err(url::ParseError::RelativeUrlWithoutBase) => format!("https://{value}"),
        Err(_) => return Err(LinkError(value.to_owned())),
    };

    match url::Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Ok(candidate)
        }
        _ => Err(LinkError(value.to_owned())),
    }
}
