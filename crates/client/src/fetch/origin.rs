//! Same-origin checks.
//!
//! Two URLs share an origin when scheme, host and port match, with default
//! ports normalized (`https://a.com` and `https://a.com:443` are the same).

use url::Url;

/// Whether `url` belongs to `origin`.
///
/// Opaque origins (`data:`, `file:` and friends) never match anything,
/// including themselves.
pub fn same_origin(url: &Url, origin: &Url) -> bool {
    let a = url.origin();
    a.is_tuple() && a == origin.origin()
}
