//! Local path -> `file:///` URI conversion used for forwarded launch arguments.
//!
//! The encoding is deliberately minimal: backslashes become `/` and spaces
//! become `%20`. Everything else (`#`, `%`, `?`, non-ASCII) passes through as
//! is, because the receiving application's link parser is lenient and expects
//! exactly this shape. Running the result through a strict RFC 3986 parser may
//! therefore fail for such paths.

pub const FILE_SCHEME_PREFIX: &str = "file:///";

/// Converts a local path into the URI form the running instance expects.
///
/// `""` maps to bare `file:///`. No filesystem access happens here.
pub fn to_file_uri(local_path: &str) -> String {
    let mut uri = String::with_capacity(FILE_SCHEME_PREFIX.len() + local_path.len());
    uri.push_str(FILE_SCHEME_PREFIX);
    for ch in local_path.chars() {
        match ch {
            '\\' => uri.push('/'),
            ' ' => uri.push_str("%20"),
            other => uri.push(other),
        }
    }
    uri
}
