//! Pluggable file-name to MIME-type resolution.

/// Maps a file name to a MIME type. The planner consults the storage first,
/// then this resolver, then the configured fallback type.
pub trait MimeResolver: Send + Sync {
    fn resolve(&self, file_name: &str) -> Option<String>;
}

/// Default resolver backed by `mime_guess` extension lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuessMimeResolver;

impl MimeResolver for GuessMimeResolver {
    fn resolve(&self, file_name: &str) -> Option<String> {
        mime_guess::from_path(file_name)
            .first_raw()
            .map(str::to_owned)
    }
}
