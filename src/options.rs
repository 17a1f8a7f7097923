//! Per-request response overrides.

use http::StatusCode;

/// Three-state override for a header the planner derives by default:
/// keep the derived value, suppress the header, or supply a custom value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Override<T> {
    #[default]
    Derived,
    Off,
    Custom(T),
}

impl<T: Clone> Override<T> {
    /// Resolve against the derived value.
    pub(crate) fn apply(&self, derived: Option<T>) -> Option<T> {
        match self {
            Override::Derived => derived,
            Override::Off => None,
            Override::Custom(value) => Some(value.clone()),
        }
    }
}

/// Overrides applied to a single `prepare_response` call.
///
/// `status_code` short-circuits response planning entirely: the full body is
/// served with the given status and neither conditional-request nor range
/// logic runs.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub cache_control: Override<String>,
    pub last_modified: Override<String>,
    pub etag: Override<String>,
    pub content_type: Override<String>,
    pub content_disposition_type: Override<String>,
    pub content_disposition_filename: Override<String>,
    pub status_code: Option<StatusCode>,
}
