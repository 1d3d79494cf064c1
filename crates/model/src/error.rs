use std::fmt::{self, Display};

/// Coarse classification of a provider failure.
///
/// The agent only needs to know whether retrying could help, so backends
/// collapse their own error taxonomies into these kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The provider refused the content.
    Moderated,
    /// The provider asked us to slow down. Worth retrying.
    RateLimitExceeded,
    /// Anything else, including transport failures.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Moderated => f.write_str("moderated"),
            ErrorKind::RateLimitExceeded => f.write_str("rate limit exceeded"),
            ErrorKind::Other => f.write_str("other"),
        }
    }
}
