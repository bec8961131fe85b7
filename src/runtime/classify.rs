use super::error::RuntimeError;

/// Closed failure taxonomy for everything the runtime can throw at us.
///
/// Handlers pattern-match this set and never look at upstream text again;
/// classification happens exactly once, at the runtime seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }
}

/// Classify a runtime failure into the closed taxonomy.
///
/// A structured 404 from the runtime is absence regardless of body wording;
/// everything else falls through to the substring table over the display
/// text.
pub fn classify(err: &RuntimeError) -> ErrorKind {
    if let RuntimeError::Api { status: 404, .. } = err {
        return ErrorKind::NotFound;
    }
    classify_message(&err.to_string())
}

/// Ordered substring table over unstructured failure text.
///
/// Precedence is fixed: NotFound > Conflict > Validation > Internal. A
/// message matching several rows classifies as the highest-precedence one.
/// Matching is case-insensitive, which covers the upstream's mixed spellings
/// ("not found" vs "Not Found", "invalid" vs "Invalid").
pub fn classify_message(message: &str) -> ErrorKind {
    let text = message.to_lowercase();

    // Container-level wording ("Container not found", "not initialized")
    // counts as absence: the backing resource was never materialized.
    if text.contains("not found") || text.contains("does not exist") || text.contains("not initialized")
    {
        return ErrorKind::NotFound;
    }
    if text.contains("already exists") {
        return ErrorKind::Conflict;
    }
    if text.contains("invalid") || text.contains("missing credentials") {
        return ErrorKind::Validation;
    }
    ErrorKind::Internal
}
