/// Errors from remote runtime calls.
///
/// The runtime is an external collaborator and its failures are
/// unstructured: `Api` carries the upstream response body verbatim so the
/// classifier sees the original wording. Nothing downstream matches on
/// these variants directly; everything goes through classification first.
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("runtime unreachable: {0}")]
    Transport(String),

    #[error("runtime returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("timeout")]
    Timeout,

    #[error("decode: {0}")]
    Decode(String),
}

impl RuntimeError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RuntimeError::Timeout
        } else {
            RuntimeError::Transport(err.to_string())
        }
    }
}
