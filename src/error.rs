// src/error.rs
use thiserror::Error;

/// Best-effort classification of a detected single edit, inferred from the
/// received length versus the framed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Substitution,
    Insertion,
    Deletion,
}

impl std::fmt::Display for EditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditKind::Substitution => write!(f, "substitution"),
            EditKind::Insertion => write!(f, "insertion"),
            EditKind::Deletion => write!(f, "deletion"),
        }
    }
}

/// Error taxonomy of the codec. Every stage surfaces its own kind upward
/// unmodified; the CLI maps kinds to exit codes via `exit_code`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Bitstring length is not even, so it cannot pack into whole symbols.
    #[error("bitstring of {0} bits cannot pack into whole symbols (length must be even)")]
    BadLength(usize),

    /// A character outside {A,T,C,G}, or a non-bit value in a bit slice.
    #[error("symbol {0:?} is outside the working alphabet")]
    BadAlphabet(char),

    /// No flip index can reach the GC window for this payload.
    #[error("payload of {len} symbols admits no flip index inside the {epsilon} GC window")]
    TooShort { len: usize, epsilon: f64 },

    /// Malformed pointer or terminator during runlength decode.
    #[error("runlength decode failed: {0}")]
    BadRLL(&'static str),

    /// A framed suffix does not parse or violates its flip pairing.
    #[error("suffix parse failed: {0}")]
    BadSuffix(&'static str),

    /// The VT pair (or a glue symbol it covers) does not match. This is a
    /// report, not a recovery attempt; the caller decides what to do.
    #[error("edit detected in codeword ({})", kind_label(.kind))]
    ErrorDetected { kind: Option<EditKind> },

    /// Invalid codec parameters.
    #[error("invalid parameter: {0}")]
    ParamError(String),
}

fn kind_label(kind: &Option<EditKind>) -> String {
    match kind {
        Some(k) => format!("likely {k}"),
        None => "kind unknown".to_string(),
    }
}

impl CodecError {
    /// Process exit code contract: 1 bad input, 2 constraint violation on
    /// decode, 3 detected edit.
    pub fn exit_code(&self) -> i32 {
        match self {
            CodecError::BadLength(_) | CodecError::BadAlphabet(_) | CodecError::ParamError(_) => 1,
            CodecError::TooShort { .. } | CodecError::BadRLL(_) | CodecError::BadSuffix(_) => 2,
            CodecError::ErrorDetected { .. } => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
