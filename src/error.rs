//! Error types.
//!
//! - [`IdentError`]: failures of the identification core. Per-order variants
//!   (`SingularSystem`, `InsufficientResidualData`) are absorbed by the pipeline
//!   and only shrink the candidate pool.
//! - [`AdvisoryError`]: failures of the external advisory judge. These never
//!   escape the selector; they only downgrade the selection method.
//! - [`AppError`]: what the binary reports, carrying a process exit code.

/// Error type for the identification core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IdentError {
    /// Too few usable raw rows after cleaning.
    #[error("insufficient data: {valid} valid samples, at least {required} required")]
    InsufficientData {
        /// Rows that survived cleaning.
        valid: usize,
        /// Minimum accepted.
        required: usize,
    },

    /// The normal equations for this order have no usable pivot in some column.
    #[error("singular regression for ARX({order}): no usable pivot in column {column}")]
    SingularSystem {
        /// ARX order being estimated.
        order: usize,
        /// Column of the normal matrix that failed.
        column: usize,
    },

    /// Too few points to validate the candidate by simulation.
    #[error("insufficient residual data for ARX({order}): {points} comparable points, at least {required} required")]
    InsufficientResidualData {
        /// ARX order being validated.
        order: usize,
        /// Comparable points available.
        points: usize,
        /// Minimum accepted.
        required: usize,
    },

    /// Every attempted order was dropped.
    #[error("no usable candidate: all {attempted} attempted orders were rejected")]
    NoUsableCandidate {
        /// Number of orders attempted.
        attempted: usize,
    },

    /// A recursive estimator update was rejected.
    #[error("non-finite input rejected by the recursive estimator")]
    NonFiniteInput,

    /// A caller-supplied option is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IdentError {
    /// `true` for the per-order failures that only remove that order from the pool.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IdentError::SingularSystem { .. } | IdentError::InsufficientResidualData { .. }
        )
    }

    /// Stable machine-readable kind, used in JSON reports.
    pub fn kind(&self) -> &'static str {
        match self {
            IdentError::InsufficientData { .. } => "InsufficientData",
            IdentError::SingularSystem { .. } => "SingularSystem",
            IdentError::InsufficientResidualData { .. } => "InsufficientResidualData",
            IdentError::NoUsableCandidate { .. } => "NoUsableCandidate",
            IdentError::NonFiniteInput => "NonFiniteInput",
            IdentError::InvalidConfig(_) => "InvalidConfig",
        }
    }
}

/// Why the advisory path could not be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdvisoryError {
    /// The resolver did not answer within the caller's budget.
    #[error("advisory resolver timed out after {timeout_ms} ms")]
    Timeout {
        /// The budget that expired.
        timeout_ms: u64,
    },

    /// The resolver reported a failure.
    #[error("advisory resolver failed: {0}")]
    Resolver(String),

    /// The resolver's worker went away without answering (e.g. it panicked).
    #[error("advisory resolver stopped without a verdict")]
    Disconnected,

    /// The verdict does not point at an existing candidate.
    #[error("advisory verdict selects index {index:?} / order {order:?}, but there are {len} candidates")]
    InvalidSelection {
        /// Index named by the verdict, if any.
        index: Option<usize>,
        /// Order named by the verdict, if any.
        order: Option<usize>,
        /// Candidate count.
        len: usize,
    },
}

/// Application-level error carrying a process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<IdentError> for AppError {
    fn from(err: IdentError) -> Self {
        let exit_code = match err {
            IdentError::InvalidConfig(_) => 2,
            IdentError::InsufficientData { .. } => 3,
            _ => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
