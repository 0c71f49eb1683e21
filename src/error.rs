//! # Error Handling
//!
//! Error type shared by every stage of the GIF encoder.
//!
//! Errors fall into a small taxonomy:
//!
//! - **I/O**: the output sink refused a write. Returned from `submit`/`finish`;
//!   bytes already written are left in place.
//! - **Malformed frame**: a submitted buffer does not match its declared
//!   geometry, or the canvas size changed mid-stream.
//! - **Validation**: configuration values out of range.
//! - **State**: an operation was attempted in the wrong pipeline state.
//! - **Scale**: the resizer rejected a frame.
//! - **Stage / Aborted**: a worker thread died, or stopped because a
//!   neighbouring stage went away.
//!
//! Uniform frames are not errors: they quantize to a one-color palette.
//!
//! ## Usage
//!
//! ```rust
//! use gif_capture::error::GifError;
//!
//! let error = GifError::validation("sample_factor", "must be within 1..=30", "0")
//!     .with_context("building pipeline");
//! assert_eq!(error.category(), "validation");
//! assert!(error.is_fatal());
//! ```

use std::{error::Error as StdError, fmt};

use cap_scale::cpu::ScaleError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Errors that stop the current stream but leave the process healthy
    Error,
    /// Errors caused by a broken invariant or a dead worker
    Fatal,
}

/// Metadata attached to an error
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Additional context about the error
    pub context: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            context: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Main error type for the encoder
#[derive(Debug)]
pub enum GifError {
    /// Sink write failures
    Io {
        operation: String,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// Frame buffers that do not match their declared geometry
    MalformedFrame {
        sequence: u64,
        reason: String,
        context: ErrorContext,
    },
    /// Configuration validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// Operation attempted in the wrong pipeline state
    State {
        current_state: String,
        attempted_operation: String,
        context: ErrorContext,
    },
    /// Resize failures from the scaler
    Scale {
        source: ScaleError,
        context: ErrorContext,
    },
    /// A worker thread panicked or could not be spawned
    Stage {
        stage: String,
        reason: String,
        context: ErrorContext,
    },
    /// A stage stopped early because a neighbouring stage hung up
    Aborted { stage: String, context: ErrorContext },
}

impl GifError {
    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a malformed frame error
    pub fn malformed_frame(sequence: u64, reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            sequence,
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a stage failure error
    pub fn stage(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    pub fn aborted(stage: impl Into<String>) -> Self {
        Self::Aborted {
            stage: stage.into(),
            context: ErrorContext::new(),
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Io { context, .. }
            | Self::MalformedFrame { context, .. }
            | Self::Validation { context, .. }
            | Self::State { context, .. }
            | Self::Scale { context, .. }
            | Self::Stage { context, .. }
            | Self::Aborted { context, .. } => context,
        }
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Io { context, .. }
            | Self::MalformedFrame { context, .. }
            | Self::Validation { context, .. }
            | Self::State { context, .. }
            | Self::Scale { context, .. }
            | Self::Stage { context, .. }
            | Self::Aborted { context, .. } => context,
        }
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = self.context_mut();
        ctx.context = Some(context.into());
        self
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::MalformedFrame { .. } => "malformed_frame",
            Self::Validation { .. } => "validation",
            Self::State { .. } => "state",
            Self::Scale { .. } => "scale",
            Self::Stage { .. } => "stage",
            Self::Aborted { .. } => "aborted",
        }
    }

    /// True for errors the caller cannot fix by changing its input.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            _ => self.context().severity == ErrorSeverity::Fatal,
        }
    }

    /// Copy of this error for reporting one failure to several callers.
    ///
    /// I/O sources are rebuilt from their kind and message. Scaler errors
    /// cannot be copied and come back as `Aborted` carrying the message.
    pub fn replay(&self) -> GifError {
        match self {
            Self::Io {
                operation,
                source,
                context,
            } => Self::Io {
                operation: operation.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
                context: context.clone(),
            },
            Self::MalformedFrame {
                sequence,
                reason,
                context,
            } => Self::MalformedFrame {
                sequence: *sequence,
                reason: reason.clone(),
                context: context.clone(),
            },
            Self::Validation {
                field,
                constraint,
                value,
                context,
            } => Self::Validation {
                field: field.clone(),
                constraint: constraint.clone(),
                value: value.clone(),
                context: context.clone(),
            },
            Self::State {
                current_state,
                attempted_operation,
                context,
            } => Self::State {
                current_state: current_state.clone(),
                attempted_operation: attempted_operation.clone(),
                context: context.clone(),
            },
            Self::Scale { source, .. } => Self::aborted("scale").with_context(source.to_string()),
            Self::Stage {
                stage,
                reason,
                context,
            } => Self::Stage {
                stage: stage.clone(),
                reason: reason.clone(),
                context: context.clone(),
            },
            Self::Aborted { stage, context } => Self::Aborted {
                stage: stage.clone(),
                context: context.clone(),
            },
        }
    }

    /// Secondary errors are consequences of an earlier failure elsewhere.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl fmt::Display for GifError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GifError::Io {
                operation, source, ..
            } => write!(f, "I/O error during {}: {}", operation, source),
            GifError::MalformedFrame {
                sequence, reason, ..
            } => write!(f, "Malformed frame #{}: {}", sequence, reason),
            GifError::Validation {
                field,
                constraint,
                value,
                ..
            } => write!(
                f,
                "Validation failed for '{}': {} (value: {})",
                field, constraint, value
            ),
            GifError::State {
                current_state,
                attempted_operation,
                ..
            } => write!(
                f,
                "Cannot {} while pipeline is {}",
                attempted_operation, current_state
            ),
            GifError::Scale { source, .. } => write!(f, "Scaling failed: {}", source),
            GifError::Stage { stage, reason, .. } => {
                write!(f, "Stage '{}' failed: {}", stage, reason)
            }
            GifError::Aborted { stage, .. } => {
                write!(f, "Stage '{}' stopped after an upstream failure", stage)
            }
        }?;
        if let Some(context) = &self.context().context {
            write!(f, " ({})", context)?;
        }
        Ok(())
    }
}

impl StdError for GifError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Scale { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GifError {
    fn from(error: std::io::Error) -> Self {
        Self::io("write", error)
    }
}

impl From<ScaleError> for GifError {
    fn from(error: ScaleError) -> Self {
        Self::Scale {
            source: error,
            context: ErrorContext::new(),
        }
    }
}

/// Result type alias for encoder operations
pub type GifResult<T> = Result<T, GifError>;
