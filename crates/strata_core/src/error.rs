//! Error types for content loading and simulation.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Pipeline phase in which an instance-level failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Creating instances from buffered sections.
    Definition,
    /// Feeding section bodies into already-created instances.
    Population,
    /// One-time post-load setup (reference resolution).
    Initialization,
    /// Semantic validation.
    Check,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Definition => "define",
            Self::Population => "process",
            Self::Initialization => "initialize",
            Self::Check => "check",
        };
        f.write_str(name)
    }
}

/// Top-level error type for content and simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// A required identifier lookup failed.
    #[error("Invalid {type_name} instance: \"{identifier}\"")]
    NotFound {
        /// Content type name.
        type_name: &'static str,
        /// Identifier that failed to resolve.
        identifier: String,
    },

    /// An identifier or alias is already taken.
    #[error("There is already a {type_name} instance with the identifier \"{identifier}\"")]
    DuplicateIdentifier {
        /// Content type name.
        type_name: &'static str,
        /// Colliding identifier.
        identifier: String,
    },

    /// Tried to create an instance with an empty identifier.
    #[error("Tried to add a {type_name} instance with an empty identifier")]
    EmptyIdentifier {
        /// Content type name.
        type_name: &'static str,
    },

    /// An operator that is not valid for the given key was used.
    #[error("Invalid operator for property \"{key}\": only {expected} is supported")]
    InvalidOperator {
        /// Property key.
        key: String,
        /// The operator that is accepted for this key.
        expected: &'static str,
    },

    /// Malformed or unknown property or section. Loading skips these.
    #[error("{0}")]
    Configuration(String),

    /// Failure inside a specific instance, wrapped with its context.
    #[error("Failed to {phase} {type_name} instance \"{identifier}\": {source}")]
    Instance {
        /// Content type name.
        type_name: &'static str,
        /// Identifier of the failing instance.
        identifier: String,
        /// Phase the failure happened in.
        phase: LoadPhase,
        /// Underlying cause.
        #[source]
        source: Box<GameError>,
    },

    /// The dependency graph between modules or data types has a cycle.
    #[error("Cyclic dependency involving {kind} \"{identifier}\"")]
    CyclicDependency {
        /// Either "module" or "data type".
        kind: &'static str,
        /// A member of the cycle.
        identifier: String,
    },

    /// A data type declared a dependency on a type that is not registered.
    #[error("Data type \"{dependent}\" depends on unknown data type \"{dependency}\"")]
    UnknownDataType {
        /// The declaring type.
        dependent: &'static str,
        /// The missing dependency.
        dependency: String,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Data file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Explicit semantic validation failure.
    #[error("{0}")]
    Validation(String),

    /// Save data could not be written or read back.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl GameError {
    /// Wrap this error with the identity of the instance it happened in.
    #[must_use]
    pub fn in_instance(
        self,
        type_name: &'static str,
        identifier: impl Into<String>,
        phase: LoadPhase,
    ) -> Self {
        Self::Instance {
            type_name,
            identifier: identifier.into(),
            phase,
            source: Box::new(self),
        }
    }

    /// Shorthand for a configuration diagnostic.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this is a skippable configuration diagnostic.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
