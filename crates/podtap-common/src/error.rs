//! Unified error types for the podtap workspace.
//!
//! Every fallible operation in the library crates returns [`PodtapError`].
//! Variants follow the failure taxonomy the binaries report on: see
//! [`ErrorCategory`].

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used when reporting a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid or inconsistent user input. Nothing was mutated.
    Configuration,
    /// A cluster record was missing or incomplete.
    Lookup,
    /// The requested interface collides with an existing one.
    Conflict,
    /// A host-side operation failed.
    Runtime,
}

impl ErrorCategory {
    /// Process exit status reported for a failure in this category.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Configuration => 2,
            Self::Lookup => 3,
            Self::Conflict => 4,
            Self::Runtime => 5,
        }
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum PodtapError {
    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The runtime token of a container identifier is not supported.
    #[error("unsupported container runtime: {token}")]
    UnsupportedRuntime {
        /// Token found before `://`.
        token: String,
    },

    /// A required cluster resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// No container of the target pod qualifies as the mirror source.
    #[error("no ready container in pod {pod}")]
    NoReadyContainer {
        /// `namespace/name` of the pod.
        pod: String,
    },

    /// A pod or node record carries no usable address.
    #[error("{kind} {name} has no address")]
    NoAddress {
        /// Type of the record.
        kind: &'static str,
        /// Name of the record.
        name: String,
    },

    /// The interface to create already exists.
    #[error("interface {name} already exists in {namespace}")]
    InterfaceAlreadyExists {
        /// Interface name.
        name: String,
        /// Namespace the interface was found in.
        namespace: String,
    },

    /// No local interface carries the requested address.
    #[error("no local interface has address {address}")]
    NoMatchingInterface {
        /// Address that was searched for.
        address: IpAddr,
    },

    /// A link, tunnel, or namespace operation failed.
    #[error("link operation failed: {message}")]
    Link {
        /// Description of the failed operation.
        message: String,
    },

    /// The cluster API returned an error.
    #[error("cluster request failed: {message}")]
    Cluster {
        /// Description of the failed request.
        message: String,
    },

    /// A manifest could not be rendered.
    #[error("cannot render manifest: {message}")]
    Render {
        /// Description of the rendering failure.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path or program where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl PodtapError {
    /// Returns the taxonomy bucket this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } | Self::UnsupportedRuntime { .. } => ErrorCategory::Configuration,
            Self::NotFound { .. }
            | Self::NoReadyContainer { .. }
            | Self::NoAddress { .. }
            | Self::Cluster { .. } => ErrorCategory::Lookup,
            Self::InterfaceAlreadyExists { .. } => ErrorCategory::Conflict,
            Self::NoMatchingInterface { .. }
            | Self::Link { .. }
            | Self::Render { .. }
            | Self::Io { .. }
            | Self::Serialization { .. } => ErrorCategory::Runtime,
        }
    }

    /// Shorthand for a [`PodtapError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shorthand for a [`PodtapError::Link`] error.
    pub fn link(message: impl Into<String>) -> Self {
        Self::Link {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PodtapError>;
