//! Error types for Horizon Trellis.

use std::fmt;

use crate::soon::SoonError;

/// The main error type for Horizon Trellis core operations.
#[derive(Debug)]
pub enum TrellisError {
    /// The global runtime has already been initialized.
    RuntimeAlreadyInitialized,
    /// The global runtime has not been initialized yet.
    RuntimeNotInitialized,
    /// Class composition or dispatch error.
    Class(ClassError),
    /// Instance registry error.
    Registry(RegistryError),
    /// Property-related error.
    Property(PropertyError),
    /// Scheduler-related error.
    Soon(SoonError),
}

impl fmt::Display for TrellisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuntimeAlreadyInitialized => {
                write!(f, "Runtime has already been initialized")
            }
            Self::RuntimeNotInitialized => {
                write!(f, "Runtime has not been initialized. Call init_global_runtime() first")
            }
            Self::Class(err) => write!(f, "Class error: {err}"),
            Self::Registry(err) => write!(f, "Registry error: {err}"),
            Self::Property(err) => write!(f, "Property error: {err}"),
            Self::Soon(err) => write!(f, "Scheduler error: {err}"),
        }
    }
}

impl std::error::Error for TrellisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Class(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Property(err) => Some(err),
            Self::Soon(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while composing classes or dispatching members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassError {
    /// The named member does not exist on the class.
    UnknownMethod {
        /// The class whose table was searched.
        class: String,
        /// The missing member name.
        method: String,
    },
    /// The named member exists but is a data member, not a method.
    NotAMethod {
        /// The class whose table was searched.
        class: String,
        /// The member name.
        method: String,
    },
    /// The named ancestor is not in the class's proto chain.
    UnknownAncestor {
        /// The class whose chain was searched.
        class: String,
        /// The requested ancestor (superclass or mixin) name.
        ancestor: String,
    },
    /// The instance backing a deferred call has been dropped.
    InstanceDropped,
}

impl fmt::Display for ClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod { class, method } => {
                write!(f, "Class '{class}' has no member '{method}'")
            }
            Self::NotAMethod { class, method } => {
                write!(f, "Member '{method}' on class '{class}' is not callable")
            }
            Self::UnknownAncestor { class, ancestor } => {
                write!(f, "Class '{class}' has no ancestor '{ancestor}' in its proto chain")
            }
            Self::InstanceDropped => write!(f, "Instance was dropped before dispatch"),
        }
    }
}

impl std::error::Error for ClassError {}

/// Errors raised by the uniquify and singleton registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No id was supplied and none could be derived from the instance.
    MissingInstanceId,
    /// The id is already bound to a different instance.
    DuplicateInstanceId(String),
    /// The requested singleton has not been created.
    UnknownSingleton(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInstanceId => {
                write!(f, "Cannot register instance: no id supplied and none derivable")
            }
            Self::DuplicateInstanceId(id) => {
                write!(f, "Id '{id}' is already registered to a different instance")
            }
            Self::UnknownSingleton(name) => write!(f, "Singleton '{name}' does not exist"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Property-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The delegated property's target is unavailable.
    DelegateUnavailable {
        /// The property name, for diagnostics.
        name: String,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DelegateUnavailable { name } => {
                write!(f, "Delegated property '{name}' has no reachable target")
            }
        }
    }
}

impl std::error::Error for PropertyError {}

impl From<ClassError> for TrellisError {
    fn from(err: ClassError) -> Self {
        Self::Class(err)
    }
}

impl From<RegistryError> for TrellisError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl From<PropertyError> for TrellisError {
    fn from(err: PropertyError) -> Self {
        Self::Property(err)
    }
}

impl From<SoonError> for TrellisError {
    fn from(err: SoonError) -> Self {
        Self::Soon(err)
    }
}

/// A specialized Result type for Horizon Trellis core operations.
pub type Result<T> = std::result::Result<T, TrellisError>;
