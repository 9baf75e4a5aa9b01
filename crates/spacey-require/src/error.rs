// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for module resolution and loading

use spacey_script::Exception;
use thiserror::Error;

/// Result type for module system operations
pub type Result<T> = std::result::Result<T, RequireError>;

/// Errors that can occur while resolving, loading or running a module.
///
/// [`RequireError::ModuleNotExist`] is the only "soft" error: the resolver
/// treats it as a miss and moves on to the next candidate. Everything else
/// aborts resolution and reaches the caller unchanged.
#[derive(Debug, Error)]
pub enum RequireError {
    /// Every candidate was tried and none produced a module
    #[error("invalid module")]
    InvalidModule,

    /// The specifier was empty
    #[error("invalid module name")]
    InvalidModuleName,

    /// The loader has nothing at this path
    #[error("module does not exist")]
    ModuleNotExist,

    /// Module source failed to parse
    #[error("SyntaxError: {0}")]
    Syntax(String),

    /// A value thrown while running a module, exactly as thrown
    #[error("{0}")]
    Exception(Exception),

    /// File system error from the default loader
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by a custom source loader
    #[error("{0}")]
    Loader(String),

    /// `require` has not been installed in this runtime
    #[error("require is not enabled for this runtime")]
    NotEnabled,

    /// A native module failed to enable or export
    #[error("Native module error: {0}")]
    Native(String),
}

impl RequireError {
    /// Create a loader error with a custom message
    pub fn custom(message: impl Into<String>) -> Self {
        RequireError::Loader(message.into())
    }

    /// Whether this is the soft "not found" signal.
    pub fn is_not_exist(&self) -> bool {
        matches!(self, RequireError::ModuleNotExist)
    }

    /// The thrown value, if this error came from script code.
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            RequireError::Exception(exception) => Some(exception),
            _ => None,
        }
    }
}

impl From<spacey_script::Error> for RequireError {
    fn from(err: spacey_script::Error) -> Self {
        match err {
            spacey_script::Error::SyntaxError(message) => RequireError::Syntax(message),
            spacey_script::Error::Exception(exception) => RequireError::Exception(exception),
        }
    }
}

impl From<Exception> for RequireError {
    fn from(exception: Exception) -> Self {
        RequireError::Exception(exception)
    }
}
