//! Error types for template rendering.
//!
//! This module provides [`RenderError`], the primary error type for all
//! rendering operations. Per-token lookup failures are recovered inside the
//! substitution engine; only structural failures (an unclosed block, a missing
//! named template) reach the caller.

use std::fmt;

/// Error type for template rendering operations.
#[derive(Debug)]
pub enum RenderError {
    /// Filter registration with invalid arguments; the registry is unchanged.
    InvalidArgument(String),

    /// A path segment was absent during data lookup.
    ///
    /// The substitution engine catches this, logs a warning, and substitutes
    /// the empty string; it surfaces only from direct filter application.
    NotFound {
        /// The missing path segment.
        path: String,
        /// The full token path being resolved.
        token: String,
    },

    /// A boolean or mapping opener has no matching closing token.
    UnclosedBlock(String),

    /// A named template lookup yielded nothing.
    TemplateNotFound(String),

    /// The configured token grammar is not a valid regular expression.
    Pattern(String),

    /// Render data could not be serialized into the value model.
    Serialization(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            RenderError::NotFound { path, token } => {
                if path == token {
                    write!(f, "'{}' not found", path)
                } else {
                    write!(f, "'{}' not found in '{}'", path, token)
                }
            }
            RenderError::UnclosedBlock(name) => write!(f, "'{}' not closed", name),
            RenderError::TemplateNotFound(name) => write!(f, "template not found: {}", name),
            RenderError::Pattern(msg) => write!(f, "token pattern error: {}", msg),
            RenderError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<regex::Error> for RenderError {
    fn from(err: regex::Error) -> Self {
        RenderError::Pattern(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_not_found() {
        let err = RenderError::NotFound {
            path: "b".to_string(),
            token: "a.b".to_string(),
        };
        assert_eq!(err.to_string(), "'b' not found in 'a.b'");
    }

    #[test]
    fn test_display_unclosed() {
        let err = RenderError::UnclosedBlock("items".to_string());
        assert_eq!(err.to_string(), "'items' not closed");
    }

    #[test]
    fn test_from_regex_error() {
        let err = regex::Regex::new("(").unwrap_err();
        let render_err: RenderError = err.into();
        assert!(matches!(render_err, RenderError::Pattern(_)));
    }
}
