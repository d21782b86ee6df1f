//! Host-view integration seams.
//!
//! Rendering produces plain text; applying that text to a live view tree and
//! wiring interaction handlers are host concerns. Hosts implement these
//! traits against whatever node representation they own.

use serde_json::Value;

use crate::error::RenderError;

/// Attribute name carrying a generated iteration context id on loop output.
pub const TRACKING_ATTR: &str = "data-potion-key";

/// Attribute prefix marking declarative event bindings in markup.
pub const DIRECTIVE_PREFIX: &str = "@";

/// Applies rendered text to a host view tree, replacing or patching the
/// subtree rooted at a target node.
pub trait Reconciler {
    /// Host node handle.
    type Node;

    /// Replaces the content of `target` with `rendered`.
    fn reconcile(&self, target: &mut Self::Node, rendered: &str) -> Result<(), RenderError>;
}

/// Attaches interaction handlers declared through [`DIRECTIVE_PREFIX`]
/// attributes, resolving each handler against iteration context data.
pub trait EventBinder {
    /// Host node handle.
    type Node;

    /// Binds the handler named by a directive on `node`. `context` is the
    /// iteration data registered under the node's [`TRACKING_ATTR`] id, when
    /// one is present.
    fn bind(
        &self,
        node: &mut Self::Node,
        event: &str,
        handler: &str,
        context: Option<&Value>,
    ) -> Result<(), RenderError>;
}
