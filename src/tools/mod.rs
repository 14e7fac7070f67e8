//! Extensible tool system.
//!
//! Tools are the assistant's only way to touch the chain. Each one is a
//! variant of [`ChainTool`] with a JSON Schema for its arguments and a typed
//! handler; the [`ToolRegistry`] maps the names the assistant uses to them.

pub(crate) mod builtin;
mod registry;
pub mod sanitize;
mod tool;

pub use registry::ToolRegistry;
pub use sanitize::{RawSwapArgs, SanitizedSwap, sanitize_swap, sanitize_swap_at};
pub use tool::{ChainTool, ToolError, parse_args};
