//! Built-in chain tools. Each module owns one family of tools: its schema,
//! typed arguments and handler.

pub(crate) mod contract;
pub(crate) mod pair;
pub(crate) mod receipt;
pub(crate) mod swap;
pub(crate) mod token;
pub(crate) mod wallet;

#[cfg(test)]
mod tests;
