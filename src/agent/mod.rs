//! Core agent logic.
//!
//! The agent orchestrates:
//! - Message routing from channels
//! - Run lifecycle against the assistant service (poll, tool rounds, extraction)
//! - Caller to wallet address mapping

pub mod address_book;
mod agent_loop;
pub mod dispatcher;
pub mod extraction;
pub mod pipeline;
pub mod poller;
pub mod prompt;
pub mod router;

pub use address_book::AddressBook;
pub use agent_loop::Agent;
pub use dispatcher::ToolDispatcher;
pub use extraction::{NO_RESPONSE, RunResult, UNKNOWN_ERROR, extract_result};
pub use pipeline::RunPipeline;
pub use poller::RunPoller;
pub use prompt::assistant_instructions;
pub use router::{Command, CommandRouter, NO_TEXT_REPLY, swap_message};
