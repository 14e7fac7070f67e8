//! vaultclaw: a chat-driven front end for on-chain operations.
//!
//! Chat commands are answered by an OpenAI assistant whose tool calls are
//! executed against an EVM chain (vault swaps, ERC20 transfers and approvals,
//! balances, Uniswap V2 pair creation, receipts).
//!
//! # Architecture
//!
//! ```text
//!  ┌──────┐ ┌──────┐ ┌─────────┐
//!  │ REPL │ │ HTTP │ │ Discord │        channels
//!  └──┬───┘ └──┬───┘ └────┬────┘
//!     └────────┼──────────┘
//!              ▼
//!       CommandRouter ── AddressBook     agent
//!              │
//!              ▼
//!        RunPipeline: thread → run → poll → tool rounds → reply
//!              │                              │
//!              ▼                              ▼
//!      AssistantService               ToolRegistry → ChainClient
//!        (llm)                          (tools)        (chain)
//! ```

pub mod agent;
pub mod chain;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod testing;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::agent::{Agent, CommandRouter, RunPipeline, RunResult};
    pub use crate::chain::{ChainClient, RpcWallet};
    pub use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::llm::AssistantService;
    pub use crate::tools::{ChainTool, ToolRegistry};
}
