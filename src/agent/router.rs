//! Chat command routing.
//!
//! Commands start with a prefix (`!` by default). `register` and the
//! registration check for `swap` are answered locally; everything else goes
//! to the assistant.

use std::sync::Arc;

use crate::chain::is_address;

use super::address_book::AddressBook;
use super::extraction::RunResult;
use super::pipeline::RunPipeline;

pub const NO_TEXT_REPLY: &str = "No textual response from AI.";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `register [address]`
    Register(Option<&'a str>),
    /// `swap ...`; carries the full command text without the prefix.
    Swap(&'a str),
    /// Any other command, forwarded verbatim.
    Forward(&'a str),
}

/// Parses commands and produces exactly one reply per command.
pub struct CommandRouter {
    prefix: String,
    book: AddressBook,
    pipeline: Arc<RunPipeline>,
}

impl CommandRouter {
    pub fn new(prefix: impl Into<String>, book: AddressBook, pipeline: Arc<RunPipeline>) -> Self {
        Self {
            prefix: prefix.into(),
            book,
            pipeline,
        }
    }

    /// Parse `content`. `None` if it is not a command.
    pub fn parse<'a>(&self, content: &'a str) -> Option<Command<'a>> {
        let text = content.strip_prefix(self.prefix.as_str())?.trim();
        let mut words = text.split_whitespace();
        let verb = words.next().unwrap_or_default().to_lowercase();
        Some(match verb.as_str() {
            "register" => Command::Register(words.next()),
            "swap" => Command::Swap(text),
            _ => Command::Forward(text),
        })
    }

    /// Handle one message from `caller`. `None` means the message is ignored.
    pub async fn handle(&self, caller: &str, content: &str) -> Option<String> {
        let command = self.parse(content)?;
        tracing::debug!(caller, ?command, "Routing command");

        Some(match command {
            Command::Register(address) => self.register(caller, address).await,
            Command::Swap(text) => match self.book.lookup(caller).await {
                None => format!(
                    "No registered wallet address. Use `{}register 0x...` first.",
                    self.prefix
                ),
                Some(address) => self.ask(&swap_message(text, &address)).await,
            },
            Command::Forward(text) => self.ask(text).await,
        })
    }

    async fn register(&self, caller: &str, address: Option<&str>) -> String {
        let Some(address) = address else {
            return format!("Usage: `{}register 0xYourAddressHere`", self.prefix);
        };
        if !is_address(address) {
            return "Invalid address format. Must be 0x + 40 hex chars.".to_string();
        }
        match self.book.register(caller, address).await {
            Some(previous) => tracing::info!(caller, address, %previous, "Caller re-registered"),
            None => tracing::info!(caller, address, "Caller registered"),
        }
        format!("Registered your address: {address}")
    }

    async fn ask(&self, message: &str) -> String {
        match self.pipeline.run(message).await {
            Ok(RunResult::Text(text)) => format!("**AI**: {text}"),
            Ok(RunResult::NonText) => NO_TEXT_REPLY.to_string(),
            Err(e) => {
                tracing::error!("Pipeline failed: {}", e);
                format!("Error: {e}")
            }
        }
    }
}

/// The swap command plus a note telling the assistant whose funds to use.
pub fn swap_message(command: &str, address: &str) -> String {
    format!(
        "{command}\n\n[System note: The Discord user is mapped to on-chain address: {address}]"
    )
}
