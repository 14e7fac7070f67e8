//! Interactive REPL channel with line editing.
//!
//! Lines are sent as-is; the agent decides which of them are commands.
//! `/quit`, `/exit`, Ctrl+D and Ctrl+C end the input loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Caller identity for everything typed into the terminal.
pub const LOCAL_USER: &str = "local-user";

/// REPL channel backed by rustyline.
pub struct ReplChannel {
    prefix: String,
    running: Arc<AtomicBool>,
}

impl ReplChannel {
    /// `prefix` is only used in the banner.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

fn print_help(prefix: &str) {
    let h = "\x1b[1m";
    let c = "\x1b[1;36m";
    let d = "\x1b[90m";
    let r = "\x1b[0m";

    println!();
    println!("  {h}Commands{r}");
    println!("  {c}{prefix}register 0x...{r}   {d}map this terminal to a wallet address{r}");
    println!("  {c}{prefix}swap <request>{r}   {d}swap through the vault{r}");
    println!("  {c}{prefix}<anything>{r}       {d}ask the assistant{r}");
    println!("  {c}/quit{r}               {d}exit{r}");
    println!();
}

#[async_trait]
impl Channel for ReplChannel {
    fn name(&self) -> &str {
        "repl"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let prefix = self.prefix.clone();

        let (tx, rx) = mpsc::channel(32);

        std::thread::spawn(move || {
            let config = Config::builder().auto_add_history(true).build();
            let mut rl = match DefaultEditor::with_config(config) {
                Ok(editor) => editor,
                Err(e) => {
                    eprintln!("Failed to initialize line editor: {e}");
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            println!("\x1b[1mvaultclaw\x1b[0m  /help for commands, /quit to exit");
            println!();

            while running.load(Ordering::SeqCst) {
                match rl.readline("\x1b[1;36m\u{203A}\x1b[0m ") {
                    Ok(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match line.to_lowercase().as_str() {
                            "/quit" | "/exit" => break,
                            "/help" => {
                                print_help(&prefix);
                                continue;
                            }
                            _ => {}
                        }

                        let msg = IncomingMessage::new("repl", LOCAL_USER, line);
                        if tx.blocking_send(msg).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                    Err(e) => {
                        tracing::error!("REPL input error: {}", e);
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            tracing::debug!("REPL input loop ended");
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", response.content);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChannelError::HealthCheckFailed {
                name: "repl".to_string(),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}
