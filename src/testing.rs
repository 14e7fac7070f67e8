//! Test doubles for the assistant service and the chain.
//!
//! Provides:
//! - [`ScriptedAssistant`]: replays a scripted sequence of run states and
//!   records every thread message and tool-output submission
//! - [`RecordingChain`]: records transactions and calls instead of signing
//!
//! # Usage
//!
//! ```rust,no_run
//! use vaultclaw::llm::RunStatus;
//! use vaultclaw::testing::ScriptedAssistant;
//!
//! let assistant = ScriptedAssistant::new()
//!     .then(RunStatus::Queued)
//!     .then(RunStatus::Completed)
//!     .with_reply("Done");
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde_json::Value;

use crate::chain::{ChainClient, TxReceipt, TxRequest};
use crate::error::{ChainError, LlmError};
use crate::llm::{
    AssistantService, AssistantSpec, ContentBlock, RequiredAction, Role, Run, RunError, RunStatus,
    ThreadMessage, ToolCall, ToolOutput,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Build a tool call with JSON arguments.
pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

#[derive(Debug, Clone)]
struct Step {
    status: RunStatus,
    tool_calls: Option<Vec<ToolCall>>,
    error: Option<RunError>,
}

/// A message appended to a thread through the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub thread_id: String,
    pub role: Role,
    pub content: String,
}

/// Assistant service stub driven by a script of run states.
///
/// `create_run`, `retrieve_run` and `submit_tool_outputs` each consume the
/// next scripted step. Once the script is exhausted the last step repeats.
pub struct ScriptedAssistant {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    reply: Mutex<Option<ContentBlock>>,
    messages: Mutex<Vec<RecordedMessage>>,
    submissions: Mutex<Vec<Vec<ToolOutput>>>,
    assistants: Mutex<Vec<AssistantSpec>>,
    threads_created: AtomicU32,
    runs_created: AtomicU32,
    retrievals: AtomicU32,
    fail_add_message: AtomicBool,
}

impl ScriptedAssistant {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            reply: Mutex::new(None),
            messages: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            assistants: Mutex::new(Vec::new()),
            threads_created: AtomicU32::new(0),
            runs_created: AtomicU32::new(0),
            retrievals: AtomicU32::new(0),
            fail_add_message: AtomicBool::new(false),
        }
    }

    /// Append a plain status step.
    pub fn then(self, status: RunStatus) -> Self {
        self.push(Step {
            status,
            tool_calls: None,
            error: None,
        })
    }

    /// Append a `requires_action` step carrying tool calls.
    pub fn then_require_tools(self, calls: Vec<ToolCall>) -> Self {
        self.push(Step {
            status: RunStatus::RequiresAction,
            tool_calls: Some(calls),
            error: None,
        })
    }

    /// Append a `failed` step with an optional error message.
    pub fn then_fail(self, message: Option<&str>) -> Self {
        self.push(Step {
            status: RunStatus::Failed,
            tool_calls: None,
            error: Some(RunError {
                code: Some("server_error".to_string()),
                message: message.map(str::to_string),
            }),
        })
    }

    /// Latest assistant message returned by `list_messages`.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        *lock(&self.reply) = Some(ContentBlock::Text(text.into()));
        self
    }

    /// Latest assistant message with non-text content.
    pub fn with_non_text_reply(self) -> Self {
        *lock(&self.reply) = Some(ContentBlock::Other("image_file".to_string()));
        self
    }

    /// Make `add_message` fail for assistant-authored messages.
    pub fn failing_assistant_messages(self) -> Self {
        self.fail_add_message.store(true, Ordering::Relaxed);
        self
    }

    pub fn messages(&self) -> Vec<RecordedMessage> {
        lock(&self.messages).clone()
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        lock(&self.submissions).clone()
    }

    pub fn assistants(&self) -> Vec<AssistantSpec> {
        lock(&self.assistants).clone()
    }

    pub fn threads_created(&self) -> u32 {
        self.threads_created.load(Ordering::Relaxed)
    }

    pub fn runs_created(&self) -> u32 {
        self.runs_created.load(Ordering::Relaxed)
    }

    pub fn retrievals(&self) -> u32 {
        self.retrievals.load(Ordering::Relaxed)
    }

    fn push(self, step: Step) -> Self {
        lock(&self.script).push_back(step);
        self
    }

    fn next_run(&self, thread_id: &str, run_id: &str) -> Run {
        let step = {
            let mut script = lock(&self.script);
            let mut last = lock(&self.last);
            match script.pop_front() {
                Some(step) => {
                    *last = Some(step.clone());
                    step
                }
                None => last.clone().unwrap_or(Step {
                    status: RunStatus::Completed,
                    tool_calls: None,
                    error: None,
                }),
            }
        };
        Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            status: step.status,
            required_action: step.tool_calls.map(|tool_calls| RequiredAction { tool_calls }),
            last_error: step.error,
        }
    }
}

impl Default for ScriptedAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssistantService for ScriptedAssistant {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, LlmError> {
        lock(&self.assistants).push(spec.clone());
        Ok("asst_test".to_string())
    }

    async fn create_thread(&self) -> Result<String, LlmError> {
        let n = self.threads_created.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("thread_{n}"))
    }

    async fn add_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), LlmError> {
        if role == Role::Assistant && self.fail_add_message.load(Ordering::Relaxed) {
            return Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "add_message disabled".to_string(),
            });
        }
        lock(&self.messages).push(RecordedMessage {
            thread_id: thread_id.to_string(),
            role,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, _assistant_id: &str) -> Result<Run, LlmError> {
        let n = self.runs_created.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(self.next_run(thread_id, &format!("run_{n}")))
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, LlmError> {
        self.retrievals.fetch_add(1, Ordering::Relaxed);
        Ok(self.next_run(thread_id, run_id))
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, LlmError> {
        lock(&self.submissions).push(outputs.to_vec());
        Ok(self.next_run(thread_id, run_id))
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, LlmError> {
        let mut listed: Vec<ThreadMessage> = lock(&self.messages)
            .iter()
            .enumerate()
            .filter(|(_, m)| m.thread_id == thread_id)
            .map(|(i, m)| ThreadMessage {
                id: format!("msg_{i}"),
                role: m.role,
                content: vec![ContentBlock::Text(m.content.clone())],
            })
            .collect();
        if let Some(reply) = lock(&self.reply).clone() {
            listed.push(ThreadMessage {
                id: "msg_reply".to_string(),
                role: Role::Assistant,
                content: vec![reply],
            });
        }
        listed.reverse();
        Ok(listed)
    }
}

/// Chain stub that records what would have been sent.
pub struct RecordingChain {
    address: Address,
    balance: Mutex<U256>,
    call_result: Mutex<Bytes>,
    send_failure: Mutex<Option<String>>,
    receipt: Mutex<Option<TxReceipt>>,
    sent: Mutex<Vec<TxRequest>>,
    calls: Mutex<Vec<(Address, Bytes)>>,
    nonce: AtomicU64,
}

impl RecordingChain {
    pub fn new() -> Self {
        Self {
            address: Address::repeat_byte(0xaa),
            balance: Mutex::new(U256::ZERO),
            call_result: Mutex::new(Bytes::from(vec![0u8; 32])),
            send_failure: Mutex::new(None),
            receipt: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            nonce: AtomicU64::new(0),
        }
    }

    pub fn with_balance(self, wei: U256) -> Self {
        *lock(&self.balance) = wei;
        self
    }

    /// Return data for every `call`.
    pub fn with_call_result(self, data: Bytes) -> Self {
        *lock(&self.call_result) = data;
        self
    }

    pub fn with_receipt(self, receipt: TxReceipt) -> Self {
        *lock(&self.receipt) = Some(receipt);
        self
    }

    /// Make every `send_transaction` fail with `reason`.
    pub fn failing_sends(self, reason: impl Into<String>) -> Self {
        *lock(&self.send_failure) = Some(reason.into());
        self
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        lock(&self.sent).clone()
    }

    pub fn calls(&self) -> Vec<(Address, Bytes)> {
        lock(&self.calls).clone()
    }

    /// Hash returned for the `n`th (1-based) successful send.
    pub fn hash_for(n: u64) -> String {
        format!("0x{n:064x}")
    }
}

impl Default for RecordingChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for RecordingChain {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance(&self, _account: Address) -> Result<U256, ChainError> {
        Ok(*lock(&self.balance))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        lock(&self.calls).push((to, data));
        Ok(lock(&self.call_result).clone())
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<String, ChainError> {
        if let Some(reason) = lock(&self.send_failure).clone() {
            return Err(ChainError::RpcRejected {
                method: "eth_sendRawTransaction".to_string(),
                code: -32000,
                message: reason,
            });
        }
        lock(&self.sent).push(tx);
        let n = self.nonce.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Self::hash_for(n))
    }

    async fn transaction_receipt(&self, _hash: &str) -> Result<Option<TxReceipt>, ChainError> {
        Ok(lock(&self.receipt).clone())
    }
}
