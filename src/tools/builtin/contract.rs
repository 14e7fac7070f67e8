//! Generic contract calls against a caller-supplied JSON ABI.
//!
//! Arguments arrive as strings (or plain JSON scalars) and are coerced to the
//! Solidity type of the matching ABI input, so the assistant never has to
//! produce calldata itself.

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::chain::{ChainClient, TxRequest, display_address, parse_address};
use crate::tools::ToolError;
use crate::tools::tool::address_property;

pub(crate) const WRITE_NAME: &str = "write_contract";
pub(crate) const READ_NAME: &str = "read_contract";

fn abi_property() -> Value {
    let param = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "type": { "type": "string" }
        }
    });
    json!({
        "type": "array",
        "description": "Contract ABI; must contain the called function",
        "items": {
            "type": "object",
            "properties": {
                "type": { "type": "string" },
                "name": { "type": "string" },
                "inputs": { "type": "array", "items": param },
                "outputs": { "type": "array", "items": param },
                "stateMutability": { "type": "string" }
            }
        }
    })
}

fn call_schema(address_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "address": address_property(address_description),
            "abi": abi_property(),
            "functionName": {
                "type": "string",
                "description": "The name of the contract function to call"
            },
            "args": {
                "type": "array",
                "description": "Function arguments in ABI order, each as a string",
                "items": { "type": "string" }
            }
        },
        "required": ["address", "abi", "functionName"]
    })
}

pub(crate) fn write_schema() -> Value {
    call_schema("Contract address to send the transaction to")
}

pub(crate) fn read_schema() -> Value {
    call_schema("Contract address to read from")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContractCallArgs {
    address: String,
    abi: Value,
    function_name: String,
    #[serde(default)]
    args: Vec<Value>,
}

impl ContractCallArgs {
    /// Resolve the function and ABI-encode the call, selector included.
    fn encode(&self) -> Result<(Function, Bytes), ToolError> {
        let abi = parse_abi(&self.abi)?;
        let function = find_function(&abi, &self.function_name, self.args.len())?;

        let values = function
            .inputs
            .iter()
            .zip(&self.args)
            .map(|(param, arg)| {
                let ty = param.resolve().map_err(|e| {
                    ToolError::InvalidParameters(format!("unsupported type '{}': {e}", param.ty))
                })?;
                ty.coerce_str(&argument_text(arg)).map_err(|e| {
                    ToolError::InvalidParameters(format!(
                        "argument '{}' is not a valid {}: {e}",
                        param.name, param.ty
                    ))
                })
            })
            .collect::<Result<Vec<DynSolValue>, ToolError>>()?;

        let data = function
            .abi_encode_input(&values)
            .map_err(|e| ToolError::InvalidParameters(format!("encoding failed: {e}")))?;
        Ok((function, Bytes::from(data)))
    }
}

/// The ABI as a JSON array, or that array serialized into a string.
fn parse_abi(raw: &Value) -> Result<JsonAbi, ToolError> {
    let parsed = match raw {
        Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| ToolError::InvalidParameters(format!("invalid abi: {e}")))
}

/// First overload of `name` taking `arity` inputs.
fn find_function(abi: &JsonAbi, name: &str, arity: usize) -> Result<Function, ToolError> {
    let overloads = abi.function(name).ok_or_else(|| {
        ToolError::InvalidParameters(format!("function '{name}' not found in abi"))
    })?;
    overloads
        .iter()
        .find(|f| f.inputs.len() == arity)
        .cloned()
        .ok_or_else(|| {
            let expected: Vec<String> = overloads.iter().map(|f| f.inputs.len().to_string()).collect();
            ToolError::InvalidParameters(format!(
                "function '{name}' takes {} argument(s), got {arity}",
                expected.join(" or ")
            ))
        })
}

fn argument_text(arg: &Value) -> String {
    match arg {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(address) => display_address(address),
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Uint(n, _) => n.to_string(),
        DynSolValue::Int(n, _) => n.to_string(),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", inner.join(", "))
        }
        other => format!("{other:?}"),
    }
}

pub(crate) async fn write(args: ContractCallArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    let contract = parse_address(&args.address, "address")?;
    let (function, data) = args.encode()?;

    let hash = chain.send_transaction(TxRequest::call(contract, data)).await?;
    tracing::info!(contract = %display_address(&contract), function = %function.name, %hash, "Contract write sent");
    Ok(format!(
        "Called {} on {}. Tx hash: {hash}",
        function.signature(),
        display_address(&contract)
    ))
}

pub(crate) async fn read(args: ContractCallArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    let contract = parse_address(&args.address, "address")?;
    let (function, data) = args.encode()?;

    let raw = chain.call(contract, data).await?;
    let values = function.abi_decode_output(&raw).map_err(|e| {
        ToolError::ExecutionFailed(format!("could not decode {} output: {e}", function.name))
    })?;

    let rendered: Vec<String> = function
        .outputs
        .iter()
        .zip(&values)
        .map(|(param, value)| match param.name.as_str() {
            "" => format_value(value),
            name => format!("{name}: {}", format_value(value)),
        })
        .collect();
    Ok(match rendered.as_slice() {
        [] => format!("{} returned no values", function.name),
        [single] => format!("{} returned {single}", function.name),
        many => format!("{} returned ({})", function.name, many.join(", ")),
    })
}
