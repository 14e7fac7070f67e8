use std::str::FromStr;

use alloy_primitives::{Address, Bytes, U256};
use serde_json::json;

use crate::chain::TxReceipt;
use crate::chain::abi::{self, selector};
use crate::testing::RecordingChain;
use crate::tools::ChainTool;

const VAULT: &str = "0xdfA8A83B0941F1d3ec47AD3BfEAE9D929E29b915";
const YBTC: &str = "0xBBd3EDd4D3b519c0d14965d9311185CFaC8c3220";
const YU: &str = "0xcB856bC5Aa2664E47c9caDce6fF65117c5201a1C";
const USER: &str = "0x1111111111111111111111111111111111111111";

fn word(data: &Bytes, index: usize) -> U256 {
    let start = 4 + 32 * index;
    U256::from_be_slice(&data[start..start + 32])
}

fn addr(raw: &str) -> Address {
    Address::from_str(raw).unwrap()
}

fn eth(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

#[tokio::test]
async fn test_swap_encodes_sanitized_arguments() {
    let chain = RecordingChain::new();
    let output = ChainTool::ExecuteVaultSwap
        .invoke(
            json!({
                "vaultAddress": VAULT,
                "user": USER,
                "tokenIn": YU,
                "tokenOut": YBTC,
                "amountIn": "5",
                "minAmountOut": "0",
                "deadline": "0"
            }),
            &chain,
        )
        .await
        .unwrap();

    assert_eq!(
        output,
        format!("Swap executed successfully. Tx hash: {}", RecordingChain::hash_for(1))
    );
    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];
    assert_eq!(tx.to, addr(VAULT));
    assert!(tx.value.is_zero());
    assert_eq!(&tx.data[..4], &selector(abi::EXECUTE_SWAP));
    assert_eq!(word(&tx.data, 0), U256::from_be_slice(addr(USER).as_slice()));
    assert_eq!(word(&tx.data, 3), eth(5));
    assert_eq!(word(&tx.data, 4), U256::from(1u64));
    assert!(word(&tx.data, 5) > U256::from(1_700_000_000u64));
}

#[tokio::test]
async fn test_swap_submission_failure_is_reported_not_raised() {
    let chain = RecordingChain::new().failing_sends("execution reverted");
    let output = ChainTool::ExecuteVaultSwap
        .invoke(
            json!({
                "vaultAddress": VAULT,
                "user": USER,
                "tokenIn": YU,
                "tokenOut": YBTC,
                "amountIn": "5000000000000000000",
                "minAmountOut": "1",
                "deadline": "4000000000"
            }),
            &chain,
        )
        .await
        .unwrap();

    assert!(output.starts_with("Swap failed with error:"));
    assert!(output.contains("execution reverted"));
}

#[tokio::test]
async fn test_swap_rejects_bad_address() {
    let chain = RecordingChain::new();
    let err = ChainTool::ExecuteVaultSwap
        .invoke(
            json!({
                "vaultAddress": VAULT,
                "user": "0x1234",
                "tokenIn": YU,
                "tokenOut": YBTC,
                "amountIn": "5",
                "minAmountOut": "1",
                "deadline": "0"
            }),
            &chain,
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("user"));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_wallet_address_and_balance() {
    let chain = RecordingChain::new().with_balance(U256::from(1_500_000_000_000_000_000u128));

    let address = ChainTool::GetWalletAddress.invoke(json!({}), &chain).await.unwrap();
    assert_eq!(address.to_lowercase(), format!("0x{}", "aa".repeat(20)));

    let balance = ChainTool::GetBalance
        .invoke(json!({ "address": USER }), &chain)
        .await
        .unwrap();
    assert_eq!(balance, "1.5 ETH");
}

#[tokio::test]
async fn test_send_transaction_converts_eth_value() {
    let chain = RecordingChain::new();
    let output = ChainTool::SendTransaction
        .invoke(json!({ "to": USER, "value": "0.25", "data": "0xdeadbeef" }), &chain)
        .await
        .unwrap();

    assert!(output.contains(&RecordingChain::hash_for(1)));
    let tx = &chain.sent()[0];
    assert_eq!(tx.value, U256::from(250_000_000_000_000_000u128));
    assert_eq!(&tx.data[..], &[0xde, 0xad, 0xbe, 0xef]);
}

#[tokio::test]
async fn test_token_balance_reads_balance_of() {
    let chain = RecordingChain::new().with_call_result(Bytes::from(
        eth(5).to_be_bytes::<32>().to_vec(),
    ));
    let output = ChainTool::GetTokenBalance
        .invoke(json!({ "tokenAddress": YU, "accountAddress": USER }), &chain)
        .await
        .unwrap();

    assert!(output.contains(USER));
    assert!(output.contains(YU));
    assert!(output.ends_with(": 5"));
    let calls = chain.calls();
    assert_eq!(calls[0].0, addr(YU));
    assert_eq!(&calls[0].1[..4], &selector(abi::ERC20_BALANCE_OF));
}

#[tokio::test]
async fn test_transfer_and_approve_scale_whole_tokens() {
    let chain = RecordingChain::new();
    ChainTool::TransferToken
        .invoke(json!({ "tokenAddress": YU, "to": USER, "amount": "2" }), &chain)
        .await
        .unwrap();
    ChainTool::ApproveTokenAllowance
        .invoke(
            json!({ "tokenAddress": YBTC, "spenderAddress": VAULT, "amount": 10 }),
            &chain,
        )
        .await
        .unwrap();

    let sent = chain.sent();
    assert_eq!(sent[0].to, addr(YU));
    assert_eq!(&sent[0].data[..4], &selector(abi::ERC20_TRANSFER));
    assert_eq!(word(&sent[0].data, 1), eth(2));
    assert_eq!(sent[1].to, addr(YBTC));
    assert_eq!(&sent[1].data[..4], &selector(abi::ERC20_APPROVE));
    assert_eq!(word(&sent[1].data, 1), eth(10));
}

#[tokio::test]
async fn test_transfer_requires_amount() {
    let chain = RecordingChain::new();
    let err = ChainTool::TransferToken
        .invoke(json!({ "tokenAddress": YU, "to": USER, "amount": null }), &chain)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("amount"));
}

#[tokio::test]
async fn test_create_pair_targets_factory() {
    let factory = addr("0xF62c03E08ada871A0bEb309762E260a7a6a880E6");
    let chain = RecordingChain::new();
    let output = ChainTool::CreateUniswapV2Pair { factory }
        .invoke(json!({ "tokenA": YU, "tokenB": YBTC }), &chain)
        .await
        .unwrap();

    assert_eq!(
        output,
        format!(
            "Tx submitted to createPair({YU}, {YBTC}). Hash: {}",
            RecordingChain::hash_for(1)
        )
    );
    assert_eq!(chain.sent()[0].to, factory);

    let same = ChainTool::CreateUniswapV2Pair { factory }
        .invoke(json!({ "tokenA": YU, "tokenB": YU }), &chain)
        .await;
    assert!(same.is_err());
}

#[tokio::test]
async fn test_receipt_lookup() {
    let hash = format!("0x{}", "ab".repeat(32));
    let pending = ChainTool::GetTransactionReceipt
        .invoke(json!({ "hash": hash }), &RecordingChain::new())
        .await
        .unwrap();
    assert!(pending.contains("pending"));

    let chain = RecordingChain::new().with_receipt(TxReceipt {
        transaction_hash: hash.clone(),
        success: true,
        block_number: 42,
        gas_used: U256::from(21_000u64),
    });
    let mined = ChainTool::GetTransactionReceipt
        .invoke(json!({ "hash": hash }), &chain)
        .await
        .unwrap();
    assert_eq!(
        mined,
        format!("Transaction {hash}: status success, block 42, gas used 21000")
    );
}

fn erc20_abi() -> serde_json::Value {
    json!([
        {
            "type": "function",
            "name": "transfer",
            "inputs": [
                { "name": "to", "type": "address" },
                { "name": "amount", "type": "uint256" }
            ],
            "outputs": [{ "name": "", "type": "bool" }],
            "stateMutability": "nonpayable"
        },
        {
            "type": "function",
            "name": "balanceOf",
            "inputs": [{ "name": "owner", "type": "address" }],
            "outputs": [{ "name": "", "type": "uint256" }],
            "stateMutability": "view"
        },
        {
            "type": "function",
            "name": "setGreeting",
            "inputs": [
                { "name": "greeting", "type": "string" },
                { "name": "count", "type": "uint256" }
            ],
            "outputs": [],
            "stateMutability": "nonpayable"
        },
        {
            "type": "function",
            "name": "getReserves",
            "inputs": [],
            "outputs": [
                { "name": "reserve0", "type": "uint112" },
                { "name": "reserve1", "type": "uint112" }
            ],
            "stateMutability": "view"
        }
    ])
}

#[tokio::test]
async fn test_write_contract_encodes_from_abi() {
    let chain = RecordingChain::new();
    let output = ChainTool::WriteContract
        .invoke(
            json!({
                "address": YU,
                "abi": erc20_abi(),
                "functionName": "transfer",
                "args": [USER, "42"]
            }),
            &chain,
        )
        .await
        .unwrap();

    assert!(output.starts_with("Called transfer(address,uint256)"));
    assert!(output.contains(&RecordingChain::hash_for(1)));
    let tx = &chain.sent()[0];
    assert_eq!(tx.to, addr(YU));
    assert_eq!(
        tx.data,
        abi::encode_call(
            abi::ERC20_TRANSFER,
            &[abi::Word::Address(addr(USER)), abi::Word::Uint(U256::from(42u64))]
        )
    );
}

#[tokio::test]
async fn test_write_contract_handles_dynamic_arguments() {
    let chain = RecordingChain::new();
    ChainTool::WriteContract
        .invoke(
            json!({
                "address": YU,
                "abi": erc20_abi().to_string(),
                "functionName": "setGreeting",
                "args": ["hi", 7]
            }),
            &chain,
        )
        .await
        .unwrap();

    let data = &chain.sent()[0].data;
    assert_eq!(&data[..4], &selector("setGreeting(string,uint256)"));
    assert_eq!(word(data, 0), U256::from(64u64));
    assert_eq!(word(data, 1), U256::from(7u64));
    assert_eq!(word(data, 2), U256::from(2u64));
    assert_eq!(&data[4 + 96..4 + 98], b"hi");
}

#[tokio::test]
async fn test_write_contract_rejects_bad_calls() {
    let chain = RecordingChain::new();
    let call = |function: &str, args: serde_json::Value| {
        json!({ "address": YU, "abi": erc20_abi(), "functionName": function, "args": args })
    };

    let missing = ChainTool::WriteContract
        .invoke(call("mint", json!([])), &chain)
        .await
        .unwrap_err();
    assert!(missing.to_string().contains("'mint' not found"));

    let arity = ChainTool::WriteContract
        .invoke(call("transfer", json!([USER])), &chain)
        .await
        .unwrap_err();
    assert!(arity.to_string().contains("takes 2 argument(s), got 1"));

    let bad_uint = ChainTool::WriteContract
        .invoke(call("transfer", json!([USER, "lots"])), &chain)
        .await
        .unwrap_err();
    assert!(bad_uint.to_string().contains("'amount'"));

    let bad_abi = ChainTool::WriteContract
        .invoke(
            json!({ "address": YU, "abi": "not json", "functionName": "transfer" }),
            &chain,
        )
        .await
        .unwrap_err();
    assert!(bad_abi.to_string().contains("invalid abi"));

    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_read_contract_decodes_outputs() {
    let chain = RecordingChain::new().with_call_result(Bytes::from(
        U256::from(1234u64).to_be_bytes::<32>().to_vec(),
    ));
    let output = ChainTool::ReadContract
        .invoke(
            json!({
                "address": YU,
                "abi": erc20_abi(),
                "functionName": "balanceOf",
                "args": [USER]
            }),
            &chain,
        )
        .await
        .unwrap();

    assert_eq!(output, "balanceOf returned 1234");
    let calls = chain.calls();
    assert_eq!(calls[0].0, addr(YU));
    assert_eq!(
        calls[0].1,
        abi::encode_call(abi::ERC20_BALANCE_OF, &[abi::Word::Address(addr(USER))])
    );
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_read_contract_names_multiple_outputs() {
    let mut data = U256::from(10u64).to_be_bytes::<32>().to_vec();
    data.extend_from_slice(&U256::from(20u64).to_be_bytes::<32>());
    let chain = RecordingChain::new().with_call_result(Bytes::from(data));

    let output = ChainTool::ReadContract
        .invoke(
            json!({ "address": YU, "abi": erc20_abi(), "functionName": "getReserves" }),
            &chain,
        )
        .await
        .unwrap();
    assert_eq!(output, "getReserves returned (reserve0: 10, reserve1: 20)");
}
