use serde::{Deserialize, Serialize};

use super::TokenId;

/// `keccak256("Transfer(address,address,uint256)")`, topic 0 of ERC-721 transfers.
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// A log entry from a transaction receipt, hex encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

impl ReceiptLog {
    /// Build the ERC-721 `Transfer(from, to, token_id)` log a mint emits.
    pub fn transfer(contract: &str, from: &str, to: &str, token_id: u128) -> Self {
        let mut id = [0u8; 32];
        id[16..].copy_from_slice(&token_id.to_be_bytes());

        Self {
            address: contract.to_ascii_lowercase(),
            topics: vec![
                TRANSFER_TOPIC.to_string(),
                address_topic(from),
                address_topic(to),
                format!("0x{}", hex::encode(id)),
            ],
            data: "0x".to_string(),
        }
    }

    /// Token id carried by this log, if it is a well-formed ERC-721 `Transfer`.
    pub fn transfer_token_id(&self) -> Option<TokenId> {
        if self.topics.len() != 4 || !self.topics[0].eq_ignore_ascii_case(TRANSFER_TOPIC) {
            return None;
        }
        let word = decode_word(&self.topics[3])?;
        Some(TokenId::new(be_bytes_to_decimal(&word)))
    }
}

/// Token id minted by a receipt: the first log that parses as a `Transfer` wins.
pub fn minted_token_id(logs: &[ReceiptLog]) -> Option<TokenId> {
    logs.iter().find_map(ReceiptLog::transfer_token_id)
}

fn address_topic(address: &str) -> String {
    let digits = address
        .strip_prefix("0x")
        .unwrap_or(address)
        .to_ascii_lowercase();
    format!("0x{:0>64}", digits)
}

fn decode_word(topic: &str) -> Option<[u8; 32]> {
    let digits = topic.strip_prefix("0x").unwrap_or(topic);
    let bytes = hex::decode(digits).ok()?;
    bytes.try_into().ok()
}

fn be_bytes_to_decimal(bytes: &[u8]) -> String {
    let mut number: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
    let mut digits = Vec::new();

    while !number.is_empty() {
        let mut remainder = 0u32;
        let mut quotient = Vec::with_capacity(number.len());
        for byte in &number {
            let acc = (remainder << 8) | u32::from(*byte);
            let q = (acc / 10) as u8;
            remainder = acc % 10;
            if !(quotient.is_empty() && q == 0) {
                quotient.push(q);
            }
        }
        digits.push(b'0' + remainder as u8);
        number = quotient;
    }

    if digits.is_empty() {
        return "0".to_string();
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
