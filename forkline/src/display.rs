//! Render-time formatting for decoded events.
//!
//! Decoded values keep full precision; shortening only happens here.

use serde::Serialize;

use crate::abi::AbiValue;
use crate::events::DecodedEvent;

/// Strings longer than this (in chars) that start with `0x` are abbreviated.
const MAX_PLAIN_HEX: usize = 12;
const HEAD_CHARS: usize = 8;
const TAIL_CHARS: usize = 4;

/// One argument ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedArg {
    pub name: String,
    pub value: String,
}

/// `0x1234567890abcdef` → `0x123456…cdef`. Anything else is returned as-is.
pub fn abbreviate_hex(value: &str) -> String {
    if !value.starts_with("0x") {
        return value.to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= MAX_PLAIN_HEX {
        return value.to_string();
    }
    let head: String = chars[..HEAD_CHARS].iter().collect();
    let tail: String = chars[chars.len() - TAIL_CHARS..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Display form of a single value: integers in decimal, long hex shortened.
pub fn render_value(value: &AbiValue) -> String {
    match value {
        AbiValue::Uint(v) => v.to_string(),
        other => abbreviate_hex(&other.to_string()),
    }
}

pub fn render_args(event: &DecodedEvent) -> Vec<RenderedArg> {
    event
        .args
        .iter()
        .map(|arg| RenderedArg {
            name: arg.name.clone(),
            value: render_value(&arg.value),
        })
        .collect()
}

/// Single-line summary, e.g. `#1042 Transfer from=0x000000…0000 to=… tokenId=7`.
pub fn render_event(event: &DecodedEvent) -> String {
    let mut line = format!("#{} {}", event.block_number, event.event_name);
    for arg in render_args(event) {
        line.push(' ');
        line.push_str(&arg.name);
        line.push('=');
        line.push_str(&arg.value);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventArg, EventName};
    use alloy_primitives::{Address, B256, U256};

    #[test]
    fn test_abbreviate_hex() {
        assert_eq!(
            abbreviate_hex("0xabcdef0123456789abcdef0123456789abcdef01"),
            "0xabcdef…ef01"
        );
        // 12 chars stays whole, 13 is shortened
        assert_eq!(abbreviate_hex("0x1234567890"), "0x1234567890");
        assert_eq!(abbreviate_hex("0x1234567890a"), "0x123456…890a");
        let uri = "ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";
        assert_eq!(abbreviate_hex(uri), uri);
    }

    #[test]
    fn test_abbreviate_non_ascii_does_not_split_chars() {
        assert_eq!(abbreviate_hex("0xééééééééééé"), "0xéééééé…éééé");
    }

    #[test]
    fn test_render_args() {
        let event = DecodedEvent {
            block_number: 42,
            tx_hash: B256::ZERO,
            log_index: None,
            event_name: EventName::Transfer,
            args: vec![
                EventArg { name: "from".into(), value: AbiValue::Address(Address::ZERO) },
                EventArg {
                    name: "to".into(),
                    value: AbiValue::Address(Address::repeat_byte(0xab)),
                },
                EventArg {
                    name: "tokenId".into(),
                    value: AbiValue::Uint(U256::MAX),
                },
            ],
        };

        let rendered = render_args(&event);
        assert_eq!(rendered[0].value, "0x000000…0000");
        assert_eq!(rendered[1].value, "0xababab…abab");
        assert_eq!(rendered[2].value, U256::MAX.to_string());
        assert!(rendered[2].value.len() > 70);

        // the event itself is untouched
        assert_eq!(event.args[1].value, AbiValue::Address(Address::repeat_byte(0xab)));

        assert_eq!(
            render_event(&event),
            format!("#42 Transfer from=0x000000…0000 to=0xababab…abab tokenId={}", U256::MAX)
        );
    }
}
