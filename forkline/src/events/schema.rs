//! Event schemas and the single-schema decoder.

use std::fmt;

use alloy_primitives::{keccak256, B256, U256};
use serde::{Deserialize, Serialize};

use crate::abi::{self, AbiError, AbiKind, AbiValue};
use crate::types::RawLog;

/// Events the collection contracts are known to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    GenesisCreated,
    #[serde(rename = "TokenURIUpdated")]
    TokenUriUpdated,
    ContentHashSet,
    Transfer,
    ForkRegistered,
    VoteCast,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::GenesisCreated => "GenesisCreated",
            EventName::TokenUriUpdated => "TokenURIUpdated",
            EventName::ContentHashSet => "ContentHashSet",
            EventName::Transfer => "Transfer",
            EventName::ForkRegistered => "ForkRegistered",
            EventName::VoteCast => "VoteCast",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named, typed event field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: &'static str,
    pub kind: AbiKind,
    pub indexed: bool,
}

impl EventParam {
    pub fn indexed(name: &'static str, kind: AbiKind) -> Self {
        Self {
            name,
            kind,
            indexed: true,
        }
    }

    pub fn data(name: &'static str, kind: AbiKind) -> Self {
        Self {
            name,
            kind,
            indexed: false,
        }
    }
}

/// Why a log did not match a schema. Expected, never an error condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoMatch {
    #[error("log has no topics")]
    Anonymous,
    #[error("selector differs")]
    Selector,
    #[error("expected {expected} topics, got {got}")]
    TopicCount { expected: usize, got: usize },
    #[error("field {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: AbiError,
    },
    #[error("data section: {0}")]
    Data(AbiError),
}

/// A named value decoded from a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventArg {
    pub name: String,
    pub value: AbiValue,
}

/// One successfully interpreted log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedEvent {
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: Option<u64>,
    pub event_name: EventName,
    /// Fields in declaration order, full precision
    pub args: Vec<EventArg>,
}

impl DecodedEvent {
    /// Look up an argument by field name.
    pub fn arg(&self, name: &str) -> Option<&AbiValue> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn uint_arg(&self, name: &str) -> Option<U256> {
        self.arg(name).and_then(AbiValue::as_uint)
    }
}

/// A versioned event signature with its field layout.
#[derive(Debug, Clone)]
pub struct EventSchema {
    name: EventName,
    params: Vec<EventParam>,
    signature: String,
    topic0: B256,
}

impl EventSchema {
    pub fn new(name: EventName, params: Vec<EventParam>) -> Self {
        let types: Vec<String> = params.iter().map(|p| p.kind.type_name()).collect();
        let signature = format!("{}({})", name.as_str(), types.join(","));
        let topic0 = keccak256(signature.as_bytes());
        Self {
            name,
            params,
            signature,
            topic0,
        }
    }

    pub fn name(&self) -> EventName {
        self.name
    }

    pub fn params(&self) -> &[EventParam] {
        &self.params
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// keccak256 of the signature; the first topic of a matching log.
    pub fn topic0(&self) -> B256 {
        self.topic0
    }

    fn indexed_count(&self) -> usize {
        self.params.iter().filter(|p| p.indexed).count()
    }

    /// Attempt a structural match of `log` against this schema.
    pub fn decode(&self, log: &RawLog) -> Result<DecodedEvent, NoMatch> {
        let first = log.topics.first().ok_or(NoMatch::Anonymous)?;
        if *first != self.topic0 {
            return Err(NoMatch::Selector);
        }

        let expected = 1 + self.indexed_count();
        if log.topics.len() != expected {
            return Err(NoMatch::TopicCount {
                expected,
                got: log.topics.len(),
            });
        }

        let data_kinds: Vec<AbiKind> = self
            .params
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind)
            .collect();
        let mut data_values = abi::decode(&data_kinds, &log.data)
            .map_err(NoMatch::Data)?
            .into_iter();

        let mut topics = log.topics[1..].iter();
        let mut args = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let value = if param.indexed {
                let topic = topics.next().ok_or(NoMatch::TopicCount {
                    expected,
                    got: log.topics.len(),
                })?;
                abi::decode_word(param.kind, &topic.0).map_err(|source| NoMatch::Field {
                    field: param.name,
                    source,
                })?
            } else {
                data_values.next().ok_or(NoMatch::Data(AbiError::DataTooShort {
                    needed: data_kinds.len() * abi::WORD,
                    got: log.data.len(),
                }))?
            };
            args.push(EventArg {
                name: param.name.to_string(),
                value,
            });
        }

        Ok(DecodedEvent {
            block_number: log.block_number,
            tx_hash: log.transaction_hash,
            log_index: log.log_index,
            event_name: self.name,
            args,
        })
    }
}

/// Build the topics and data a contract would emit for `values`.
///
/// `values` follow declaration order of the schema's params.
pub fn encode_log_parts(schema: &EventSchema, values: &[AbiValue]) -> (Vec<B256>, Vec<u8>) {
    let mut topics = vec![schema.topic0()];
    let mut data_values = Vec::new();
    for (param, value) in schema.params().iter().zip(values) {
        if param.indexed {
            topics.push(B256::from(abi::static_word(value)));
        } else {
            data_values.push(value.clone());
        }
    }
    (topics, abi::encode(&data_values))
}
