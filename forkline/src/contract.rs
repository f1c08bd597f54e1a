//! Typed view calls against the content, registry and voting-pool contracts.

use std::sync::Arc;

use alloy_primitives::{Address, U256};

use crate::abi::{self, AbiKind, AbiValue};
use crate::source::{ChainError, ChainLogSource};
use crate::types::{TokenId, TokenStats};

/// Function signatures of the read calls used by the loaders.
pub mod signatures {
    pub const TOTAL_SUPPLY: &str = "totalSupply()";
    pub const TOKEN_URI: &str = "tokenURI(uint256)";
    pub const PARENT_OF: &str = "parentOf(uint256)";
    pub const GET_TOKEN_STATS: &str = "getTokenStats(uint256)";
}

/// Encodes calls, sends them through a [`ChainLogSource`] and decodes the returns.
#[derive(Clone)]
pub struct ContractReader {
    source: Arc<dyn ChainLogSource>,
}

impl ContractReader {
    pub fn new(source: Arc<dyn ChainLogSource>) -> Self {
        Self { source }
    }

    /// `totalSupply()` on the content contract.
    pub async fn total_supply(&self, contract: Address) -> Result<u64, ChainError> {
        let data = abi::encode_call(signatures::TOTAL_SUPPLY, &[]);
        let out = self.source.call(contract, data).await?;
        let value = abi::decode_uint(&out).map_err(invalid("totalSupply"))?;
        abi::to_u64(value)
            .ok_or_else(|| {
                ChainError::InvalidResponse(format!("totalSupply {} exceeds u64", value))
            })
    }

    /// `tokenURI(id)` on the content contract.
    pub async fn token_uri(&self, contract: Address, id: TokenId) -> Result<String, ChainError> {
        let data = abi::encode_call(signatures::TOKEN_URI, &[AbiValue::Uint(U256::from(id))]);
        let out = self.source.call(contract, data).await?;
        abi::decode_string(&out).map_err(invalid("tokenURI"))
    }

    /// `parentOf(id)` on the fork registry. Zero means no parent.
    pub async fn parent_of(
        &self,
        registry: Address,
        id: TokenId,
    ) -> Result<Option<TokenId>, ChainError> {
        let data = abi::encode_call(signatures::PARENT_OF, &[AbiValue::Uint(U256::from(id))]);
        let out = self.source.call(registry, data).await?;
        let parent = abi::decode_uint(&out).map_err(invalid("parentOf"))?;
        match abi::to_u64(parent) {
            Some(0) => Ok(None),
            Some(p) => Ok(Some(p)),
            None => Err(ChainError::InvalidResponse(format!("parentOf {} exceeds u64", parent))),
        }
    }

    /// `getTokenStats(id)` on the voting pool.
    pub async fn token_stats(&self, pool: Address, id: TokenId) -> Result<TokenStats, ChainError> {
        let data = abi::encode_call(signatures::GET_TOKEN_STATS, &[AbiValue::Uint(U256::from(id))]);
        let out = self.source.call(pool, data).await?;
        let values = abi::decode(&[AbiKind::Uint(256), AbiKind::Uint(256)], &out)
            .map_err(invalid("getTokenStats"))?;
        match values.as_slice() {
            [AbiValue::Uint(votes), AbiValue::Uint(total_value)] => Ok(TokenStats {
                votes: *votes,
                total_value: *total_value,
            }),
            _ => Err(ChainError::InvalidResponse("getTokenStats shape".to_string())),
        }
    }
}

fn invalid(function: &'static str) -> impl Fn(abi::AbiError) -> ChainError {
    move |e| ChainError::InvalidResponse(format!("{} return: {}", function, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockChainSource;

    #[tokio::test]
    async fn test_reads_round_trip_through_source() {
        let nft = Address::repeat_byte(1);
        let registry = Address::repeat_byte(2);
        let pool = Address::repeat_byte(3);
        let source = MockChainSource::default()
            .with_total_supply(nft, 2)
            .with_token_uri(nft, 1, "ipfs://one")
            .with_parent(registry, 2, 1)
            .with_parent(registry, 1, 0)
            .with_token_stats(pool, 1, 12, 500);
        let reader = ContractReader::new(Arc::new(source));

        assert_eq!(reader.total_supply(nft).await.unwrap(), 2);
        assert_eq!(reader.token_uri(nft, 1).await.unwrap(), "ipfs://one");
        assert_eq!(reader.parent_of(registry, 2).await.unwrap(), Some(1));
        assert_eq!(reader.parent_of(registry, 1).await.unwrap(), None);

        let stats = reader.token_stats(pool, 1).await.unwrap();
        assert_eq!(stats.votes, U256::from(12u64));
        assert_eq!(stats.total_value, U256::from(500u64));
    }

    #[tokio::test]
    async fn test_empty_return_is_invalid_response() {
        let nft = Address::repeat_byte(1);
        let source = MockChainSource::default().with_call_result(
            nft,
            abi::encode_call(signatures::TOTAL_SUPPLY, &[]),
            Vec::new(),
        );
        let reader = ContractReader::new(Arc::new(source));
        assert!(matches!(
            reader.total_supply(nft).await,
            Err(ChainError::InvalidResponse(_))
        ));
    }
}
