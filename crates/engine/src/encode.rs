//! Encoding of source transactions into submission arguments, and their decoded display form.

use crate::EncodingError;
use alloy_consensus::TxEnvelope;
use alloy_eips::eip2718::{Decodable2718, Encodable2718};
use alloy_primitives::{Address, Bytes, TxKind, U256};
use std::fmt;

/// Encodes a source transaction into the argument bytes of a `submit` call.
///
/// ## Takes
/// - `tx`: The source transaction.
///
/// ## Returns
/// - `Ok(Bytes)`: The EIP-2718 encoding. Legacy transactions encode to their plain RLP form.
/// - `Err(EncodingError)`: The transaction type cannot be executed by the target contract.
pub fn encode_transaction(tx: &TxEnvelope) -> Result<Bytes, EncodingError> {
    match tx {
        TxEnvelope::Legacy(_) | TxEnvelope::Eip2930(_) | TxEnvelope::Eip1559(_) => {
            Ok(tx.encoded_2718().into())
        }
        _ => Err(EncodingError::UnsupportedTransactionType(tx.tx_type() as u8)),
    }
}

/// The fields of a source transaction shown when its submission fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSummary {
    /// The canonical encoding of the transaction.
    pub raw: Bytes,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price. For EIP-1559 transactions, the max fee per gas.
    pub gas_price: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value in wei.
    pub value: U256,
    /// Call data or init code.
    pub input: Bytes,
}

impl TxSummary {
    /// Decodes a [TxSummary] from the canonical encoding of a transaction.
    pub fn decode(mut raw: &[u8]) -> Result<Self, EncodingError> {
        let tx = TxEnvelope::decode_2718(&mut raw)
            .map_err(|e| EncodingError::Decode(e.to_string()))?;
        Self::try_from(&tx)
    }
}

impl TryFrom<&TxEnvelope> for TxSummary {
    type Error = EncodingError;

    fn try_from(envelope: &TxEnvelope) -> Result<Self, Self::Error> {
        let raw = encode_transaction(envelope)?;
        let (nonce, gas_price, gas_limit, to, value, input) = match envelope {
            TxEnvelope::Legacy(signed_tx) => {
                let tx = signed_tx.tx();
                (tx.nonce, tx.gas_price, tx.gas_limit, tx.to, tx.value, tx.input.clone())
            }
            TxEnvelope::Eip2930(signed_tx) => {
                let tx = signed_tx.tx();
                (tx.nonce, tx.gas_price, tx.gas_limit, tx.to, tx.value, tx.input.clone())
            }
            TxEnvelope::Eip1559(signed_tx) => {
                let tx = signed_tx.tx();
                (tx.nonce, tx.max_fee_per_gas, tx.gas_limit, tx.to, tx.value, tx.input.clone())
            }
            _ => return Err(EncodingError::UnsupportedTransactionType(envelope.tx_type() as u8)),
        };
        let to = match to {
            TxKind::Call(to) => Some(to),
            TxKind::Create => None,
        };
        Ok(Self { raw, nonce, gas_price, gas_limit, to, value, input })
    }
}

impl fmt::Display for TxSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "transaction:")?;
        writeln!(f, "{}", self.raw)?;
        writeln!(f, "nonce: {}", self.nonce)?;
        writeln!(f, "gasPrice: {}", self.gas_price)?;
        writeln!(f, "gasLimit: {}", self.gas_limit)?;
        match self.to {
            Some(to) => writeln!(f, "to: {to}")?,
            None => writeln!(f, "to: contract creation")?,
        }
        writeln!(f, "value: {}", self.value)?;
        if !self.input.is_empty() {
            writeln!(f, "data:")?;
            writeln!(f, "{}", self.input)?;
        }
        Ok(())
    }
}
