//! Transaction identifier generation.

use uuid::Uuid;

const PREFIX: &str = "3flS";
const SUFFIX: &str = "h";

/// Length of a generated transaction id.
pub const TRANSACTION_ID_LEN: usize = PREFIX.len() + 32 + SUFFIX.len();

/// Source of transaction identifiers stamped on each response.
pub trait TransactionIdGenerator {
    fn generate(&self) -> String;
}

/// Random v4 UUID rendered as 32 lowercase hex digits between a fixed
/// prefix and suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTransactionIds;

impl TransactionIdGenerator for RandomTransactionIds {
    fn generate(&self) -> String {
        format!("{}{}{}", PREFIX, Uuid::new_v4().simple(), SUFFIX)
    }
}
