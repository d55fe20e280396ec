/// Bitcoin Cash transactions: building, signing, serialization and spend
/// verification.
///
/// Provides the Transaction type with inputs and outputs, the legacy and
/// replay-protected signature hash algorithms, script templates, and a
/// checker that runs the script interpreter against a transaction.

pub mod checker;
pub mod input;
pub mod output;
pub mod sighash;
pub mod template;
pub mod transaction;

mod error;
pub use checker::{verify_all, verify_input, TransactionChecker};
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use transaction::Transaction;
