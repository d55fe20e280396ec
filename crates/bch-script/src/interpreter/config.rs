//! Interpreter resource limits.

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Maximum combined depth of the main and alt stacks.
pub const MAX_STACK_SIZE: usize = 1000;
/// Maximum size of a single script in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
/// Maximum size of a pushed or computed stack element.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Maximum byte length of an arithmetic operand.
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;
/// Maximum byte length of a CHECKLOCKTIMEVERIFY / CHECKSEQUENCEVERIFY operand.
pub const MAX_LOCK_TIME_NUMBER_LENGTH: usize = 5;
/// Maximum number of public keys in one CHECKMULTISIG.
pub const MAX_PUB_KEYS_PER_MULTISIG: usize = 20;

/// Script configuration limits.
///
/// `Config::default()` carries the consensus values; tests may shrink them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_ops: usize,
    pub max_stack_size: usize,
    pub max_script_size: usize,
    pub max_element_size: usize,
    pub max_number_length: usize,
    pub max_lock_time_number_length: usize,
    pub max_pub_keys_per_multisig: usize,
}

impl Config {
    pub fn new() -> Self {
        Config {
            max_ops: MAX_OPS_PER_SCRIPT,
            max_stack_size: MAX_STACK_SIZE,
            max_script_size: MAX_SCRIPT_SIZE,
            max_element_size: MAX_SCRIPT_ELEMENT_SIZE,
            max_number_length: MAX_SCRIPT_NUMBER_LENGTH,
            max_lock_time_number_length: MAX_LOCK_TIME_NUMBER_LENGTH,
            max_pub_keys_per_multisig: MAX_PUB_KEYS_PER_MULTISIG,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
