//! Script verification flags (bitmask).

use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Script verification flags controlling interpreter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ScriptFlags(pub u32);

impl ScriptFlags {
    pub const NONE: ScriptFlags = ScriptFlags(0);
    /// Evaluate pay-to-script-hash redeem scripts.
    pub const P2SH: ScriptFlags = ScriptFlags(1 << 0);
    /// Enforce canonical signature hash types and public key encodings.
    pub const STRICT_ENCODING: ScriptFlags = ScriptFlags(1 << 1);
    /// Enforce strict DER signature encoding.
    pub const DER_SIGNATURES: ScriptFlags = ScriptFlags(1 << 2);
    /// Reject signatures with S above half the curve order.
    pub const LOW_S: ScriptFlags = ScriptFlags(1 << 3);
    /// Failed signature checks must use empty signatures.
    pub const NULL_FAIL: ScriptFlags = ScriptFlags(1 << 4);
    /// The extra CHECKMULTISIG argument must be empty.
    pub const NULL_DUMMY: ScriptFlags = ScriptFlags(1 << 5);
    /// The unlocking script may only contain pushes.
    pub const SIG_PUSH_ONLY: ScriptFlags = ScriptFlags(1 << 6);
    /// Pushes and numeric operands must use minimal encodings.
    pub const MINIMAL_DATA: ScriptFlags = ScriptFlags(1 << 7);
    /// Exactly one element must remain after evaluation. Requires `P2SH`.
    pub const CLEAN_STACK: ScriptFlags = ScriptFlags(1 << 8);
    pub const CHECK_LOCK_TIME_VERIFY: ScriptFlags = ScriptFlags(1 << 9);
    pub const CHECK_SEQUENCE_VERIFY: ScriptFlags = ScriptFlags(1 << 10);
    /// Fail on NOP1 and NOP4..NOP10.
    pub const DISCOURAGE_UPGRADABLE_NOPS: ScriptFlags = ScriptFlags(1 << 11);
    /// Signatures must carry SIGHASH_FORKID and use the replay-protected digest.
    pub const ENABLE_SIGHASH_FORKID: ScriptFlags = ScriptFlags(1 << 12);
    /// Enable CAT, SPLIT, AND, OR, XOR, DIV, MOD, NUM2BIN and BIN2NUM.
    pub const ENABLE_MONOLITH_OPCODES: ScriptFlags = ScriptFlags(1 << 13);
    /// Enable CHECKDATASIG and CHECKDATASIGVERIFY.
    pub const ENABLE_CHECKDATASIG: ScriptFlags = ScriptFlags(1 << 14);

    /// Rules every valid block must follow.
    ///
    /// Includes `SIG_PUSH_ONLY` and `CLEAN_STACK`, so a spend passes only
    /// with a push-only unlocking script and exactly one true element left.
    /// Presets without `CLEAN_STACK` accept extra items below a true top.
    pub const MANDATORY: ScriptFlags = ScriptFlags(
        Self::P2SH.0
            | Self::STRICT_ENCODING.0
            | Self::SIG_PUSH_ONLY.0
            | Self::CLEAN_STACK.0
            | Self::LOW_S.0
            | Self::NULL_FAIL.0
            | Self::CHECK_LOCK_TIME_VERIFY.0
            | Self::CHECK_SEQUENCE_VERIFY.0
            | Self::ENABLE_SIGHASH_FORKID.0
            | Self::ENABLE_MONOLITH_OPCODES.0
            | Self::ENABLE_CHECKDATASIG.0,
    );

    /// Relay policy: mandatory rules plus malleability and upgrade guards.
    pub const STANDARD: ScriptFlags = ScriptFlags(
        Self::MANDATORY.0
            | Self::DER_SIGNATURES.0
            | Self::NULL_DUMMY.0
            | Self::MINIMAL_DATA.0
            | Self::DISCOURAGE_UPGRADABLE_NOPS.0,
    );

    pub fn has_flag(self, flag: ScriptFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn has_any(self, flags: &[ScriptFlags]) -> bool {
        flags.iter().any(|f| self.has_flag(*f))
    }

    pub fn add_flag(&mut self, flag: ScriptFlags) {
        self.0 |= flag.0;
    }

    pub fn remove_flag(&mut self, flag: ScriptFlags) {
        self.0 &= !flag.0;
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScriptFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        ScriptFlags(self.0 & rhs.0)
    }
}
