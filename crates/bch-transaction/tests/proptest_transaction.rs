use proptest::prelude::*;

use bch_primitives::ec::PrivateKey;
use bch_script::interpreter::ScriptFlags;
use bch_script::Script;
use bch_transaction::sighash::{self, SIGHASH_ANYONECANPAY, SIGHASH_FORKID, SIGHASH_SINGLE};
use bch_transaction::template::p2pkh;
use bch_transaction::{verify_input, Transaction, TransactionInput, TransactionOutput};

/// Strategy to generate a random transaction.
fn arb_transaction() -> impl Strategy<Value = Transaction> {
    let arb_input = (
        prop::array::uniform32(any::<u8>()),
        any::<u32>(),
        prop::collection::vec(any::<u8>(), 0..64),
        any::<u32>(),
    )
        .prop_map(|(hash, idx, script_bytes, seq)| {
            let mut input = TransactionInput::new(hash, idx);
            input.unlocking_script = Script::from_bytes(&script_bytes);
            input.sequence_number = seq;
            input
        });

    let arb_output = (any::<u64>(), prop::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(satoshis, script_bytes)| {
            TransactionOutput::new(satoshis, Script::from_bytes(&script_bytes))
        });

    (
        any::<u32>(),
        prop::collection::vec(arb_input, 1..4),
        prop::collection::vec(arb_output, 1..4),
        any::<u32>(),
    )
        .prop_map(|(version, inputs, outputs, lock_time)| {
            let mut tx = Transaction::new();
            tx.version = version;
            tx.lock_time = lock_time;
            for i in inputs {
                tx.add_input(i);
            }
            for o in outputs {
                tx.add_output(o);
            }
            tx
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transaction_serialize_deserialize_roundtrip(tx in arb_transaction()) {
        let bytes = tx.to_bytes();
        let tx2 = Transaction::from_bytes(&bytes).unwrap();
        prop_assert_eq!(tx2, tx);
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = Transaction::from_bytes(&data);
    }

    #[test]
    fn sighash_is_total_for_valid_indices(tx in arb_transaction(), flag in any::<u8>(), sats in any::<u64>()) {
        let flag = u32::from(flag);
        for idx in 0..tx.input_count() {
            let single_without_output =
                flag & 0x1f == SIGHASH_SINGLE && idx >= tx.output_count();
            let result = sighash::signature_hash(&tx, idx, &[0x51], flag, sats);
            prop_assert_eq!(result.is_ok(), !single_without_output);
        }
    }

    #[test]
    fn single_anyone_can_pay_ignores_other_outputs(
        tx in arb_transaction(),
        extra in any::<u64>(),
        forkid in any::<bool>()
    ) {
        let mut flag = SIGHASH_SINGLE | SIGHASH_ANYONECANPAY;
        if forkid {
            flag |= SIGHASH_FORKID;
        }
        let digest = sighash::signature_hash(&tx, 0, &[0x51], flag, 1).unwrap();
        let mut changed = tx.clone();
        changed.add_output(TransactionOutput::new(extra, Script::new()));
        prop_assert_eq!(sighash::signature_hash(&changed, 0, &[0x51], flag, 1).unwrap(), digest);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn signed_p2pkh_verifies(
        key_bytes in prop::array::uniform32(1u8..=0x7f),
        satoshis in 1u64..21_000_000_00000000,
        pay in 1u64..1_000_000
    ) {
        let key = PrivateKey::from_bytes(&key_bytes).unwrap();
        let prev = TransactionOutput::new(satoshis, p2pkh::lock_to_key(&key));

        let mut tx = Transaction::new();
        let mut input = TransactionInput::new(key_bytes, 0);
        input.set_source_output(Some(prev.clone()));
        tx.add_input(input);
        tx.add_output(TransactionOutput::new(pay, p2pkh::lock(&[0x42; 20])));

        tx.sign_input(0, &p2pkh::unlock(key, None)).unwrap();
        prop_assert!(verify_input(&tx, 0, &prev, ScriptFlags::STANDARD).is_ok());

        tx.outputs[0].satoshis += 1;
        prop_assert!(verify_input(&tx, 0, &prev, ScriptFlags::STANDARD).is_err());
    }
}
