//! End-to-end decode and sign flows over an in-memory ledger.

use alloy_primitives::{Address, FixedBytes, U256};
use permit_client::{
    array_base_slot, build_and_sign, element_slot, permit2_domain, recover_address, Layout,
    LocalSigningKey, MemoryLedger, NonceBitmap, PackedField, PermissionMessage, ScalarKind,
    StorageDecoder, Value,
};

const PROGRAM: Address = Address::new([0x5f; 20]);
const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Element layout of the lesson contract's `_locks` array: a 20-byte owner
/// and an 8-byte timestamp packed into the first word, the amount alone in
/// the second.
fn locks_layout(declared_slot: U256) -> Layout {
    Layout::DynamicArray {
        declared_slot,
        element_words: vec![
            Layout::packed(vec![
                PackedField::new("user", 0, 20, ScalarKind::Address),
                PackedField::new("startTime", 20, 8, ScalarKind::Uint),
            ]),
            Layout::whole_word("amount", ScalarKind::Uint),
        ],
    }
}

fn uint_word(value: U256) -> FixedBytes<32> {
    FixedBytes(value.to_be_bytes::<32>())
}

fn lock_word(user: Address, start_time: u64) -> FixedBytes<32> {
    let mut buf = [0u8; 32];
    buf[..20].copy_from_slice(user.as_slice());
    buf[20..28].copy_from_slice(&start_time.to_be_bytes());
    FixedBytes(buf)
}

fn seeded_ledger() -> MemoryLedger {
    let mut ledger = MemoryLedger::new();
    // Length 3 at declared slot 0.
    ledger.set_word(PROGRAM, U256::ZERO, uint_word(U256::from(3u64)));

    let base = array_base_slot(U256::ZERO);
    for i in 0u64..3 {
        let user = Address::new([0x10 + i as u8; 20]);
        let start_time = 1_700_000_000 + i;
        let amount = U256::from(1_000u64 * (i + 1));

        let first = element_slot(base, i, 2);
        ledger.set_word(PROGRAM, first, lock_word(user, start_time));
        ledger.set_word(PROGRAM, first + U256::from(1u64), uint_word(amount));
    }
    ledger
}

#[tokio::test]
async fn decodes_a_packed_array_element_exactly() {
    let ledger = seeded_ledger();
    let decoder = StorageDecoder::new(&ledger, PROGRAM);

    let fields = decoder
        .decode_array_element(&locks_layout(U256::ZERO), 1)
        .await
        .unwrap();

    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0].name, "user");
    assert_eq!(fields[0].value, Value::Address(Address::new([0x11; 20])));
    assert_eq!(fields[1].name, "startTime");
    assert_eq!(fields[1].value, Value::Uint(U256::from(1_700_000_001u64)));
    assert_eq!(fields[2].name, "amount");
    assert_eq!(fields[2].value, Value::Uint(U256::from(2_000u64)));
}

#[tokio::test]
async fn decodes_the_whole_array_in_order() {
    let ledger = seeded_ledger();
    let decoder = StorageDecoder::new(&ledger, PROGRAM);

    let elements = decoder.decode_array(&locks_layout(U256::ZERO)).await.unwrap();
    assert_eq!(elements.len(), 3);
    for (i, fields) in elements.iter().enumerate() {
        assert_eq!(
            fields[0].value,
            Value::Address(Address::new([0x10 + i as u8; 20]))
        );
    }
}

#[tokio::test]
async fn empty_array_costs_exactly_one_read() {
    let ledger = MemoryLedger::new();
    let decoder = StorageDecoder::new(&ledger, PROGRAM);

    // Declared slot 5 was never written: remote length is 0.
    let elements = decoder.decode_array(&locks_layout(U256::from(5u64))).await.unwrap();
    assert!(elements.is_empty());
    assert_eq!(ledger.reads(), 1);
}

#[tokio::test]
async fn out_of_range_index_is_rejected_with_the_remote_length() {
    let ledger = seeded_ledger();
    let decoder = StorageDecoder::new(&ledger, PROGRAM);

    let err = decoder
        .decode_array_element(&locks_layout(U256::ZERO), 3)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("index 3"));
    assert!(err.to_string().contains('3'));
}

#[tokio::test]
async fn allocate_then_sign_produces_a_verifiable_permission() {
    let ledger = MemoryLedger::new();
    let key = LocalSigningKey::from_hex(DEV_KEY).unwrap();
    let owner = key.address().unwrap();

    let permit2 = Address::new([0x22; 20]);
    let bitmap = NonceBitmap::new(&ledger, permit2);
    let nonce = bitmap.find_unused_nonce(owner, 10).await.unwrap();

    let permission = PermissionMessage {
        token: Address::new([0x33; 20]),
        amount: U256::from(100u64),
        spender: Address::new([0x44; 20]),
        nonce,
        deadline: 1_700_003_600,
    };
    let domain = permit2_domain(31337, permit2);
    let signed = build_and_sign(&domain, &permission, &key).unwrap();

    assert_eq!(recover_address(&signed.digest, &signed.signature).unwrap(), owner);
}
