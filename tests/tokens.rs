mod common;

use pip_tokens::codec::to_hex;
use pip_tokens::token::{
    self, hash_token, issue, issue_at, message, verify_claim, verify_claim_at, EXPIRY_HEX_LEN,
    TOKEN_TTL_MS,
};
use pip_tokens::{derive_service_key, ClaimResult, ServiceKeys};

use common::{CONTEXT, SEED};

fn flip_hex_char(s: &str, i: usize) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    chars[i] = if chars[i] == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}

#[test]
fn test_issue_and_claim_scenario() {
    let key = derive_service_key(SEED, CONTEXT).unwrap();
    let raw = [0xabu8; 32];
    let hashed = hash_token(&raw);
    assert_eq!(hashed.len(), 64);

    let issued = issue(&key, &hashed).unwrap();
    assert_eq!(issued.expiry_hex.len(), EXPIRY_HEX_LEN);
    assert_eq!(issued.signature_hex.len(), 64);

    let full = format!("{}{}", issued.expiry_hex, to_hex(raw));
    assert_eq!(full.len(), 75);
    let nonce = to_hex(b"req-1");
    assert_eq!(nonce, "7265712d31");
    let mac = message(&issued.signature_hex, &nonce).unwrap();
    assert_eq!(mac.len(), 64);

    assert_eq!(verify_claim(&key, &full, &nonce, &mac), ClaimResult::Ok);
    for i in 0..mac.len() {
        assert_eq!(
            verify_claim(&key, &full, &nonce, &flip_hex_char(&mac, i)),
            ClaimResult::NotOk
        );
    }
}

#[test]
fn test_claim_integrity() {
    let key = derive_service_key(SEED, CONTEXT).unwrap();
    let raw = [0x5au8; 32];
    let issued = issue(&key, &hash_token(&raw)).unwrap();
    let full = format!("{}{}", issued.expiry_hex, to_hex(raw));
    let nonce = "00112233445566778899aabbccddeeff";
    let mac = message(&issued.signature_hex, nonce).unwrap();

    for i in 0..nonce.len() {
        assert_eq!(
            verify_claim(&key, &full, &flip_hex_char(nonce, i), &mac),
            ClaimResult::NotOk
        );
    }
    for i in EXPIRY_HEX_LEN..full.len() {
        assert_eq!(
            verify_claim(&key, &flip_hex_char(&full, i), nonce, &mac),
            ClaimResult::NotOk
        );
    }
    // a MAC keyed by anything but the issued signature
    let forged = message(&"00".repeat(32), nonce).unwrap();
    assert_eq!(verify_claim(&key, &full, nonce, &forged), ClaimResult::NotOk);
}

#[test]
fn test_expiry() {
    let key = derive_service_key(SEED, CONTEXT).unwrap();
    let raw = [1u8; 32];
    let now = 1_700_000_000_000;
    let issued = issue_at(&key, &hash_token(&raw), now).unwrap();
    assert_eq!(
        token::parse_expiry(&issued.expiry_hex).unwrap(),
        now + TOKEN_TTL_MS
    );
    let full = format!("{}{}", issued.expiry_hex, to_hex(raw));
    let mac = message(&issued.signature_hex, "ab").unwrap();

    assert_eq!(verify_claim_at(&key, &full, "ab", &mac, now), ClaimResult::Ok);
    assert_eq!(
        verify_claim_at(&key, &full, "ab", &mac, now + TOKEN_TTL_MS),
        ClaimResult::Ok
    );
    assert_eq!(
        verify_claim_at(&key, &full, "ab", &mac, now + TOKEN_TTL_MS + 1),
        ClaimResult::NotOk
    );

    // a token issued long ago, presented today
    let past = issue_at(&key, &hash_token(&raw), 0).unwrap();
    let full = format!("{}{}", past.expiry_hex, to_hex(raw));
    let mac = message(&past.signature_hex, "ab").unwrap();
    assert_eq!(verify_claim(&key, &full, "ab", &mac), ClaimResult::NotOk);
}

#[test]
fn test_forged_expiry_prefix() {
    let key = derive_service_key(SEED, CONTEXT).unwrap();
    let raw = [2u8; 32];
    let now = 1_700_000_000_000;
    let issued = issue_at(&key, &hash_token(&raw), now).unwrap();
    let mac = message(&issued.signature_hex, "cd").unwrap();
    let extended = format!("{}{}", "fffffffffff", to_hex(raw));
    assert_eq!(
        verify_claim_at(&key, &extended, "cd", &mac, now),
        ClaimResult::NotOk
    );
}

#[test]
fn test_deterministic_derivation() {
    let a = derive_service_key(SEED, CONTEXT).unwrap();
    let b = derive_service_key(SEED, CONTEXT).unwrap();
    assert_eq!(a.sign(b"same input"), b.sign(b"same input"));

    let hashed = hash_token(&[7u8; 32]);
    let x = issue_at(&a, &hashed, 42).unwrap();
    let y = issue_at(&b, &hashed, 42).unwrap();
    assert_eq!(x, y);

    let keys = ServiceKeys::new(SEED).unwrap();
    assert_eq!(keys.get(CONTEXT).unwrap(), a);
}

#[test]
fn test_context_separation() {
    let keys = ServiceKeys::new(SEED).unwrap();
    let a = keys.get(CONTEXT).unwrap();
    let b = keys.get("some-other-context").unwrap();
    let raw = [3u8; 32];
    let issued = issue(&a, &hash_token(&raw)).unwrap();
    let full = format!("{}{}", issued.expiry_hex, to_hex(raw));
    let mac = message(&issued.signature_hex, "01").unwrap();
    assert_eq!(verify_claim(&a, &full, "01", &mac), ClaimResult::Ok);
    assert_eq!(verify_claim(&b, &full, "01", &mac), ClaimResult::NotOk);
}

#[test]
fn test_concurrent_key_cache() {
    let keys = std::sync::Arc::new(ServiceKeys::new(SEED).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let keys = keys.clone();
            std::thread::spawn(move || keys.get(CONTEXT).unwrap())
        })
        .collect();
    let expected = derive_service_key(SEED, CONTEXT).unwrap();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
    assert_eq!(keys.cached(), 1);
}
