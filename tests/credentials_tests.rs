use blog_api::credentials::{Claims, CredentialService};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::Duration;
use uuid::Uuid;

const TEST_SECRET: &[u8] = b"a-test-secret-that-is-long-enough-for-hs256";

fn service() -> CredentialService {
    CredentialService::new(TEST_SECRET, Duration::from_secs(3600))
}

fn now() -> usize {
    chrono::Utc::now().timestamp() as usize
}

#[test]
fn test_issued_token_round_trips_to_the_same_user() {
    let credentials = service();
    let user_id = Uuid::new_v4();

    let token = credentials.issue_token(user_id).unwrap();

    assert!(credentials.verify_token(&token));
    assert_eq!(credentials.decode_token(&token).unwrap().id, user_id);
}

#[test]
fn test_token_signed_with_another_key_is_rejected() {
    let issuer = CredentialService::new(b"some-other-secret-of-sufficient-length", Duration::from_secs(60));
    let token = issuer.issue_token(Uuid::new_v4()).unwrap();

    let credentials = service();
    assert!(!credentials.verify_token(&token));
    assert!(credentials.decode_token(&token).is_err());
}

#[test]
fn test_expired_token_is_rejected() {
    // Well outside the default 60s leeway.
    let claims = Claims {
        sub: Uuid::new_v4(),
        iat: now() - 7200,
        exp: now() - 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET),
    )
    .unwrap();

    let credentials = service();
    assert!(!credentials.verify_token(&token));
    assert!(credentials.decode_token(&token).is_err());
}

#[test]
fn test_garbage_tokens_are_rejected() {
    let credentials = service();
    for token in ["", "not-a-jwt", "a.b.c", "eyJhbGciOiJIUzI1NiJ9.e30."] {
        assert!(!credentials.verify_token(token), "accepted {token:?}");
    }
}

#[test]
fn test_tampered_token_is_rejected() {
    let credentials = service();
    let token = credentials.issue_token(Uuid::new_v4()).unwrap();

    let mut parts: Vec<&str> = token.split('.').collect();
    let forged_claims = Claims {
        sub: Uuid::new_v4(),
        iat: now(),
        exp: now() + 3600,
    };
    let forged = encode(
        &Header::default(),
        &forged_claims,
        &EncodingKey::from_secret(b"attacker-key-attacker-key-attacker"),
    )
    .unwrap();
    let forged_payload = forged.split('.').nth(1).unwrap().to_string();
    parts[1] = &forged_payload;

    assert!(!credentials.verify_token(&parts.join(".")));
}

#[test]
fn test_hashing_is_salted_and_verifiable() {
    let credentials = service();

    let first = credentials.hash_password("hunter22").unwrap();
    let second = credentials.hash_password("hunter22").unwrap();

    assert_ne!(first, second);
    assert!(first.starts_with("$argon2id$"));
    assert!(credentials.verify_password("hunter22", &first));
    assert!(credentials.verify_password("hunter22", &second));
    assert!(!credentials.verify_password("hunter23", &first));
}

#[test]
fn test_unparsable_stored_hash_never_matches() {
    let credentials = service();
    assert!(!credentials.verify_password("anything", "plaintext-in-the-db"));
}
