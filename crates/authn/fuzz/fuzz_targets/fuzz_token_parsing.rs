//! Fuzz target for token parsing and verification.
//!
//! Feeds arbitrary byte strings as tokens to the header and claims decoders
//! and to a live authority. Every result must be either `Ok(...)` or
//! `Err(AuthError)`, and a verification failure must classify as access
//! denied.

#![no_main]

use std::{sync::Arc, sync::LazyLock, time::Duration};

use gradeguard_authn::{
    TokenAuthority,
    token::{decode_token_claims, decode_token_header},
    validate_algorithm,
    validation::parse_kid,
};
use gradeguard_crypto::{KeyRing, KeyScope};
use gradeguard_storage::SystemClock;
use libfuzzer_sys::fuzz_target;

static AUTHORITY: LazyLock<TokenAuthority> = LazyLock::new(|| {
    let clock = Arc::new(SystemClock);
    let ring = Arc::new(KeyRing::new(KeyScope::Signing, clock.clone()));
    TokenAuthority::new("gradeguard-fuzz", ring, clock).expect("fuzz authority")
});

fuzz_target!(|data: &[u8]| {
    // Tokens are always UTF-8 strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(header) = decode_token_header(token) {
        let _ = validate_algorithm(&header.alg);
        if let Some(ref kid) = header.kid {
            let _ = parse_kid(kid);
        }
    }

    let _ = decode_token_claims(token);

    match AUTHORITY.verify(token) {
        Ok(_) => panic!("arbitrary input verified"),
        Err(err) => assert!(err.is_access_denied()),
    }

    // Issued tokens must round-trip for any non-empty subject
    if token.is_empty() {
        return;
    }
    let issued = AUTHORITY.issue(token, Duration::from_secs(60)).expect("issue");
    assert_eq!(AUTHORITY.verify(issued.as_str()).expect("verify"), token);
});
