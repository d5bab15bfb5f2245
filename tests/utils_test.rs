use spotmirror::cache::EntityKind;
use spotmirror::utils::*;

const TRACK_ID: &str = "4uLU6hMCjMI75M1A2tKUQC";

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier();

    // Should be exactly 128 characters
    assert_eq!(verifier.len(), 128);

    // Should contain only alphanumeric characters
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated verifiers should be different
    let verifier2 = generate_code_verifier();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    // Should be deterministic - same input produces same output
    assert_eq!(challenge, generate_code_challenge(verifier));

    // Different input should produce different output
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    // SHA-256 digest, base64 without padding
    assert_eq!(challenge.len(), 43);
    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_is_valid_id() {
    assert!(is_valid_id(TRACK_ID));
    assert!(!is_valid_id("4uLU6hMCjMI75M1A2tKUQ"));
    assert!(!is_valid_id("4uLU6hMCjMI75M1A2tKUQC1"));
    assert!(!is_valid_id("4uLU6hMCjMI75M1A2tKU-C"));
    assert!(!is_valid_id(""));
}

#[test]
fn test_uri_to_id() {
    assert_eq!(
        uri_to_id(&format!("spotify:track:{}", TRACK_ID)).as_deref(),
        Some(TRACK_ID)
    );
    assert_eq!(uri_to_id(TRACK_ID).as_deref(), Some(TRACK_ID));
    // User ids are free-form.
    assert_eq!(uri_to_id("spotify:user:some.user").as_deref(), Some("some.user"));

    assert_eq!(uri_to_id("spotify:track:short"), None);
    assert_eq!(uri_to_id("spotify:user:"), None);
    assert_eq!(uri_to_id("not a uri"), None);
}

#[test]
fn test_id_to_uri_and_parse_uri() {
    let uri = id_to_uri(EntityKind::Album, TRACK_ID);
    assert_eq!(uri, format!("spotify:album:{}", TRACK_ID));
    assert_eq!(parse_uri(&uri), Some((EntityKind::Album, TRACK_ID.to_string())));

    assert_eq!(parse_uri("spotify:unknown:abc"), None);
    assert_eq!(parse_uri("spotify:track:"), None);
    assert_eq!(parse_uri("http:track:abc"), None);
}

#[test]
fn test_url_to_uri() {
    assert_eq!(
        url_to_uri(&format!("https://open.spotify.com/track/{}", TRACK_ID)),
        Some(format!("spotify:track:{}", TRACK_ID))
    );
    assert_eq!(
        url_to_uri(&format!(
            "https://open.spotify.com/intl-de/playlist/{}?si=abc123",
            TRACK_ID
        )),
        Some(format!("spotify:playlist:{}", TRACK_ID))
    );

    assert_eq!(url_to_uri("https://example.com/track/abc"), None);
    assert_eq!(url_to_uri("https://open.spotify.com/"), None);
    assert_eq!(url_to_uri("https://open.spotify.com/podcast/abc"), None);
}

#[test]
fn test_normalize_uri() {
    let uri = format!("spotify:artist:{}", TRACK_ID);
    assert_eq!(normalize_uri(&uri), Some(uri.clone()));
    assert_eq!(
        normalize_uri(&format!("https://open.spotify.com/artist/{}#top", TRACK_ID)),
        Some(uri)
    );
    assert_eq!(normalize_uri("spotify:nothing"), None);
}

#[test]
fn test_millis_to_minutes() {
    assert_eq!(millis_to_minutes(0), "0:00");
    assert_eq!(millis_to_minutes(59_999), "0:59");
    assert_eq!(millis_to_minutes(61_000), "1:01");
    assert_eq!(millis_to_minutes(3_725_000), "62:05");
}

#[test]
fn test_split_into_chunks() {
    let items: Vec<u32> = (1..=7).collect();

    let chunks = split_into_chunks(&items, 3);
    assert_eq!(chunks, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);

    // A zero size behaves like one.
    assert_eq!(split_into_chunks(&items, 0).len(), 7);
    assert!(split_into_chunks::<u32>(&[], 3).is_empty());
}
