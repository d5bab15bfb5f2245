use serde_json::json;
use spotmirror::organize::*;

fn song(n: u32, name: &str, artist: &str) -> CollectionTrack {
    CollectionTrack {
        uri: format!("spotify:track:T{}", n),
        name: name.to_string(),
        artist_id: Some(artist.to_string()),
    }
}

fn sample() -> Vec<CollectionTrack> {
    vec![
        song(1, "Intro", "AR1"),
        song(2, "Song", "AR1"),
        song(3, "Song (Live)", "AR1"),
        song(4, "SONG", "AR1"),
        song(5, "Song", "AR2"),
        song(6, "Outro - Remastered", "AR2"),
    ]
}

fn uris(tracks: &[CollectionTrack]) -> Vec<&str> {
    tracks.iter().map(|t| t.uri.as_str()).collect()
}

#[test]
fn test_collection_track_from_payload() {
    let track = CollectionTrack::from_payload(&json!({
        "uri": "spotify:track:T1",
        "name": "Song",
        "artists": [{ "id": "AR1" }, { "id": "AR2" }]
    }))
    .unwrap();
    assert_eq!(track, song(1, "Song", "AR1"));

    // Local files and episodes are not tracks.
    assert!(CollectionTrack::from_payload(&json!({ "uri": "spotify:local:a:b:c:1" })).is_none());
    assert!(CollectionTrack::from_payload(&json!({ "uri": "spotify:episode:E1" })).is_none());
    assert!(CollectionTrack::from_payload(&json!({ "name": "no uri" })).is_none());
}

#[test]
fn test_remove_duplicates_keeps_first_occurrence() {
    let mut tracks = sample();
    remove_duplicates(&mut tracks);
    // T4 repeats T2 ignoring case; T5 has another artist.
    assert_eq!(
        uris(&tracks),
        vec![
            "spotify:track:T1",
            "spotify:track:T2",
            "spotify:track:T3",
            "spotify:track:T5",
            "spotify:track:T6"
        ]
    );
}

#[test]
fn test_remove_patterns_ignore_case() {
    let options = OrganizeOptions::new(false, false, &["\\(live\\)".to_string(), "remaster".to_string()])
        .unwrap();
    let mut tracks = sample();
    options.apply(&mut tracks);
    assert_eq!(
        uris(&tracks),
        vec![
            "spotify:track:T1",
            "spotify:track:T2",
            "spotify:track:T4",
            "spotify:track:T5"
        ]
    );
}

#[test]
fn test_invalid_pattern_is_rejected() {
    assert!(OrganizeOptions::new(true, false, &["(unclosed".to_string()]).is_err());
}

#[test]
fn test_apply_without_shuffle_preserves_order() {
    let options = OrganizeOptions::new(false, true, &[]).unwrap();
    let mut tracks = sample();
    options.apply(&mut tracks);
    assert_eq!(tracks.len(), 5);
    assert_eq!(tracks[0].uri, "spotify:track:T1");
    assert_eq!(tracks[4].uri, "spotify:track:T6");
}

#[test]
fn test_shuffle_keeps_every_track() {
    let options = OrganizeOptions::new(true, true, &["intro".to_string()]).unwrap();
    let mut tracks = sample();
    options.apply(&mut tracks);

    let mut shuffled = uris(&tracks);
    shuffled.sort();
    assert_eq!(
        shuffled,
        vec![
            "spotify:track:T2",
            "spotify:track:T3",
            "spotify:track:T5",
            "spotify:track:T6"
        ]
    );
}

#[test]
fn test_shuffled_suffix() {
    assert_eq!(format!("Road Trip{}", SHUFFLED_SUFFIX), "Road Trip (Shuffled)");
}
