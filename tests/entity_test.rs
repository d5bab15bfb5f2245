mod common;

use common::*;
use spotmirror::cache::{
    CacheError, CacheSettings, DUMMY_ID, EntityKind, NO_IMAGE, SqlValue, SqliteStore, Store,
    SubResource, drain_queues,
    entity::{self, Album, Artist, Entity, Genre, Playlist, Source, Track, User, load_entity, load_hydrated},
    store::list_value,
};

fn stored_list(store: &SqliteStore, kind: EntityKind, id: &str, column: &str) -> Vec<String> {
    let value = store
        .get_column(kind, id, column)
        .unwrap()
        .unwrap_or(SqlValue::Null);
    list_value(kind, column, &value).unwrap()
}

fn count(store: &SqliteStore, kind: EntityKind) -> usize {
    store
        .counts()
        .unwrap()
        .into_iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, n)| n)
        .unwrap_or(0)
}

fn seed_single_track(remote: &FakeRemote) {
    remote.add(EntityKind::Track, track("T1", "Song", "A1", &["AR1"], 180_000));
    remote.add(EntityKind::Album, album("A1", "Record", &["AR1"], 1, &[]));
    remote.add(EntityKind::Artist, artist("AR1", "Band", &["rock"], 42));
    remote.add_items(
        SubResource::AlbumTracks,
        "A1",
        vec![track("T1", "Song", "A1", &["AR1"], 180_000)],
    );
}

#[tokio::test]
async fn test_track_crawl_caches_album_and_artist() {
    let remote = FakeRemote::new();
    seed_single_track(&remote);
    let mut ctx = context(remote);

    let track: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    assert_eq!(track.name(), "Song");
    assert_eq!(track.duration(), 180_000);
    assert!(track.is_hydrated());
    assert!(ctx.queues.contains(EntityKind::Album, "A1"));
    assert!(ctx.queues.contains(EntityKind::Artist, "AR1"));

    let report = drain_queues(&mut ctx).await.unwrap();
    assert_eq!(report.hydrated, 2);
    assert!(report.failed.is_empty());
    assert!(ctx.queues.is_empty());

    assert_eq!(count(&ctx.store, EntityKind::Track), 1);
    assert_eq!(count(&ctx.store, EntityKind::Album), 1);
    assert_eq!(count(&ctx.store, EntityKind::Artist), 1);
    assert_eq!(count(&ctx.store, EntityKind::Genre), 1);

    assert_eq!(stored_list(&ctx.store, EntityKind::Album, "A1", "track_ids"), vec!["T1"]);
    assert_eq!(stored_list(&ctx.store, EntityKind::Album, "A1", "artist_ids"), vec!["AR1"]);
    assert_eq!(stored_list(&ctx.store, EntityKind::Artist, "AR1", "genre_names"), vec!["rock"]);
}

#[tokio::test]
async fn test_cache_hit_makes_no_remote_calls() {
    let remote = FakeRemote::new();
    seed_single_track(&remote);
    let mut ctx = context(remote);

    let _: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    let calls = ctx.remote.total_calls();
    let images = ctx.remote.image_calls.get();

    let mut again: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    assert_eq!(ctx.remote.total_calls(), calls);
    assert_eq!(ctx.remote.image_calls.get(), images);
    assert!(again.is_hydrated());
    assert_eq!(again.artist_ids(&mut ctx).unwrap(), ["AR1".to_string()]);
    assert_eq!(again.album_ids(&mut ctx).unwrap(), ["A1".to_string()]);
    assert_eq!(count(&ctx.store, EntityKind::Track), 1);
}

#[tokio::test]
async fn test_eager_fields_are_stored_on_first_load() {
    let remote = FakeRemote::new();
    seed_single_track(&remote);
    let mut ctx = context(remote);

    let track: Track = load_entity(&mut ctx, Source::Id("T1")).await.unwrap();
    assert!(!track.is_hydrated());
    assert_eq!(track.popularity(), 20);
    assert_eq!(track.url(), "https://open.spotify.com/track/T1");
    assert_eq!(track.uri(), "spotify:track:T1");
    assert_ne!(track.image(), NO_IMAGE);

    let row = ctx.store.get(EntityKind::Track, "T1").unwrap().unwrap();
    assert_eq!(row["duration"], SqlValue::Integer(180_000));
    assert_eq!(row["hydrated"], SqlValue::Integer(0));
    // Lazy relations stay empty until hydration.
    assert!(stored_list(&ctx.store, EntityKind::Track, "T1", "artist_ids").is_empty());
    assert!(ctx.queues.is_empty());
}

#[tokio::test]
async fn test_unhydrated_row_is_rebuilt_from_stored_payload() {
    let remote = FakeRemote::new();
    seed_single_track(&remote);
    let mut ctx = context(remote);

    let _: Track = load_entity(&mut ctx, Source::Id("T1")).await.unwrap();
    let calls = ctx.remote.total_calls();

    let mut cached = Track::load(&mut ctx, Source::Id("T1")).await.unwrap();
    assert!(!cached.is_hydrated());
    assert_eq!(cached.artist_ids(&mut ctx).unwrap(), ["AR1".to_string()]);
    assert_eq!(ctx.remote.total_calls(), calls);
    assert!(ctx.queues.contains(EntityKind::Artist, "AR1"));
    assert_eq!(stored_list(&ctx.store, EntityKind::Track, "T1", "artist_ids"), vec!["AR1"]);
}

#[tokio::test]
async fn test_playlist_tracks_are_read_in_pages() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::Playlist, playlist("P1", "Mix", "U1", 143));
    let items: Vec<_> = (0..143)
        .map(|i| item(track(&format!("T{:03}", i), "Song", "A1", &["AR1"], 1_000)))
        .collect();
    remote.add_items(SubResource::PlaylistTracks, "P1", items);
    let mut ctx = context(remote);

    let mut playlist: Playlist = load_hydrated(&mut ctx, Source::Id("P1")).await.unwrap();
    assert_eq!(ctx.remote.page_calls.get(), 2);
    assert_eq!(playlist.track_count(), 143);
    assert_eq!(playlist.owner_id(), Some("U1"));
    assert_eq!(playlist.track_ids(&mut ctx).await.unwrap().len(), 143);
    assert_eq!(playlist.total_duration(&mut ctx).await.unwrap(), 143_000);
    assert_eq!(playlist.image(), NO_IMAGE);

    assert_eq!(ctx.queues.len(EntityKind::Track), 143);
    assert!(ctx.queues.contains(EntityKind::User, "U1"));
    // Artists are only reached through the tracks.
    assert_eq!(ctx.queues.len(EntityKind::Artist), 0);
}

#[tokio::test]
async fn test_playlist_skips_null_tracks() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::Playlist, playlist("P1", "Mix", "U1", 3));
    remote.add_items(
        SubResource::PlaylistTracks,
        "P1",
        vec![
            item(track("T1", "One", "A1", &["AR1"], 1_000)),
            serde_json::json!({ "track": null }),
            item(track("T2", "Two", "A1", &["AR1"], 2_000)),
        ],
    );
    let mut ctx = context(remote);

    let mut playlist: Playlist = load_hydrated(&mut ctx, Source::Id("P1")).await.unwrap();
    assert_eq!(
        playlist.track_ids(&mut ctx).await.unwrap(),
        ["T1".to_string(), "T2".to_string()]
    );
    assert_eq!(playlist.total_duration(&mut ctx).await.unwrap(), 3_000);
}

#[tokio::test]
async fn test_playlist_hydration_back_references_cached_tracks() {
    let remote = FakeRemote::new();
    seed_single_track(&remote);
    remote.add(EntityKind::Playlist, playlist("P1", "Mix", "U1", 1));
    remote.add_items(
        SubResource::PlaylistTracks,
        "P1",
        vec![item(track("T1", "Song", "A1", &["AR1"], 180_000))],
    );
    let mut ctx = context(remote);

    let _: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    drain_queues(&mut ctx).await.unwrap();
    let _: Playlist = load_hydrated(&mut ctx, Source::Id("P1")).await.unwrap();

    let track: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    assert_eq!(track.playlist_ids(&ctx.store).unwrap(), vec!["P1"]);
    let artist: Artist = load_hydrated(&mut ctx, Source::Id("AR1")).await.unwrap();
    assert_eq!(artist.playlist_ids(&ctx.store).unwrap(), vec!["P1"]);
}

#[tokio::test]
async fn test_album_records_genres_and_duration() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::Album, album("A1", "Record", &["AR1", "AR2"], 2, &["jazz", "soul"]));
    remote.add_items(
        SubResource::AlbumTracks,
        "A1",
        vec![
            track("T1", "One", "A1", &["AR1"], 100_000),
            track("T2", "Two", "A1", &["AR2"], 50_000),
        ],
    );
    let mut ctx = context(remote);

    let mut album: Album = load_hydrated(&mut ctx, Source::Id("A1")).await.unwrap();
    assert_eq!(album.track_count(), 2);
    assert_eq!(album.total_duration(&mut ctx).await.unwrap(), 150_000);
    assert_eq!(album.genre_names(&mut ctx).unwrap(), ["jazz".to_string(), "soul".to_string()]);
    assert_eq!(album.artist_ids(&mut ctx).unwrap().len(), 2);

    let jazz = Genre::load(&ctx.store, "jazz").unwrap().unwrap();
    assert_eq!(jazz.popularity, 20);
    assert!(!jazz.blacklisted);
    assert_eq!(ctx.queues.len(EntityKind::Track), 2);
    assert_eq!(ctx.queues.len(EntityKind::Artist), 2);
}

#[tokio::test]
async fn test_top_items_only_for_current_user() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::User, user("U1", "Me"));
    remote.add(EntityKind::User, user("U2", "Someone"));
    remote.add_items(
        SubResource::UserTopArtists,
        "U1",
        vec![
            artist("AR1", "One", &["rock", "pop"], 1),
            artist("AR2", "Two", &["pop"], 1),
        ],
    );
    remote.add_items(
        SubResource::UserTopTracks,
        "U1",
        vec![track("T1", "Song", "A1", &["AR1"], 1_000)],
    );
    let settings = CacheSettings {
        current_user: Some("U1".to_string()),
        ..CacheSettings::default()
    };
    let mut ctx = context_with(remote, settings);

    let mut me: User = load_hydrated(&mut ctx, Source::Id("U1")).await.unwrap();
    assert_eq!(me.name(), "Me");
    assert_eq!(me.follower_count(), 3);
    assert_eq!(
        me.top_genre_names(&mut ctx).await.unwrap(),
        ["pop".to_string(), "rock".to_string()]
    );
    assert_eq!(me.top_track_ids(&mut ctx).await.unwrap(), ["T1".to_string()]);
    assert_eq!(me.top_artist_ids(&mut ctx).await.unwrap().len(), 2);

    let mut other: User = load_hydrated(&mut ctx, Source::Id("U2")).await.unwrap();
    assert!(other.top_track_ids(&mut ctx).await.unwrap().is_empty());
    assert!(other.top_artist_ids(&mut ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_popularity_and_blacklist_updates() {
    let remote = FakeRemote::new();
    seed_single_track(&remote);
    let mut ctx = context(remote);

    let mut track: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    assert_eq!(
        entity::adjust_popularity(&ctx.store, EntityKind::Track, "T1", -2).unwrap(),
        Some(18)
    );
    assert_eq!(
        entity::adjust_popularity(&ctx.store, EntityKind::Track, "missing", 1).unwrap(),
        None
    );

    track.set_blacklisted(&ctx.store, true).unwrap();
    assert!(entity::is_blacklisted(&ctx.store, EntityKind::Track, "T1").unwrap());
    assert!(!entity::is_blacklisted(&ctx.store, EntityKind::Track, "missing").unwrap());

    let reloaded: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    assert_eq!(reloaded.popularity(), 18);
    assert!(reloaded.is_blacklisted());
}

#[tokio::test]
async fn test_dummy_id_is_never_a_result() {
    let mut ctx = context(FakeRemote::new());

    let result: Result<Track, _> = load_entity(&mut ctx, Source::Id(DUMMY_ID)).await;
    assert!(matches!(result, Err(CacheError::DummyId { kind: EntityKind::Track })));
    assert!(!ctx.schedule(EntityKind::Album, DUMMY_ID).unwrap());
    assert_eq!(ctx.remote.total_calls(), 0);

    // The sentinel row exists but is never counted or projected.
    assert!(ctx.store.contains(EntityKind::Track, DUMMY_ID).unwrap());
    assert_eq!(count(&ctx.store, EntityKind::Track), 0);
    assert!(ctx.store.project(EntityKind::Track, "name").unwrap().is_empty());
}

#[tokio::test]
async fn test_sparse_payload_gets_placeholder_and_empty_lists() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::Track, serde_json::json!({ "id": "T9", "name": "Bare" }));
    let mut ctx = context(remote);

    let mut track: Track = load_hydrated(&mut ctx, Source::Id("T9")).await.unwrap();
    assert_eq!(track.image(), NO_IMAGE);
    assert_eq!(track.uri(), "spotify:track:T9");
    assert_eq!(track.url(), "");
    assert_eq!(track.duration(), 0);
    assert!(track.artist_ids(&mut ctx).unwrap().is_empty());
    assert!(track.album_ids(&mut ctx).unwrap().is_empty());
    assert_eq!(ctx.remote.image_calls.get(), 0);
}

#[tokio::test]
async fn test_broken_artwork_falls_back_to_placeholder() {
    let remote = FakeRemote::new();
    let mut payload = artist("AR1", "Band", &[], 1);
    payload["images"] = images("https://i.scdn.co/image/broken");
    remote.add(EntityKind::Artist, payload);
    let mut ctx = context(remote);

    let artist: Artist = load_hydrated(&mut ctx, Source::Id("AR1")).await.unwrap();
    assert_eq!(artist.image(), NO_IMAGE);
    assert_eq!(ctx.remote.image_calls.get(), 1);
}

#[tokio::test]
async fn test_payload_without_id_is_rejected() {
    let mut ctx = context(FakeRemote::new());
    let result: Result<Album, _> = load_entity(
        &mut ctx,
        Source::Payload(serde_json::json!({ "name": "no id" })),
    )
    .await;
    assert!(matches!(result, Err(CacheError::MalformedPayload { .. })));
}

#[tokio::test]
async fn test_failed_hydration_leaves_no_row() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::Playlist, playlist("P1", "Mix", "U1", 10));
    remote.fail_pages(SubResource::PlaylistTracks, "P1");
    let mut ctx = context(remote);

    let result: Result<Playlist, _> = load_hydrated(&mut ctx, Source::Id("P1")).await;
    assert!(matches!(result, Err(CacheError::RemoteFetchFailed { .. })));
    assert!(!ctx.store.contains(EntityKind::Playlist, "P1").unwrap());
}

#[tokio::test]
async fn test_missing_remote_object_is_a_fetch_error() {
    let mut ctx = context(FakeRemote::new());
    let result: Result<Track, _> = load_entity(&mut ctx, Source::Id("nope")).await;
    match result {
        Err(CacheError::RemoteFetchFailed { kind, id, .. }) => {
            assert_eq!(kind, EntityKind::Track);
            assert_eq!(id, "nope");
        }
        other => panic!("unexpected result: {:?}", other.map(|t| t.id().to_string())),
    }
    assert_eq!(count(&ctx.store, EntityKind::Track), 0);
}

#[test]
fn test_genre_rows_are_local() {
    let store = SqliteStore::open_in_memory().unwrap();

    assert!(Genre::ensure(&store, "shoegaze", 20).unwrap());
    assert!(!Genre::ensure(&store, "shoegaze", 20).unwrap());
    assert!(!Genre::ensure(&store, "  ", 20).unwrap());
    assert!(Genre::load(&store, "polka").unwrap().is_none());

    let mut genre = Genre::load(&store, "shoegaze").unwrap().unwrap();
    assert_eq!(genre.bounds, entity::AudioFeatureBounds::default());
    assert_eq!(genre.popularity, 20);

    let mut bounds = entity::AudioFeatureBounds::default();
    bounds.energy = entity::FeatureRange::new(0.6, 0.9);
    bounds.tempo = entity::FeatureRange::new(90.0, 140.0);
    genre.set_bounds(&store, bounds).unwrap();
    genre.adjust_popularity(&store, -3).unwrap();
    genre.set_blacklisted(&store, true).unwrap();

    let reloaded = Genre::load(&store, "shoegaze").unwrap().unwrap();
    assert_eq!(reloaded, genre);
    assert!(reloaded.bounds.energy.contains(0.75));
    assert!(!reloaded.bounds.tempo.contains(160.0));
    assert_eq!(reloaded.popularity, 17);
    assert!(reloaded.blacklisted);
}

#[tokio::test]
async fn test_popularity_deltas_accumulate() {
    let remote = FakeRemote::new();
    seed_single_track(&remote);
    let mut ctx = context(remote);

    let mut track: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    assert_eq!(track.popularity(), 20);
    assert_eq!(track.adjust_popularity(&ctx.store, -2).unwrap(), 18);
    assert_eq!(track.adjust_popularity(&ctx.store, 1).unwrap(), 19);
    assert_eq!(track.adjust_popularity(&ctx.store, -1).unwrap(), 18);

    let reloaded: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    assert_eq!(reloaded.popularity(), 18);
}

#[tokio::test]
async fn test_popularity_adjustment_keeps_concurrent_updates() {
    let remote = FakeRemote::new();
    seed_single_track(&remote);
    let mut ctx = context(remote);

    let mut track: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    // A listen recorded elsewhere while this entity is held.
    entity::adjust_popularity(&ctx.store, EntityKind::Track, "T1", -2).unwrap();

    assert_eq!(track.adjust_popularity(&ctx.store, 1).unwrap(), 19);
    assert_eq!(track.popularity(), 19);
    assert_eq!(
        ctx.store.get_column(EntityKind::Track, "T1", "popularity").unwrap(),
        Some(SqlValue::Integer(19))
    );

    Genre::ensure(&ctx.store, "rock", 20).unwrap();
    let mut genre = Genre::load(&ctx.store, "rock").unwrap().unwrap();
    entity::adjust_popularity(&ctx.store, EntityKind::Genre, "rock", 5).unwrap();
    assert_eq!(genre.adjust_popularity(&ctx.store, -1).unwrap(), 24);
}

#[tokio::test]
async fn test_initial_popularity_comes_from_settings() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::Album, album("A1", "Record", &["AR1"], 0, &["jazz"]));
    let settings = CacheSettings {
        initial_popularity: 50,
        ..CacheSettings::default()
    };
    let mut ctx = context_with(remote, settings);

    let album: Album = load_hydrated(&mut ctx, Source::Id("A1")).await.unwrap();
    assert_eq!(album.popularity(), 50);
    assert_eq!(
        ctx.store.get_column(EntityKind::Album, "A1", "popularity").unwrap(),
        Some(SqlValue::Integer(50))
    );
    assert_eq!(Genre::load(&ctx.store, "jazz").unwrap().unwrap().popularity, 50);
}

#[tokio::test]
async fn test_playlist_skips_podcast_episodes() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::Playlist, playlist("P1", "Mix", "U1", 2));
    remote.add_items(
        SubResource::PlaylistTracks,
        "P1",
        vec![
            item(track("T1", "Song", "A1", &["AR1"], 2_000)),
            item(serde_json::json!({
                "id": "E1",
                "type": "episode",
                "name": "Episode",
                "uri": "spotify:episode:E1",
                "duration_ms": 600_000,
            })),
        ],
    );
    let mut ctx = context(remote);

    let mut playlist: Playlist = load_hydrated(&mut ctx, Source::Id("P1")).await.unwrap();
    assert_eq!(playlist.track_ids(&mut ctx).await.unwrap(), ["T1".to_string()]);
    assert_eq!(playlist.total_duration(&mut ctx).await.unwrap(), 2_000);
    assert_eq!(ctx.queues.snapshot(EntityKind::Track), vec!["T1"]);
    assert!(!ctx.queues.contains(EntityKind::Track, "E1"));
}
