mod common;

use common::*;
use spotmirror::cache::{
    EntityKind, SqlValue, Store, SubResource,
    discovery::record_relation,
    drain_queues,
    entity::{Playlist, Source, Track, load_entity, load_hydrated},
    store::list_value,
};

fn relation(ctx_store: &impl Store, kind: EntityKind, id: &str, column: &str) -> Vec<String> {
    let value = ctx_store
        .get_column(kind, id, column)
        .unwrap()
        .expect("row exists");
    list_value(kind, column, &value).unwrap()
}

#[tokio::test]
async fn test_record_relation_appends_once() {
    let mut ctx = context(FakeRemote::new());
    let _: Track = load_entity(&mut ctx, Source::Payload(track("T1", "Song", "A1", &["AR1"], 1)))
        .await
        .unwrap();

    assert!(record_relation(&ctx.store, EntityKind::Track, "T1", "playlist_ids", "P1").unwrap());
    assert!(record_relation(&ctx.store, EntityKind::Track, "T1", "playlist_ids", "P2").unwrap());
    assert!(!record_relation(&ctx.store, EntityKind::Track, "T1", "playlist_ids", "P1").unwrap());

    assert_eq!(
        relation(&ctx.store, EntityKind::Track, "T1", "playlist_ids"),
        vec!["P1".to_string(), "P2".to_string()]
    );
}

#[tokio::test]
async fn test_scalar_relation_is_overwritten() {
    let mut ctx = context(FakeRemote::new());
    let _: Playlist = load_entity(&mut ctx, Source::Payload(playlist("P1", "Mix", "U1", 0)))
        .await
        .unwrap();

    assert!(!record_relation(&ctx.store, EntityKind::Playlist, "P1", "owner_id", "U1").unwrap());
    assert!(record_relation(&ctx.store, EntityKind::Playlist, "P1", "owner_id", "U2").unwrap());

    assert_eq!(
        ctx.store
            .get_column(EntityKind::Playlist, "P1", "owner_id")
            .unwrap(),
        Some(SqlValue::Text("U2".to_string()))
    );
}

#[test]
fn test_missing_owner_records_nothing() {
    let ctx = context(FakeRemote::new());
    assert!(!record_relation(&ctx.store, EntityKind::Album, "A404", "track_ids", "T1").unwrap());
}

#[tokio::test]
async fn test_discover_records_and_schedules() {
    let mut ctx = context(FakeRemote::new());
    let _: Track = load_entity(&mut ctx, Source::Payload(track("T1", "Song", "A1", &["AR1"], 1)))
        .await
        .unwrap();

    let first = ctx
        .discover("AR1", "T1", EntityKind::Track, "artist_ids", EntityKind::Artist)
        .unwrap();
    assert!(first.recorded);
    assert!(first.scheduled);

    let again = ctx
        .discover("AR1", "T1", EntityKind::Track, "artist_ids", EntityKind::Artist)
        .unwrap();
    assert!(!again.recorded);
    assert!(!again.scheduled);
    assert_eq!(ctx.queues.len(EntityKind::Artist), 1);
}

#[tokio::test]
async fn test_cached_target_is_not_scheduled() {
    let mut ctx = context(FakeRemote::new());
    let _: Track = load_entity(&mut ctx, Source::Payload(track("T1", "Song", "A1", &["AR1"], 1)))
        .await
        .unwrap();
    let _: Playlist = load_entity(&mut ctx, Source::Payload(playlist("P1", "Mix", "U1", 1)))
        .await
        .unwrap();

    let discovery = ctx
        .discover("T1", "P1", EntityKind::Playlist, "track_ids", EntityKind::Track)
        .unwrap();

    assert!(discovery.recorded);
    assert!(!discovery.scheduled);
    assert!(ctx.queues.is_empty());
}

#[tokio::test]
async fn test_dead_and_dummy_ids_are_ignored() {
    let mut ctx = context(FakeRemote::new());
    let _: Track = load_entity(&mut ctx, Source::Payload(track("T1", "Song", "A1", &["AR1"], 1)))
        .await
        .unwrap();
    ctx.queues.mark_dead(EntityKind::Album, "A1");

    let dead = ctx
        .discover("A1", "T1", EntityKind::Track, "album_ids", EntityKind::Album)
        .unwrap();
    assert!(dead.recorded);
    assert!(!dead.scheduled);

    let dummy = ctx
        .discover(
            spotmirror::cache::DUMMY_ID,
            "T1",
            EntityKind::Track,
            "album_ids",
            EntityKind::Album,
        )
        .unwrap();
    assert_eq!(dummy, Default::default());
    assert_eq!(relation(&ctx.store, EntityKind::Track, "T1", "album_ids"), vec!["A1".to_string()]);
}

#[tokio::test]
async fn test_shared_album_is_scheduled_once() {
    let remote = FakeRemote::new();
    remote.add(EntityKind::Track, track("T1", "One", "A1", &["AR1"], 1_000));
    remote.add(EntityKind::Track, track("T2", "Two", "A1", &["AR1"], 1_000));
    remote.add(EntityKind::Album, album("A1", "Record", &["AR1"], 2, &[]));
    remote.add(EntityKind::Artist, artist("AR1", "Band", &[], 1));
    remote.add_items(
        SubResource::AlbumTracks,
        "A1",
        vec![
            track("T1", "One", "A1", &["AR1"], 1_000),
            track("T2", "Two", "A1", &["AR1"], 1_000),
        ],
    );
    let mut ctx = context(remote);

    let _: Track = load_hydrated(&mut ctx, Source::Id("T1")).await.unwrap();
    let _: Track = load_hydrated(&mut ctx, Source::Id("T2")).await.unwrap();

    assert_eq!(ctx.queues.snapshot(EntityKind::Album), vec!["A1"]);
    assert_eq!(ctx.queues.snapshot(EntityKind::Artist), vec!["AR1"]);
    for id in ["T1", "T2"] {
        assert_eq!(relation(&ctx.store, EntityKind::Track, id, "album_ids"), vec!["A1".to_string()]);
        assert_eq!(relation(&ctx.store, EntityKind::Track, id, "artist_ids"), vec!["AR1".to_string()]);
    }

    let report = drain_queues(&mut ctx).await.unwrap();
    assert_eq!(report.hydrated, 2);
    assert_eq!(
        relation(&ctx.store, EntityKind::Album, "A1", "track_ids"),
        vec!["T1".to_string(), "T2".to_string()]
    );
    assert_eq!(relation(&ctx.store, EntityKind::Album, "A1", "artist_ids"), vec!["AR1".to_string()]);
}
