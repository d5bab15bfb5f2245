#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
};

use serde_json::{Value, json};
use spotmirror::cache::{
    CacheSettings, Context, EntityKind, FetchError, Page, RemoteGateway, SqliteStore, SubResource,
};

/// In-memory stand-in for the Spotify Web API.
#[derive(Default)]
pub struct FakeRemote {
    objects: RefCell<HashMap<(EntityKind, String), Value>>,
    pages: RefCell<HashMap<(SubResource, String), Vec<Value>>>,
    failing: RefCell<HashSet<(EntityKind, String)>>,
    failing_pages: RefCell<HashSet<(SubResource, String)>>,
    pub one_calls: Cell<usize>,
    pub many_calls: RefCell<Vec<(EntityKind, usize)>>,
    pub page_calls: Cell<usize>,
    pub image_calls: Cell<usize>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: EntityKind, payload: Value) {
        let id = payload["id"].as_str().unwrap_or_default().to_string();
        self.objects.borrow_mut().insert((kind, id), payload);
    }

    /// Answers requests for `requested_id` with `payload`, the way the Web
    /// API substitutes a relinked track for the one asked for.
    pub fn add_relinked(&self, kind: EntityKind, requested_id: &str, mut payload: Value) {
        payload["linked_from"] = json!({ "id": requested_id });
        self.objects
            .borrow_mut()
            .insert((kind, requested_id.to_string()), payload);
    }

    pub fn add_items(&self, resource: SubResource, id: &str, items: Vec<Value>) {
        self.pages
            .borrow_mut()
            .insert((resource, id.to_string()), items);
    }

    /// Every request for this object fails with a server error.
    pub fn fail(&self, kind: EntityKind, id: &str) {
        self.failing.borrow_mut().insert((kind, id.to_string()));
    }

    pub fn fail_pages(&self, resource: SubResource, id: &str) {
        self.failing_pages
            .borrow_mut()
            .insert((resource, id.to_string()));
    }

    pub fn total_calls(&self) -> usize {
        self.one_calls.get() + self.many_calls.borrow().len() + self.page_calls.get()
    }
}

fn server_error() -> FetchError {
    FetchError::Status {
        status: 500,
        message: "fake failure".to_string(),
    }
}

impl RemoteGateway for FakeRemote {
    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<Value, FetchError> {
        self.one_calls.set(self.one_calls.get() + 1);
        if self.failing.borrow().contains(&(kind, id.to_string())) {
            return Err(server_error());
        }
        self.objects
            .borrow()
            .get(&(kind, id.to_string()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: format!("fake://{}/{}", kind, id),
            })
    }

    async fn fetch_many(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Value>, FetchError> {
        self.many_calls.borrow_mut().push((kind, ids.len()));
        if ids
            .iter()
            .any(|id| self.failing.borrow().contains(&(kind, id.clone())))
        {
            return Err(server_error());
        }
        let objects = self.objects.borrow();
        Ok(ids
            .iter()
            .filter_map(|id| objects.get(&(kind, id.clone())).cloned())
            .collect())
    }

    async fn fetch_page(
        &self,
        resource: SubResource,
        id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page, FetchError> {
        self.page_calls.set(self.page_calls.get() + 1);
        if self
            .failing_pages
            .borrow()
            .contains(&(resource, id.to_string()))
        {
            return Err(server_error());
        }
        let pages = self.pages.borrow();
        let items = pages
            .get(&(resource, id.to_string()))
            .cloned()
            .unwrap_or_default();
        let total = items.len() as u64;
        let page: Vec<Value> = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(Page {
            items: page,
            total,
            next: None,
        })
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.image_calls.set(self.image_calls.get() + 1);
        if url.contains("broken") {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        Ok(b"cover".to_vec())
    }
}

pub fn context(remote: FakeRemote) -> Context<SqliteStore, FakeRemote> {
    context_with(remote, CacheSettings::default())
}

pub fn context_with(
    remote: FakeRemote,
    settings: CacheSettings,
) -> Context<SqliteStore, FakeRemote> {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    Context::new(store, remote, settings)
}

pub fn images(url: &str) -> Value {
    json!([{ "url": url, "height": 640, "width": 640 }])
}

pub fn track(id: &str, name: &str, album_id: &str, artist_ids: &[&str], duration_ms: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "track",
        "uri": format!("spotify:track:{}", id),
        "external_urls": { "spotify": format!("https://open.spotify.com/track/{}", id) },
        "duration_ms": duration_ms,
        "album": {
            "id": album_id,
            "name": format!("{} album", name),
            "images": images(&format!("https://i.scdn.co/image/{}", album_id)),
        },
        "artists": artist_ids
            .iter()
            .map(|a| json!({ "id": a, "name": format!("artist {}", a) }))
            .collect::<Vec<_>>(),
    })
}

pub fn album(id: &str, name: &str, artist_ids: &[&str], total_tracks: i64, genres: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "uri": format!("spotify:album:{}", id),
        "external_urls": { "spotify": format!("https://open.spotify.com/album/{}", id) },
        "images": images(&format!("https://i.scdn.co/image/{}", id)),
        "total_tracks": total_tracks,
        "genres": genres,
        "artists": artist_ids
            .iter()
            .map(|a| json!({ "id": a, "name": format!("artist {}", a) }))
            .collect::<Vec<_>>(),
    })
}

pub fn artist(id: &str, name: &str, genres: &[&str], followers: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "uri": format!("spotify:artist:{}", id),
        "external_urls": { "spotify": format!("https://open.spotify.com/artist/{}", id) },
        "images": images(&format!("https://i.scdn.co/image/{}", id)),
        "genres": genres,
        "followers": { "total": followers },
    })
}

pub fn playlist(id: &str, name: &str, owner_id: &str, total: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "uri": format!("spotify:playlist:{}", id),
        "external_urls": { "spotify": format!("https://open.spotify.com/playlist/{}", id) },
        "images": [],
        "owner": { "id": owner_id, "display_name": format!("user {}", owner_id) },
        "tracks": { "total": total },
    })
}

pub fn user(id: &str, display_name: &str) -> Value {
    json!({
        "id": id,
        "display_name": display_name,
        "uri": format!("spotify:user:{}", id),
        "external_urls": { "spotify": format!("https://open.spotify.com/user/{}", id) },
        "followers": { "total": 3 },
    })
}

/// Playlist item wrapper as returned by the playlist tracks endpoint.
pub fn item(track: Value) -> Value {
    json!({ "added_at": "2024-01-01T00:00:00Z", "track": track })
}
