//! Lazy, cache-backed wrappers around Spotify objects.
//!
//! A wrapper is created through [`Entity::load`] from either an id or a
//! payload that is already at hand (bulk responses, search results). Eager
//! fields are available right away; relation lists are fetched and persisted
//! the first time they are asked for and memoized afterwards.

mod album;
mod artist;
mod device;
mod genre;
mod playlist;
mod track;
mod user;

pub use album::Album;
pub use artist::Artist;
pub use device::Device;
pub use genre::{AudioFeatureBounds, FeatureRange, Genre};
pub use playlist::Playlist;
pub use track::Track;
pub use user::User;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    CacheError, Context, DUMMY_ID, EntityKind, FetchError, NO_IMAGE, RemoteGateway, Row,
    SqlValue, Store, StoreError, SubResource,
    store::{self, RowReader},
};
use crate::types::ExternalUrls;

/// Where an entity comes from when it is not cached yet.
#[derive(Debug, Clone)]
pub enum Source<'a> {
    Id(&'a str),
    Payload(Value),
}

/// Columns shared by album, artist, playlist, track and user rows.
#[derive(Debug, Clone)]
pub struct Base {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub url: String,
    /// Base64 encoded artwork.
    pub image: String,
    pub popularity: i64,
    pub blacklisted: bool,
    pub hydrated: bool,
    /// Remote payload, kept until every lazy field has been derived from it.
    pub(crate) payload: Option<Value>,
}

#[derive(Deserialize)]
struct EagerFields {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    external_urls: Option<ExternalUrls>,
}

impl Base {
    fn from_payload(
        kind: EntityKind,
        payload: Value,
        image: String,
        popularity: i64,
    ) -> Result<Self, CacheError> {
        let fields = EagerFields::deserialize(&payload).map_err(|e| CacheError::MalformedPayload {
            kind,
            reason: e.to_string(),
        })?;
        let name = fields
            .name
            .or(fields.display_name)
            .unwrap_or_else(|| fields.id.clone());
        let uri = fields
            .uri
            .unwrap_or_else(|| format!("spotify:{}:{}", kind, fields.id));
        let url = fields.external_urls.map(|u| u.spotify).unwrap_or_default();

        Ok(Self {
            id: fields.id,
            name,
            uri,
            url,
            image,
            popularity,
            blacklisted: false,
            hydrated: false,
            payload: Some(payload),
        })
    }

    fn from_row(kind: EntityKind, row: &Row) -> Result<Self, CacheError> {
        let r = RowReader::new(kind, row);
        let hydrated = r.flag("hydrated")?;
        let payload = if hydrated {
            None
        } else {
            r.opt_text("payload")?
                .and_then(|text| match serde_json::from_str(&text) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(%kind, error = %e, "stored payload is not valid JSON");
                        None
                    }
                })
        };
        Ok(Self {
            id: r.text("id")?,
            name: r.text("name")?,
            uri: r.text("uri")?,
            url: r.opt_text("url")?.unwrap_or_default(),
            image: r.opt_text("image")?.unwrap_or_default(),
            popularity: r.int("popularity")?,
            blacklisted: r.flag("blacklisted")?,
            hydrated,
            payload,
        })
    }

    fn insert_row(&self) -> Row {
        let payload = self
            .payload
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_else(|| "{}".to_string());
        Row::from([
            ("id".to_string(), store::text(&self.id)),
            ("name".to_string(), store::text(&self.name)),
            ("uri".to_string(), store::text(&self.uri)),
            ("url".to_string(), store::text(&self.url)),
            ("image".to_string(), store::text(&self.image)),
            ("popularity".to_string(), store::int(self.popularity)),
            ("blacklisted".to_string(), store::int(self.blacklisted as i64)),
            ("hydrated".to_string(), store::int(0)),
            ("payload".to_string(), store::text(payload)),
        ])
    }

    /// Field of the remote payload, `None` once the entity is hydrated or
    /// when the payload lacks it.
    pub(crate) fn field(&self, key: &str) -> Option<&Value> {
        self.payload.as_ref().and_then(|p| p.get(key))
    }
}

/// Behavior shared by every remote-backed entity.
#[allow(async_fn_in_trait)]
pub trait Entity: Sized {
    const KIND: EntityKind;

    fn base(&self) -> &Base;

    fn base_mut(&mut self) -> &mut Base;

    /// Builds the wrapper from a freshly fetched payload.
    fn from_base(base: Base) -> Self;

    /// Rebuilds the wrapper from a cached row. Relation lists of hydrated
    /// rows are memoized straight from their columns.
    fn from_row(row: &Row) -> Result<Self, CacheError>;

    /// Eager entity specific columns written with the first insert.
    fn eager_columns(&self) -> Vec<(&'static str, SqlValue)> {
        Vec::new()
    }

    /// Artwork array inside the payload.
    fn images(payload: &Value) -> Option<&Value> {
        payload.get("images")
    }

    /// Computes and persists every lazy field, discovering related entities
    /// on the way.
    async fn hydrate<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<(), CacheError>;

    async fn load<S: Store, R: RemoteGateway>(
        ctx: &mut Context<S, R>,
        source: Source<'_>,
    ) -> Result<Self, CacheError> {
        load_entity(ctx, source).await
    }

    fn id(&self) -> &str {
        &self.base().id
    }

    fn name(&self) -> &str {
        &self.base().name
    }

    fn uri(&self) -> &str {
        &self.base().uri
    }

    fn url(&self) -> &str {
        &self.base().url
    }

    fn image(&self) -> &str {
        &self.base().image
    }

    fn popularity(&self) -> i64 {
        self.base().popularity
    }

    fn is_blacklisted(&self) -> bool {
        self.base().blacklisted
    }

    fn is_hydrated(&self) -> bool {
        self.base().hydrated
    }

    /// Adds `delta` to the stored popularity and returns the new value.
    /// Starts from the column, which other writers may have moved since the
    /// entity was loaded.
    fn adjust_popularity<S: Store>(&mut self, store: &S, delta: i64) -> Result<i64, CacheError> {
        let value = adjust_popularity(store, Self::KIND, self.id(), delta)?
            .unwrap_or(self.base().popularity + delta);
        self.base_mut().popularity = value;
        Ok(value)
    }

    fn set_blacklisted<S: Store>(&mut self, store: &S, blacklisted: bool) -> Result<(), CacheError> {
        store.update_column(
            Self::KIND,
            self.id(),
            "blacklisted",
            store::int(blacklisted as i64),
        )?;
        self.base_mut().blacklisted = blacklisted;
        Ok(())
    }

    /// Flags the row as fully hydrated and releases the payload.
    fn mark_hydrated<S: Store>(&mut self, store: &S) -> Result<(), CacheError> {
        store.update_column(Self::KIND, self.id(), "hydrated", store::int(1))?;
        let base = self.base_mut();
        base.hydrated = true;
        base.payload = None;
        Ok(())
    }
}

/// Cache hit or fetch-then-insert. Lazy fields are left untouched.
pub async fn load_entity<E: Entity, S: Store, R: RemoteGateway>(
    ctx: &mut Context<S, R>,
    source: Source<'_>,
) -> Result<E, CacheError> {
    let kind = E::KIND;
    let (id, payload) = match source {
        Source::Id(id) => (id.to_string(), None),
        Source::Payload(payload) => {
            let id = payload
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| CacheError::MalformedPayload {
                    kind,
                    reason: "missing id".to_string(),
                })?
                .to_string();
            (id, Some(payload))
        }
    };

    if id == DUMMY_ID {
        return Err(CacheError::DummyId { kind });
    }

    if let Some(row) = ctx.store.get(kind, &id)? {
        debug!(%kind, %id, "cache hit");
        return E::from_row(&row);
    }

    debug!(%kind, %id, "cache miss");
    let payload = match payload {
        Some(payload) => payload,
        None => ctx
            .remote
            .fetch_one(kind, &id)
            .await
            .map_err(|e| CacheError::remote(kind, &id, e))?,
    };

    let image = resolve_image(&ctx.remote, E::images(&payload)).await;
    let base = Base::from_payload(kind, payload, image, ctx.settings.initial_popularity)?;
    let entity = E::from_base(base);

    let mut row = entity.base().insert_row();
    for (column, value) in entity.eager_columns() {
        row.insert(column.to_string(), value);
    }
    ctx.store.insert(kind, &row)?;
    Ok(entity)
}

/// Loads and fully hydrates an entity. A row whose hydration fails is
/// removed again so a later run can retry it.
pub async fn load_hydrated<E: Entity, S: Store, R: RemoteGateway>(
    ctx: &mut Context<S, R>,
    source: Source<'_>,
) -> Result<E, CacheError> {
    let mut entity: E = load_entity(ctx, source).await?;
    if entity.is_hydrated() {
        return Ok(entity);
    }
    if let Err(e) = entity.hydrate(ctx).await {
        if !e.is_fatal() {
            ctx.store.delete(E::KIND, entity.id())?;
        }
        return Err(e);
    }
    Ok(entity)
}

async fn resolve_image<R: RemoteGateway>(remote: &R, images: Option<&Value>) -> String {
    let url = images
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(|image| image.get("url"))
        .and_then(Value::as_str);

    match url {
        None => NO_IMAGE.to_string(),
        Some(url) => match remote.fetch_image(url).await {
            Ok(bytes) => STANDARD.encode(bytes),
            Err(e) => {
                warn!(%url, error = %e, "could not download artwork");
                NO_IMAGE.to_string()
            }
        },
    }
}

/// Ids found at `pointer` in every element of `items`, deduplicated in
/// order. Missing or null ids are skipped.
pub(crate) fn collect_ids<'a>(
    items: impl IntoIterator<Item = &'a Value>,
    pointer: &str,
) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for item in items {
        if let Some(id) = item.pointer(pointer).and_then(Value::as_str) {
            if !id.is_empty() && !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

/// Elements of an array field, empty when the field is missing or not an
/// array.
pub(crate) fn array<'a>(value: Option<&'a Value>) -> &'a [Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// String elements of an array field.
pub(crate) fn strings(value: Option<&Value>) -> Vec<String> {
    array(value)
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Reads every page of a sub-resource. `expected` is the item count the
/// owner payload announced; a mismatch is logged and the partial list kept.
pub(crate) async fn collect_pages<R: RemoteGateway>(
    remote: &R,
    resource: SubResource,
    id: &str,
    page_size: u32,
    expected: Option<u64>,
) -> Result<Vec<Value>, FetchError> {
    let mut items = Vec::new();
    let mut offset: u32 = 0;

    let reported = loop {
        let page = remote.fetch_page(resource, id, page_size, offset).await?;
        let received = page.items.len();
        items.extend(page.items);
        offset += received as u32;
        if received == 0 || u64::from(offset) >= page.total {
            break page.total;
        }
    };

    let expected = expected.unwrap_or(reported);
    if items.len() as u64 != expected {
        warn!(
            ?resource,
            %id,
            expected,
            received = items.len(),
            "page count mismatch, keeping partial list"
        );
    }
    Ok(items)
}

/// Records every id as a relation of the owner and schedules the unknown
/// ones. Returns the ids for memoization.
pub(crate) fn link_all<S: Store, R: RemoteGateway>(
    ctx: &mut Context<S, R>,
    owner_kind: EntityKind,
    owner_id: &str,
    column: &str,
    target_kind: EntityKind,
    ids: Vec<String>,
) -> Result<Vec<String>, StoreError> {
    for id in &ids {
        ctx.discover(id, owner_id, owner_kind, column, target_kind)?;
    }
    Ok(ids)
}

/// Reads a relation column that other entities append to.
pub(crate) fn stored_list<S: Store>(
    store: &S,
    kind: EntityKind,
    id: &str,
    column: &str,
) -> Result<Vec<String>, StoreError> {
    match store.get_column(kind, id, column)? {
        Some(value) => store::list_value(kind, column, &value),
        None => Ok(Vec::new()),
    }
}

/// Adds `delta` to the popularity of any cached row without loading the
/// entity. Returns the new value, `None` if the row is not cached.
pub fn adjust_popularity<S: Store>(
    store: &S,
    kind: EntityKind,
    id: &str,
    delta: i64,
) -> Result<Option<i64>, StoreError> {
    let Some(current) = store.get_column(kind, id, "popularity")? else {
        return Ok(None);
    };
    let current = match current {
        SqlValue::Integer(i) => i,
        SqlValue::Real(r) => r as i64,
        SqlValue::Text(t) => t.trim().parse().unwrap_or(0),
        _ => 0,
    };
    let value = current + delta;
    store.update_column(kind, id, "popularity", store::int(value))?;
    Ok(Some(value))
}

/// Returns `false` if the row is not cached.
pub fn set_blacklisted<S: Store>(
    store: &S,
    kind: EntityKind,
    id: &str,
    blacklisted: bool,
) -> Result<bool, StoreError> {
    store.update_column(kind, id, "blacklisted", store::int(blacklisted as i64))
}

/// Uncached rows are never blacklisted.
pub fn is_blacklisted<S: Store>(store: &S, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
    Ok(match store.get_column(kind, id, "blacklisted")? {
        Some(SqlValue::Integer(i)) => i != 0,
        Some(SqlValue::Text(t)) => t.trim() == "1",
        _ => false,
    })
}
