use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    CacheError, Context, EntityKind, RemoteGateway, Store,
    entity::{Album, Artist, Entity, Playlist, Source, Track, User, load_hydrated},
};

/// Outcome of [`drain_queues`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub hydrated: usize,
    /// Ids that could not be fetched or hydrated, in the order they failed.
    pub failed: Vec<(EntityKind, String)>,
    /// Full sweeps over the five queues until all were empty.
    pub passes: usize,
}

/// Hydrates queued ids until every queue is empty. Hydration discovers new
/// ids, so the five queues are swept in a fixed order until a sweep finds
/// nothing left. Ids that fail are dropped, marked dead and reported; only
/// database errors abort the drain.
pub async fn drain_queues<S: Store, R: RemoteGateway>(
    ctx: &mut Context<S, R>,
) -> Result<DrainReport, CacheError> {
    let mut report = DrainReport::default();

    while !ctx.queues.is_empty() {
        report.passes += 1;
        for kind in EntityKind::QUEUED {
            if ctx.queues.len(kind) == 0 {
                continue;
            }
            match kind {
                EntityKind::Album => drain_bulk::<Album, S, R>(ctx, &mut report).await?,
                EntityKind::Artist => drain_bulk::<Artist, S, R>(ctx, &mut report).await?,
                EntityKind::Track => drain_bulk::<Track, S, R>(ctx, &mut report).await?,
                EntityKind::Playlist => drain_single::<Playlist, S, R>(ctx, &mut report).await?,
                EntityKind::User => drain_single::<User, S, R>(ctx, &mut report).await?,
                EntityKind::Genre | EntityKind::Device => {}
            }
        }
    }

    info!(
        hydrated = report.hydrated,
        failed = report.failed.len(),
        passes = report.passes,
        "queues drained"
    );
    Ok(report)
}

fn drop_id<S, R>(ctx: &mut Context<S, R>, report: &mut DrainReport, kind: EntityKind, id: &str) {
    ctx.queues.mark_dead(kind, id);
    report.failed.push((kind, id.to_string()));
}

/// Hydrates one entity and settles its queue entry `queued_id`: removed on
/// success, dropped on a non-fatal failure.
async fn hydrate_queued<E: Entity, S: Store, R: RemoteGateway>(
    ctx: &mut Context<S, R>,
    report: &mut DrainReport,
    queued_id: &str,
    source: Source<'_>,
) -> Result<(), CacheError> {
    let kind = E::KIND;
    match load_hydrated::<E, S, R>(ctx, source).await {
        Ok(_) => {
            ctx.queues.remove(kind, queued_id);
            report.hydrated += 1;
            info!("added {} ({} items left)", queued_id, ctx.queues.len(kind));
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(%kind, id = %queued_id, error = %e, "hydration failed, dropping id");
            drop_id(ctx, report, kind, queued_id);
        }
    }
    Ok(())
}

/// Fetches the queue content in chunks of `bulk_batch_size` ids and hydrates
/// every returned payload without refetching it. Rows an earlier run cached
/// but never hydrated are finished from their stored payload.
async fn drain_bulk<E: Entity, S: Store, R: RemoteGateway>(
    ctx: &mut Context<S, R>,
    report: &mut DrainReport,
) -> Result<(), CacheError> {
    let kind = E::KIND;
    let batch_size = ctx.settings.bulk_batch_size.max(1);
    let pending = ctx.queues.snapshot(kind);

    for chunk in pending.chunks(batch_size) {
        let mut ids = Vec::with_capacity(chunk.len());
        for id in chunk {
            match ctx.store.hydrated(kind, id)? {
                // Loaded directly since it was queued.
                Some(true) => {
                    ctx.queues.remove(kind, id);
                }
                Some(false) => hydrate_queued::<E, S, R>(ctx, report, id, Source::Id(id)).await?,
                None => ids.push(id.clone()),
            }
        }
        if ids.is_empty() {
            continue;
        }

        let payloads = match ctx.remote.fetch_many(kind, &ids).await {
            Ok(payloads) => payloads,
            Err(e) => {
                warn!(
                    %kind,
                    count = ids.len(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "bulk fetch failed, dropping batch"
                );
                for id in &ids {
                    drop_id(ctx, report, kind, id);
                }
                continue;
            }
        };

        for payload in payloads {
            let Some(id) = payload.get("id").and_then(Value::as_str).map(str::to_string) else {
                warn!(%kind, "skipping payload without id");
                continue;
            };
            // Relinked tracks carry the requested id in `linked_from`.
            let requested = payload
                .pointer("/linked_from/id")
                .and_then(Value::as_str)
                .filter(|requested| ids.iter().any(|id| id.as_str() == *requested))
                .map(str::to_string);
            let queued_id = requested.unwrap_or_else(|| id.clone());
            if queued_id != id {
                debug!(%kind, requested = %queued_id, returned = %id, "relinked");
                ctx.queues.remove(kind, &id);
            }
            hydrate_queued::<E, S, R>(ctx, report, &queued_id, Source::Payload(payload)).await?;
        }

        for id in &ids {
            if ctx.queues.contains(kind, id) {
                warn!(%kind, %id, "not returned by the remote, dropping id");
                drop_id(ctx, report, kind, id);
            }
        }
    }
    Ok(())
}

/// Fetches and hydrates queued ids one at a time until the queue is empty.
async fn drain_single<E: Entity, S: Store, R: RemoteGateway>(
    ctx: &mut Context<S, R>,
    report: &mut DrainReport,
) -> Result<(), CacheError> {
    let kind = E::KIND;
    while let Some(id) = ctx.queues.pop(kind) {
        if ctx.store.hydrated(kind, &id)? == Some(true) {
            continue;
        }
        hydrate_queued::<E, S, R>(ctx, report, &id, Source::Id(&id)).await?;
    }
    Ok(())
}
