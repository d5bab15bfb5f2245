use tracing::{debug, trace};

use super::{
    Context, DUMMY_ID, EntityKind, RemoteGateway, Store, StoreError,
    schema,
    store::{self, SqlValue, list_value},
};

/// What [`Context::discover`] did with a related id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Discovery {
    /// The id was appended to the owner's relation column.
    pub recorded: bool,
    /// The id was added to the pending queue of its kind.
    pub scheduled: bool,
}

impl<S: Store, R: RemoteGateway> Context<S, R> {
    /// Records that `owner_id` references `related_id` through `column`, and
    /// schedules `related_id` if nothing else knows about it yet.
    pub fn discover(
        &mut self,
        related_id: &str,
        owner_id: &str,
        owner_kind: EntityKind,
        column: &str,
        target_kind: EntityKind,
    ) -> Result<Discovery, StoreError> {
        if related_id.is_empty() || related_id == DUMMY_ID {
            return Ok(Discovery::default());
        }
        let recorded = record_relation(&self.store, owner_kind, owner_id, column, related_id)?;
        let scheduled = self.schedule(target_kind, related_id)?;
        trace!(
            owner = %owner_id,
            %column,
            related = %related_id,
            recorded,
            scheduled,
            "discovered"
        );
        Ok(Discovery {
            recorded,
            scheduled,
        })
    }
}

/// Appends `related_id` to a relation column unless it is already present.
/// Scalar relation columns are overwritten instead. Returns `false` when the
/// owner row does not exist or nothing changed.
pub fn record_relation<S: Store>(
    store: &S,
    owner_kind: EntityKind,
    owner_id: &str,
    column: &str,
    related_id: &str,
) -> Result<bool, StoreError> {
    if owner_id == DUMMY_ID {
        return Ok(false);
    }

    let Some(current) = store.get_column(owner_kind, owner_id, column)? else {
        debug!(kind = %owner_kind, id = %owner_id, %column, "owner row missing, relation not recorded");
        return Ok(false);
    };

    if schema::relation(owner_kind, column).is_some_and(|r| r.scalar) {
        if current == SqlValue::Text(related_id.to_string()) {
            return Ok(false);
        }
        return store.update_column(owner_kind, owner_id, column, store::text(related_id));
    }

    let mut ids = list_value(owner_kind, column, &current)?;
    if ids.iter().any(|id| id == related_id) {
        return Ok(false);
    }
    ids.push(related_id.to_string());
    store.update_column(owner_kind, owner_id, column, store::list(&ids))
}
