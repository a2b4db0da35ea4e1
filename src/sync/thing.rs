use crate::catalog::CatalogError;

use super::error::SyncError;
use super::Synchronizer;

impl Synchronizer<'_> {
    /// Find or create the remote thing, push the configured payload to it,
    /// and return its id.
    ///
    /// A stored id skips discovery. Otherwise the account's things are
    /// matched by exact name; an existing match is adopted and patched, no
    /// match is created.
    pub async fn sync_thing(&mut self) -> Result<u64, SyncError> {
        let mut thing = self.ctx.thing.clone();
        thing.id = self.state.thing_id();

        if thing.id.is_none() {
            thing.id = self.discover_thing_id().await?;
            if let Some(id) = thing.id {
                tracing::info!(id, "Adopting existing thing '{}'", thing.name);
                self.state.thing = thing.without_description();
                self.checkpoint().await?;
            }
        }

        let id = match thing.id {
            Some(id) => {
                self.catalog.update_thing(id, &thing).await?;
                tracing::info!(id, "Updated thing '{}'", thing.name);
                id
            }
            None => {
                let created = self.catalog.create_thing(&thing).await?;
                let id = created.id.ok_or_else(|| {
                    CatalogError::malformed("things/", "created thing has no id")
                })?;
                tracing::info!(id, "Created thing '{}'", thing.name);
                id
            }
        };

        thing.id = Some(id);
        self.state.thing = thing.without_description();
        self.checkpoint().await?;
        Ok(id)
    }

    async fn discover_thing_id(&self) -> Result<Option<u64>, SyncError> {
        let name = &self.ctx.thing.name;
        let matches: Vec<_> = self
            .catalog
            .list_user_things(&self.ctx.username)
            .await?
            .into_iter()
            .filter(|t| &t.name == name)
            .collect();

        match matches.as_slice() {
            [] => {
                tracing::debug!("No thing named '{}' on the account", name);
                Ok(None)
            }
            [only] => only.id.map(Some).ok_or_else(|| {
                CatalogError::malformed(
                    format!("users/{}/things", self.ctx.username),
                    format!("thing '{name}' listed without an id"),
                )
                .into()
            }),
            many => Err(SyncError::DuplicateEntry {
                name: name.clone(),
                count: many.len(),
            }),
        }
    }
}
