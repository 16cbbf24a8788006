//! Writes claim changes to the statement store.

use anyhow::Result;
use tracing::{debug, info};

use super::finder::ClaimFinder;
use crate::adapters::StatementStore;
use crate::domain::{vocabulary::Properties, Claim, ItemId, RemoveInstruction};

/// Result of a single-claim upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { guid: String },
    Updated { guid: String },
}

impl UpsertOutcome {
    pub fn guid(&self) -> &str {
        match self {
            Self::Created { guid } | Self::Updated { guid } => guid,
        }
    }
}

pub struct ClaimWriter<'a> {
    store: &'a dyn StatementStore,
    properties: &'a Properties,
}

impl<'a> ClaimWriter<'a> {
    pub fn new(store: &'a dyn StatementStore, properties: &'a Properties) -> Self {
        Self { store, properties }
    }

    /// Apply a diff as one bulk edit; an empty diff writes nothing
    pub async fn apply(
        &self,
        entity: &ItemId,
        add: &[Claim],
        remove: &[RemoveInstruction],
    ) -> Result<()> {
        if add.is_empty() && remove.is_empty() {
            debug!(%entity, "Nothing to write");
            return Ok(());
        }

        self.store.edit_claims(entity, add, remove).await?;

        info!(%entity, added = add.len(), removed = remove.len(), "Applied claim diff");
        Ok(())
    }

    /// Create or update a single claim outside the bulk path.
    ///
    /// Fails with [`ClaimError::CategoryWithoutScope`](crate::domain::ClaimError)
    /// before touching the store.
    pub async fn upsert(&self, entity: &ItemId, claim: &Claim) -> Result<UpsertOutcome> {
        claim.validate()?;

        let finder = ClaimFinder::new(self.store, self.properties);
        let found = finder
            .find(
                entity,
                &claim.start_date,
                &claim.end_date,
                claim.scope.as_ref(),
                claim.category.as_ref(),
            )
            .await?;

        let Some(found) = found else {
            let guid = self.store.create_claim(entity, claim).await?;
            return Ok(UpsertOutcome::Created { guid });
        };

        self.store.update_claim(&found.guid, &claim.value).await?;

        match &found.reference_hash {
            Some(hash) => {
                self.store
                    .update_reference(&found.guid, &claim.reference_url, hash)
                    .await?
            }
            None => {
                self.store
                    .create_reference(&found.guid, &claim.reference_url)
                    .await?
            }
        }

        info!(guid = %found.guid, "Updated statement");
        Ok(UpsertOutcome::Updated { guid: found.guid })
    }
}
