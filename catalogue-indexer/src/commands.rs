//! One function per command line subcommand.
//!
//! Engine commands return once their batches are dispatched; callers shut
//! the queues down through [`Dependencies::shutdown`] to wait for the
//! writes.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::{Dependencies, IndexingError};
use catalogue_indexer_pipeline::{
    MigrationController, MigrationReport, PopularityRefresh, UpdateSummary, Updater,
};
use catalogue_indexer_schema::{IndexSchema, SchemaConfig};

/// Refresh popularity data of `index` in place.
#[instrument(skip(deps))]
pub async fn popularity(
    deps: &Dependencies,
    index: &str,
    process_all: bool,
) -> Result<UpdateSummary, IndexingError> {
    let strategy = PopularityRefresh::new(process_all, deps.config.migrated_formats.clone());

    let summary = Updater::popularity(deps.client.clone(), deps.bulk_queue.clone(), index, strategy)
        .with_config(deps.config.updater.clone())
        .run()
        .await?;

    Ok(summary)
}

/// Copy every document of `source` into `destination`.
#[instrument(skip(deps))]
pub async fn resync(
    deps: &Dependencies,
    source: &str,
    destination: &str,
) -> Result<UpdateSummary, IndexingError> {
    let summary = Updater::full_resync(
        deps.client.clone(),
        deps.bulk_queue.clone(),
        source,
        destination,
    )
    .with_config(deps.config.updater.clone())
    .run()
    .await?;

    Ok(summary)
}

/// Move `group` onto a new index built from the current schema
/// configuration.
#[instrument(skip(deps))]
pub async fn migrate(
    deps: &Dependencies,
    group: &str,
    process_all: bool,
) -> Result<MigrationReport, IndexingError> {
    let configuration = schema_configuration(&deps.config.schema_config_dir)?;

    let targeted = PopularityRefresh::new(process_all, deps.config.migrated_formats.clone());
    let controller = MigrationController::new(
        deps.client.clone(),
        deps.client.clone(),
        deps.lock.clone(),
        deps.queues.clone(),
        deps.bulk_queue.clone(),
        Arc::new(targeted),
    )
    .with_config(deps.config.migration());

    Ok(controller.migrate(group, &configuration).await?)
}

/// Merged index creation body for the schema configuration in `dir`.
///
/// Fails without producing anything if the configuration is inconsistent.
pub fn schema_configuration(dir: &Path) -> Result<Value, IndexingError> {
    let config = SchemaConfig::load(dir)?;
    let schema = IndexSchema::build(&config)?;

    info!(
        document_types = config.document_types.len(),
        fields = schema.combined.field_definitions().len(),
        "Built index configuration"
    );

    Ok(schema.index_configuration())
}
