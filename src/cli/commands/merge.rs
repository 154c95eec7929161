use crate::Result;
use crate::cli::MergeArgs;
use crate::reconcile;
use crate::store::{DryRun, StateStore};

pub(crate) fn handle(args: MergeArgs) -> Result<()> {
    let cfg = args.api.into_config();
    let store = super::connect(&cfg.base_url, &cfg.public_key, &cfg.private_key)?;

    let store: Box<dyn StateStore> = if args.dry_run {
        tracing::warn!("dry run enabled: no modifications will be sent to the store");
        Box::new(DryRun::new(store))
    } else {
        Box::new(store)
    };

    let report = reconcile::merge_shards(store.as_ref(), &cfg.project_id, &args.backup_dir)?;

    match &report.target {
        Some(target) => tracing::info!(
            target = %target,
            migrated = report.migrated_values,
            deleted_shards = report.deleted_shards,
            "merged state shards"
        ),
        None => tracing::info!(
            state_shards = report.state_shards,
            "no duplicate state shards found"
        ),
    }
    Ok(())
}
