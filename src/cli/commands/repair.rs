use crate::Result;
use crate::archive;
use crate::backup::Snapshot;
use crate::cli::RepairArgs;
use crate::repair;

pub(crate) fn handle(args: RepairArgs) -> Result<()> {
    let cfg = args.api.into_config();

    tracing::info!(path = %args.backup_file.display(), "reading backup snapshot");
    let snapshot = Snapshot::load(&args.backup_file)?;
    tracing::info!(values = snapshot.len(), "loaded snapshot");

    let (instances, rebuild) = archive::rebuild_instances(
        &snapshot,
        &args.archive_dir,
        &cfg.org_id,
        args.skip_shard.as_deref(),
    )?;
    tracing::info!(
        total = rebuild.total,
        missing = rebuild.missing,
        "instance data rebuilt"
    );

    let store = super::connect(&cfg.base_url, &cfg.public_key, &cfg.private_key)?;
    let report = repair::repair_null_values(&store, &cfg.project_id, &instances, args.canary)?;

    tracing::info!(
        scanned = report.scanned,
        repaired = report.repaired,
        unmatched = report.unmatched,
        canary_stop = report.canary_stop,
        "repair run complete"
    );
    Ok(())
}
