use crate::Result;
use crate::cli::ConvertArgs;
use crate::convert::{self, ConvertOptions};
use crate::store::{DryRun, StateStore};

pub(crate) fn handle(args: ConvertArgs) -> Result<()> {
    let cfg = args.api.into_config();

    let retain = args
        .instance_list
        .as_deref()
        .map(convert::load_retain_list)
        .transpose()?;
    if let Some(retain) = &retain {
        tracing::warn!(
            retained = retain.len(),
            "cleanup mode: values not in the instance list will be deleted"
        );
    }

    let store = super::connect(&cfg.base_url, &cfg.public_key, &cfg.private_key)?;
    let store: Box<dyn StateStore> = if args.dry_run {
        tracing::warn!("dry run enabled: no modifications will be sent to the store");
        Box::new(DryRun::new(store))
    } else {
        Box::new(store)
    };

    let opts = ConvertOptions {
        retain,
        workers: None,
    };
    let report = convert::convert_values(store.as_ref(), &cfg.project_id, &opts)?;

    tracing::info!(
        scanned = report.scanned,
        converted = report.converted,
        canonical = report.canonical,
        unrecognized = report.unrecognized,
        stale_removed = report.stale_removed,
        failed = report.failed,
        "conversion pass complete"
    );
    Ok(())
}
