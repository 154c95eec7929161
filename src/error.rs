use thiserror::Error;

use crate::archive::ArchiveError;
use crate::backup::BackupError;
use crate::convert::ConvertError;
use crate::plan::CodecError;
use crate::reconcile::ReconcileError;
use crate::repair::RepairError;
use crate::store::StoreError;

/// Crate-level convenience error.
///
/// A thin wrapper over the per-capability errors; each run type keeps its
/// own bounded error enum and this only collects them at the CLI boundary.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Repair(#[from] RepairError),
}
