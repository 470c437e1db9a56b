//! Listing-based selection: which stored object is "the" file for a slot,
//! and how a listing window splits into per-slot buckets.

use crate::models::report::ReportFile;
use crate::slots::{Slot, SlotRegistry};

/// Pick the newest object belonging to `slot` out of a newest-first listing.
///
/// Membership is a case-insensitive substring test on the object identifier,
/// so an unrelated identifier that happens to embed the slot name wins over
/// older genuine uploads. Callers get whatever the substring says.
pub fn latest_for<'a>(listing: &'a [ReportFile], slot: &Slot) -> Option<&'a ReportFile> {
    listing.iter().find(|file| file.embeds(slot.as_str()))
}

/// One listing window split by slot, plus everything that matched no slot.
#[derive(Debug, Default)]
pub struct Partitioned {
    pub per_slot: Vec<(Slot, Vec<ReportFile>)>,
    pub other: Vec<ReportFile>,
    pub total: usize,
}

/// Bucket a listing window per slot. Each slot filter runs independently, so
/// an identifier embedding both slot names lands in both buckets; `other`
/// holds files matching neither; `total` counts the window, not the buckets.
pub fn partition(listing: &[ReportFile], registry: &SlotRegistry) -> Partitioned {
    let per_slot: Vec<(Slot, Vec<ReportFile>)> = registry
        .slots()
        .iter()
        .map(|slot| {
            let bucket: Vec<ReportFile> = listing
                .iter()
                .filter(|file| file.embeds(slot.as_str()))
                .cloned()
                .collect();
            (slot.clone(), bucket)
        })
        .collect();
    let other = listing
        .iter()
        .filter(|file| !registry.slots().iter().any(|slot| file.embeds(slot.as_str())))
        .cloned()
        .collect();
    Partitioned {
        per_slot,
        other,
        total: listing.len(),
    }
}
