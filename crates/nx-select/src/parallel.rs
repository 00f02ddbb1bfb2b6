//! Multi-threaded selection pass.

use std::sync::Arc;

use log::{debug, warn};
use nx_core::Event;
use rayon::prelude::*;

use crate::accumulate::BinAccumulator;
use crate::classifier::BinClassifier;
use crate::selector::{EventSelector, OverlapPolicy};
use crate::variables::VariableSet;

/// Select and accumulate `events` on the rayon pool.
///
/// Each worker owns a selector and a private accumulator; the accumulators
/// are merged once the pass is done. The result carries the number of events
/// that passed more than one bin; the overlap warning is logged once for the
/// whole pass.
pub fn fill_parallel<E>(
    classifier: &Arc<BinClassifier>,
    variables: &Arc<VariableSet>,
    overlap: OverlapPolicy,
    events: &[E],
) -> BinAccumulator
where
    E: Event + Sync,
{
    let n_bins = classifier.n_bins();
    let worker = || {
        let selector = EventSelector::new(Arc::clone(classifier), Arc::clone(variables))
            .with_overlap_policy(overlap)
            .with_overlap_warning(false);
        (selector, BinAccumulator::new(n_bins))
    };
    let acc = events
        .par_iter()
        .fold(worker, |(mut selector, mut acc), event| {
            selector.process(event, &mut acc);
            (selector, acc)
        })
        .map(|(selector, mut acc)| {
            acc.overlapping_events += selector.overlapping_events();
            acc
        })
        .reduce(
            || BinAccumulator::new(n_bins),
            |mut a, b| {
                a.merge(&b);
                a
            },
        );
    if acc.overlapping_events > 0 {
        warn!("{} events passed several bins; applied {overlap:?}", acc.overlapping_events);
    }
    debug!("parallel pass: {} events, {} fills", events.len(), acc.entries);
    acc
}
