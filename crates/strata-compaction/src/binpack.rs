//! Weight-bounded list packing.
//!
//! First-fit packing that preserves input order: each item is offered to the
//! most recent open bins (a bounded lookback window) and a new bin opens when
//! none can take it. A bin always accepts at least one item, so an item
//! heavier than the bound occupies a bin alone.

/// First-fit, order-preserving bin packer.
#[derive(Debug, Clone, Copy)]
pub struct ListPacker {
    target_weight: u64,
    lookback: usize,
}

impl ListPacker {
    /// Creates a packer bounded by `target_weight` per bin, considering up to
    /// `lookback` most recent open bins for each item.
    ///
    /// A `lookback` of 1 degenerates to sequential packing: the current bin
    /// closes as soon as an item does not fit.
    #[must_use]
    pub fn new(target_weight: u64, lookback: usize) -> Self {
        Self {
            target_weight,
            lookback: lookback.max(1),
        }
    }

    /// Packs `items` into bins, preserving input order within each bin.
    pub fn pack<T>(
        &self,
        items: impl IntoIterator<Item = T>,
        weight: impl Fn(&T) -> u64,
    ) -> Vec<Vec<T>> {
        let mut closed: Vec<Vec<T>> = Vec::new();
        let mut open: Vec<(u64, Vec<T>)> = Vec::new();

        for item in items {
            let item_weight = weight(&item);

            let slot = open
                .iter_mut()
                .find(|(bin_weight, _)| *bin_weight + item_weight <= self.target_weight);

            match slot {
                Some((bin_weight, bin)) => {
                    *bin_weight += item_weight;
                    bin.push(item);
                }
                None => {
                    open.push((item_weight, vec![item]));
                    if open.len() > self.lookback {
                        closed.push(open.remove(0).1);
                    }
                }
            }
        }

        closed.extend(open.into_iter().map(|(_, bin)| bin));
        closed
    }
}
