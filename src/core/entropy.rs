//! Shannon entropy of categorical count distributions.

use std::collections::HashMap;

/// Shannon entropy in bits of a category-to-count distribution.
///
/// Categories with a zero count contribute nothing. An empty or all-zero
/// distribution has entropy 0. Counts are summed in sorted order, so the
/// result does not depend on map iteration order.
pub fn shannon_entropy<K>(counts: &HashMap<K, u64>) -> f64 {
    let mut values: Vec<u64> = counts.values().copied().filter(|&c| c > 0).collect();
    values.sort_unstable();

    let total: u64 = values.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let entropy: f64 = values
        .iter()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    // a single category yields -0.0
    entropy.max(0.0)
}
