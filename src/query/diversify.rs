//! Domain diversification over ranked chunk hits.
//!
//! First pass caps hits per domain at `max(1, limit / 3)` walking in rank
//! order; when that leaves free slots, a second pass fills them ignoring
//! the cap. Relative rank order is preserved throughout.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

/// Applies the per-domain cap to ranked hits.
#[must_use]
pub fn diversify_by_domain(hits: Vec<Value>, limit: usize) -> Vec<Value> {
    if hits.is_empty() || limit == 0 {
        return Vec::new();
    }

    let max_per_domain = (limit / 3).max(1);
    let mut domain_counts: HashMap<String, usize> = HashMap::new();
    let mut selected: Vec<usize> = Vec::new();
    let mut taken: HashSet<usize> = HashSet::new();

    // First pass: respect the cap.
    for (rank, hit) in hits.iter().enumerate() {
        if selected.len() >= limit {
            break;
        }
        let domain = hit_domain(hit);
        let count = domain_counts.entry(domain).or_insert(0);
        if *count < max_per_domain {
            *count += 1;
            selected.push(rank);
            taken.insert(rank);
        }
    }

    // Second pass: fill remaining slots in rank order, cap ignored.
    if selected.len() < limit {
        for rank in 0..hits.len() {
            if selected.len() >= limit {
                break;
            }
            if taken.insert(rank) {
                selected.push(rank);
            }
        }
        selected.sort_unstable();
    }

    let mut hits = hits;
    let mut out: Vec<Value> = Vec::with_capacity(selected.len());
    // Walk backwards so swap_remove style extraction keeps indices valid.
    for rank in selected.iter().rev() {
        out.push(hits.swap_remove(*rank));
    }
    out.reverse();
    out
}

fn hit_domain(hit: &Value) -> String {
    hit["_source"]["domain"]
        .as_str()
        .unwrap_or("unknown")
        .to_string()
}
