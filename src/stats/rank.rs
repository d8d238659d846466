use serde::Serialize;

use crate::Value;

/// A row picked by a ranking query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ranked {
    pub row: usize,
    pub value: f64,
}

/// The `k` largest defined values, descending. Ties keep table order.
pub fn top_k(values: &[Value], k: usize) -> Vec<Ranked> {
    ranked(values, k, |a, b| b.total_cmp(&a))
}

/// The `k` smallest defined values, ascending. Ties keep table order.
pub fn bottom_k(values: &[Value], k: usize) -> Vec<Ranked> {
    ranked(values, k, |a, b| a.total_cmp(&b))
}

fn ranked(values: &[Value], k: usize, order: impl Fn(f64, f64) -> std::cmp::Ordering) -> Vec<Ranked> {
    let mut rows = values.iter().enumerate()
        .filter_map(|(row, v)| Some(Ranked { row, value: v.get()? }))
        .collect::<Vec<_>>();
    // sort_by is stable
    rows.sort_by(|a, b| order(a.value, b.value));
    rows.truncate(k);
    rows
}
