//! Stable multi-key sorting.

use std::cmp::Ordering;

use crate::types::Datum;

/// Sort direction for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// Sorts items by precomputed keys.
///
/// Each item carries one key per entry of `directions`. Items are stably
/// sorted by the first key; every contiguous run of equal first keys is then
/// re-sorted by the remaining keys. Equal items keep their input order, also
/// under `Desc`.
#[must_use]
pub fn sort_by_many<T>(items: Vec<(Vec<Datum>, T)>, directions: &[Direction]) -> Vec<T> {
    sort_level(items, directions, 0)
        .into_iter()
        .map(|(_, item)| item)
        .collect()
}

fn sort_level<T>(
    mut items: Vec<(Vec<Datum>, T)>,
    directions: &[Direction],
    level: usize,
) -> Vec<(Vec<Datum>, T)> {
    let Some(direction) = directions.get(level).copied() else {
        return items;
    };
    items.sort_by(|(a, _), (b, _)| direction.apply(key_at(a, level).compare(key_at(b, level))));
    if level + 1 == directions.len() {
        return items;
    }

    let mut result = Vec::with_capacity(items.len());
    let mut chunk: Vec<(Vec<Datum>, T)> = Vec::new();
    for item in items {
        let starts_new_run = chunk
            .last()
            .is_some_and(|(prev, _)| key_at(prev, level) != key_at(&item.0, level));
        if starts_new_run {
            result.extend(sort_level(std::mem::take(&mut chunk), directions, level + 1));
        }
        chunk.push(item);
    }
    result.extend(sort_level(chunk, directions, level + 1));
    result
}

static NULL: Datum = Datum::Null;

fn key_at(keys: &[Datum], level: usize) -> &Datum {
    keys.get(level).unwrap_or(&NULL)
}

/// Sorts documents by field names, reading missing fields as null.
#[must_use]
pub fn sort_by_fields(seq: Vec<Datum>, fields: &[(&str, Direction)]) -> Vec<Datum> {
    let directions: Vec<Direction> = fields.iter().map(|(_, d)| *d).collect();
    let keyed = seq
        .into_iter()
        .map(|doc| {
            let keys = fields.iter().map(|(f, _)| doc.getter(f)).collect();
            (keys, doc)
        })
        .collect();
    sort_by_many(keyed, &directions)
}
