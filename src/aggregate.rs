use crate::types::{GroupKey, GroupTotal, SectionRecord};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Group key ordered numerically when both sides are integers, lexically otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NaturalKey(String);

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sum of votes per distinct value of `key`, in ascending key order.
///
/// Zones are grouped by their raw value, so equal zone ids in different
/// municipalities end up in the same group.
pub fn sum_votes_by<'a, I>(records: I, key: GroupKey) -> Vec<GroupTotal>
where
    I: IntoIterator<Item = &'a SectionRecord>,
{
    let mut groups: BTreeMap<NaturalKey, u64> = BTreeMap::new();
    for record in records {
        *groups.entry(NaturalKey(key.value_of(record).to_string())).or_insert(0) += record.votes;
    }

    groups.into_iter()
        .map(|(k, votes)| GroupTotal { key: k.0, votes })
        .collect()
}

/// The `n` largest groups by votes, descending. The sort is stable, so ties
/// keep the order they had in `totals`.
pub fn top_n(totals: &[GroupTotal], n: usize) -> Vec<GroupTotal> {
    let mut ranked = totals.to_vec();
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
    ranked.truncate(n);
    ranked
}

pub fn total_votes<'a, I>(records: I) -> u64
where
    I: IntoIterator<Item = &'a SectionRecord>,
{
    records.into_iter().map(|r| r.votes).sum()
}

/// Number of distinct values of `key`.
pub fn count_distinct<'a, I>(records: I, key: GroupKey) -> usize
where
    I: IntoIterator<Item = &'a SectionRecord>,
{
    records.into_iter()
        .map(|r| key.value_of(r))
        .collect::<HashSet<_>>()
        .len()
}
