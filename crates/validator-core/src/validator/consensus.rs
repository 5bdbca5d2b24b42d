use std::collections::BTreeMap;

use crate::types::MinerAnswer;

/// The winning fingerprint and the workers that reported it, in worker-id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consensus {
    pub fingerprint: String,
    pub members: Vec<u64>,
}

/// Most frequent fingerprint. Ties go to the fingerprint seen first.
pub fn majority_fingerprint<'a, I>(fingerprints: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tally: Vec<(&'a str, usize)> = Vec::new();
    for fp in fingerprints {
        match tally.iter_mut().find(|(seen, _)| *seen == fp) {
            Some((_, count)) => *count += 1,
            None => tally.push((fp, 1)),
        }
    }
    let mut best: Option<(&'a str, usize)> = None;
    for (fp, count) in tally {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((fp, count));
        }
    }
    best.map(|(fp, _)| fp)
}

fn present(
    answers: &BTreeMap<u64, Option<MinerAnswer>>,
) -> impl Iterator<Item = (u64, &str)> + '_ {
    answers
        .iter()
        .filter_map(|(uid, answer)| answer.as_ref().map(|a| (*uid, a.overall_hash.as_str())))
}

/// Groups non-null answers by declared fingerprint and keeps the majority group.
///
/// Iteration follows the map, so "first seen" means lowest worker id.
pub fn select_majority(answers: &BTreeMap<u64, Option<MinerAnswer>>) -> Option<Consensus> {
    let fingerprint = majority_fingerprint(present(answers).map(|(_, fp)| fp))?.to_owned();
    let members = present(answers)
        .filter(|(_, fp)| *fp == fingerprint)
        .map(|(uid, _)| uid)
        .collect();
    Some(Consensus {
        fingerprint,
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(fps: &[Option<&str>]) -> BTreeMap<u64, Option<MinerAnswer>> {
        fps.iter()
            .enumerate()
            .map(|(idx, fp)| {
                (
                    idx as u64 + 1,
                    fp.map(|hash| MinerAnswer {
                        overall_hash: hash.to_owned(),
                        data: Vec::new(),
                    }),
                )
            })
            .collect()
    }

    #[test]
    fn majority_wins_over_minority() {
        let picked = select_majority(&answers(&[
            Some("A"),
            Some("A"),
            Some("B"),
            Some("A"),
            Some("B"),
        ]))
        .expect("consensus");
        assert_eq!(picked.fingerprint, "A");
        assert_eq!(picked.members, vec![1, 2, 4]);
    }

    #[test]
    fn tie_goes_to_first_seen_in_both_orders() {
        let ab = select_majority(&answers(&[Some("A"), Some("B")])).expect("ab");
        assert_eq!(ab.fingerprint, "A");
        assert_eq!(ab.members, vec![1]);

        let ba = select_majority(&answers(&[Some("B"), Some("A")])).expect("ba");
        assert_eq!(ba.fingerprint, "B");
        assert_eq!(ba.members, vec![1]);
    }

    #[test]
    fn tie_break_uses_first_occurrence_not_first_to_reach_count() {
        assert_eq!(majority_fingerprint(["B", "A", "A", "B"]), Some("B"));
        assert_eq!(majority_fingerprint(["C", "A", "B", "A", "B"]), Some("A"));
    }

    #[test]
    fn nulls_are_ignored_and_all_null_has_no_consensus() {
        let picked =
            select_majority(&answers(&[None, Some("B"), None])).expect("single answer suffices");
        assert_eq!(picked.members, vec![2]);
        assert_eq!(select_majority(&answers(&[None, None])), None);
        assert_eq!(select_majority(&BTreeMap::new()), None);
    }
}
