//! Vote counting.
//!
//! Only civilian ballots count. An impostor's ballot stays in the
//! session's vote map for display, but [`tally`] never reads it.

use std::collections::BTreeMap;

use impostor_protocol::PlayerId;
use serde::{Deserialize, Serialize};

/// The counted outcome of one voting round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    /// Civilian votes received per target.
    pub vote_counts: BTreeMap<PlayerId, u32>,
    /// Civilians whose vote named an impostor.
    pub correct_voters: Vec<PlayerId>,
    /// Civilians whose vote named a civilian.
    pub incorrect_voters: Vec<PlayerId>,
    /// Every civilian named the same impostor.
    pub impostor_discovered: bool,
    /// The discovered impostor. A display label only: nobody leaves the
    /// player list.
    pub eliminated: Option<PlayerId>,
}

/// Counts civilian votes and decides whether an impostor was discovered.
///
/// Discovery requires at least one civilian, a ballot from every
/// civilian, and all of those ballots naming the same impostor. A
/// plurality is not enough. Output is a pure function of the inputs;
/// voters are reported in `civilians` order.
pub fn tally(
    civilians: &[PlayerId],
    impostors: &[PlayerId],
    votes: &BTreeMap<PlayerId, PlayerId>,
) -> VoteTally {
    let mut vote_counts = BTreeMap::new();
    let mut correct_voters = Vec::new();
    let mut incorrect_voters = Vec::new();
    let mut unanimous_target: Option<PlayerId> = None;
    let mut unanimous = !civilians.is_empty();

    for civilian in civilians {
        let Some(&target) = votes.get(civilian) else {
            unanimous = false;
            continue;
        };
        *vote_counts.entry(target).or_insert(0) += 1;
        if impostors.contains(&target) {
            correct_voters.push(*civilian);
        } else {
            incorrect_voters.push(*civilian);
        }
        match unanimous_target {
            None => unanimous_target = Some(target),
            Some(t) if t != target => unanimous = false,
            Some(_) => {}
        }
    }

    let eliminated = unanimous_target.filter(|t| unanimous && impostors.contains(t));

    VoteTally {
        vote_counts,
        correct_voters,
        incorrect_voters,
        impostor_discovered: eliminated.is_some(),
        eliminated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);
    const P3: PlayerId = PlayerId(3);
    const P4: PlayerId = PlayerId(4);

    fn votes(pairs: &[(PlayerId, PlayerId)]) -> BTreeMap<PlayerId, PlayerId> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_tally_unanimous_civilians_discover_impostor() {
        let ballots = votes(&[(P1, P3), (P2, P3), (P3, P1)]);
        let result = tally(&[P1, P2], &[P3], &ballots);

        assert_eq!(result.vote_counts, BTreeMap::from([(P3, 2)]));
        assert!(result.impostor_discovered);
        assert_eq!(result.eliminated, Some(P3));
        assert_eq!(result.correct_voters, vec![P1, P2]);
        assert!(result.incorrect_voters.is_empty());
    }

    #[test]
    fn test_tally_split_vote_discovers_nobody() {
        let ballots = votes(&[(P1, P2), (P2, P1)]);
        let result = tally(&[P1, P2], &[P3], &ballots);

        assert!(!result.impostor_discovered);
        assert_eq!(result.eliminated, None);
        assert_eq!(result.vote_counts, BTreeMap::from([(P1, 1), (P2, 1)]));
        assert_eq!(result.incorrect_voters, vec![P1, P2]);
    }

    #[test]
    fn test_tally_majority_is_not_enough() {
        let ballots = votes(&[(P1, P4), (P2, P4), (P3, P1)]);
        let result = tally(&[P1, P2, P3], &[P4], &ballots);

        assert!(!result.impostor_discovered);
        assert_eq!(result.correct_voters, vec![P1, P2]);
        assert_eq!(result.incorrect_voters, vec![P3]);
    }

    #[test]
    fn test_tally_missing_civilian_ballot_blocks_discovery() {
        let ballots = votes(&[(P1, P3)]);
        let result = tally(&[P1, P2], &[P3], &ballots);
        assert!(!result.impostor_discovered);
        assert_eq!(result.vote_counts, BTreeMap::from([(P3, 1)]));
    }

    #[test]
    fn test_tally_unanimous_on_civilian_is_not_discovery() {
        let ballots = votes(&[(P1, P2), (P2, P2)]);
        let result = tally(&[P1, P2], &[P3], &ballots);
        assert!(!result.impostor_discovered);
        assert_eq!(result.eliminated, None);
    }

    #[test]
    fn test_tally_without_civilians_discovers_nobody() {
        let ballots = votes(&[(P1, P2)]);
        let result = tally(&[], &[P1, P2], &ballots);
        assert!(!result.impostor_discovered);
        assert!(result.vote_counts.is_empty());
    }

    #[test]
    fn test_tally_impostor_ballot_never_changes_result() {
        let civilian_ballots = [(P1, P3), (P2, P3)];
        let baseline = tally(&[P1, P2], &[P3], &votes(&civilian_ballots));

        for target in [P1, P2, P3] {
            let mut with_impostor = votes(&civilian_ballots);
            with_impostor.insert(P3, target);
            assert_eq!(tally(&[P1, P2], &[P3], &with_impostor), baseline);
        }
    }

    #[test]
    fn test_tally_is_deterministic() {
        let ballots = votes(&[(P1, P4), (P2, P3), (P3, P4)]);
        let a = tally(&[P1, P2, P3], &[P4], &ballots);
        let b = tally(&[P1, P2, P3], &[P4], &ballots);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tally_any_impostor_can_be_discovered() {
        let ballots = votes(&[(P1, P4), (P2, P4)]);
        let result = tally(&[P1, P2], &[P3, P4], &ballots);
        assert_eq!(result.eliminated, Some(P4));
    }

    #[test]
    fn test_tally_serializes_camel_case() {
        let result = tally(&[P1, P2], &[P3], &votes(&[(P1, P3), (P2, P3)]));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["impostorDiscovered"], true);
        assert_eq!(json["voteCounts"]["3"], 2);
        assert_eq!(json["eliminated"], 3);
    }
}
