//! Turn snapshots into a locally ranked standing for one activity.

use osrs_hiscores::{Snapshot, UNRANKED};

use crate::model::{ActivityKind, Measure, Member, Standing, StandingRow};

/// Rank `snapshots` on `activity`.
///
/// A snapshot without an entry for the activity counts as unranked. Rows
/// are ordered ranked-first, then by official rank, then by account key;
/// local ranks are the resulting 1-based positions. With
/// `exclude_unranked` set, unranked rows are dropped before numbering.
pub fn rank(
    activity: &str,
    kind: ActivityKind,
    snapshots: &[(Member, Snapshot)],
    exclude_unranked: bool,
) -> Standing {
    let mut rows: Vec<StandingRow> = snapshots
        .iter()
        .map(|(member, snapshot)| {
            let (official_rank, measure) = extract(activity, kind, snapshot);
            StandingRow {
                member: member.clone(),
                official_rank,
                local_rank: 0,
                measure,
            }
        })
        .filter(|row| !exclude_unranked || row.is_ranked())
        .collect();

    rows.sort_by(|a, b| {
        (!a.is_ranked(), a.official_rank, &a.member.account_key).cmp(&(
            !b.is_ranked(),
            b.official_rank,
            &b.member.account_key,
        ))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.local_rank = i as u32 + 1;
    }

    Standing {
        activity: activity.trim().to_string(),
        kind,
        rows,
    }
}

fn extract(activity: &str, kind: ActivityKind, snapshot: &Snapshot) -> (i64, Measure) {
    match kind {
        ActivityKind::Skill => match snapshot.skill(activity) {
            Some(s) => (
                s.rank,
                Measure::Skill {
                    level: s.level,
                    experience: s.xp,
                },
            ),
            None => (
                UNRANKED,
                Measure::Skill {
                    level: 0,
                    experience: 0,
                },
            ),
        },
        ActivityKind::Activity => match snapshot.activity(activity) {
            Some(a) => (a.rank, Measure::Score { score: a.score }),
            None => (UNRANKED, Measure::Score { score: 0 }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{snapshot, CLUES, WOODCUTTING};
    use osrs_hiscores::AccountType;

    fn entry(name: &str, wc: i64, clue: i64) -> (Member, Snapshot) {
        (
            Member::new("g1", name, AccountType::Main),
            snapshot(name, wc, clue),
        )
    }

    fn ranks(standing: &Standing) -> Vec<(String, i64, u32)> {
        standing
            .rows
            .iter()
            .map(|r| (r.member.account_key.clone(), r.official_rank, r.local_rank))
            .collect()
    }

    #[test]
    fn unranked_is_excluded_when_requested() {
        let snaps = vec![entry("C", 1200, 1), entry("A", -1, 1), entry("B", 500, 1)];
        let standing = rank(WOODCUTTING, ActivityKind::Skill, &snaps, true);
        assert_eq!(
            ranks(&standing),
            vec![("b".into(), 500, 1), ("c".into(), 1200, 2)]
        );
    }

    #[test]
    fn unranked_sorts_last_when_kept() {
        let snaps = vec![entry("C", 1200, 1), entry("A", -1, 1), entry("B", 500, 1)];
        let standing = rank(WOODCUTTING, ActivityKind::Skill, &snaps, false);
        assert_eq!(
            ranks(&standing),
            vec![("b".into(), 500, 1), ("c".into(), 1200, 2), ("a".into(), -1, 3)]
        );
    }

    #[test]
    fn ties_break_on_account_key() {
        let snaps = vec![entry("Zed", 5, 7), entry("Amy", 5, 7)];
        let standing = rank(CLUES, ActivityKind::Activity, &snaps, true);
        assert_eq!(standing.rows[0].member.account_key, "amy");
        assert_eq!(standing.rows[1].local_rank, 2);
    }

    #[test]
    fn missing_entry_counts_as_unranked() {
        let snaps = vec![entry("Zezima", 10, 20)];
        let kept = rank("Zulrah", ActivityKind::Activity, &snaps, false);
        assert_eq!(kept.rows.len(), 1);
        assert!(!kept.rows[0].is_ranked());
        assert!(rank("Zulrah", ActivityKind::Activity, &snaps, true).is_empty());
    }

    #[test]
    fn better_official_rank_never_ranks_worse() {
        let snaps: Vec<_> = [(300, "d"), (2, "b"), (-1, "x"), (45, "a"), (45, "c"), (0, "z")]
            .iter()
            .map(|(r, n)| entry(n, *r, 1))
            .collect();
        let standing = rank(WOODCUTTING, ActivityKind::Skill, &snaps, false);

        let locals: Vec<u32> = standing.rows.iter().map(|r| r.local_rank).collect();
        assert_eq!(locals, (1..=6).collect::<Vec<u32>>());
        for pair in standing.rows.windows(2) {
            if pair[0].is_ranked() && pair[1].is_ranked() {
                assert!(pair[0].official_rank <= pair[1].official_rank);
            }
            assert!(pair[0].is_ranked() || !pair[1].is_ranked());
        }
    }

    #[test]
    fn skill_rows_carry_level_and_experience() {
        let standing = rank("woodcutting", ActivityKind::Skill, &[entry("Zezima", 10, 20)], true);
        match standing.rows[0].measure {
            Measure::Skill { level, experience } => {
                assert!(level > 0);
                assert_eq!(experience, level * 1000);
            }
            other => panic!("unexpected measure {other:?}"),
        }
    }
}
