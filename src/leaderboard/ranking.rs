use itertools::Itertools;

use super::{DriverAggregate, LeaderboardEntry, StageTime, format_time};

/// Orders aggregates into the final leaderboard and computes gap-to-leader
/// strings. The sort is stable, so DNF entries and equal finite times keep
/// their fold order; DNFs always land at the bottom.
pub fn rank_leaderboard(aggregates: Vec<DriverAggregate>) -> Vec<LeaderboardEntry> {
    let ordered = aggregates
        .into_iter()
        .sorted_by(|a, b| a.fastest.cmp(&b.fastest))
        .collect_vec();

    let leader_time = ordered
        .first()
        .and_then(|leader| leader.fastest.seconds())
        .unwrap_or(0.0);

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, aggregate)| {
            let (time, diff) = match aggregate.fastest {
                StageTime::Finite(seconds) => {
                    let diff = if seconds > leader_time {
                        format!("+{}", format_time(seconds - leader_time))
                    } else {
                        String::new()
                    };
                    (format_time(seconds), diff)
                }
                StageTime::NotFinished => ("DNF".to_string(), String::new()),
            };
            LeaderboardEntry {
                position: index + 1,
                name: aggregate.name,
                time,
                raw_time: aggregate.fastest,
                diff,
                attempts: aggregate.attempts,
                vehicle: aggregate.vehicle,
                vehicle_class: aggregate.vehicle_class,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn aggregate(name: &str, fastest: StageTime, attempts: u32) -> DriverAggregate {
        DriverAggregate {
            user_id: name.to_string(),
            name: name.to_string(),
            fastest,
            attempts,
            has_completed: fastest.is_finite(),
            vehicle_id: None,
            vehicle_class_id: None,
            vehicle: "-".to_string(),
            vehicle_class: "-".to_string(),
        }
    }

    #[test]
    fn test_completed_before_dnf_with_positions() {
        let entries = rank_leaderboard(vec![
            aggregate("Y", StageTime::NotFinished, 1),
            aggregate("X", StageTime::Finite(58.0), 2),
        ]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "X");
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[0].time, "00:58.000");
        assert_eq!(entries[0].diff, "");
        assert_eq!(entries[1].name, "Y");
        assert_eq!(entries[1].position, 2);
        assert_eq!(entries[1].time, "DNF");
        assert_eq!(entries[1].diff, "");
    }

    #[test]
    fn test_diff_against_leader() {
        let entries = rank_leaderboard(vec![
            aggregate("a", StageTime::Finite(61.234), 1),
            aggregate("b", StageTime::Finite(58.0), 1),
        ]);
        assert_eq!(entries[0].name, "b");
        assert_eq!(entries[0].diff, "");
        assert_eq!(entries[1].name, "a");
        assert_eq!(entries[1].diff, "+00:03.234");
    }

    #[test]
    fn test_tied_times_keep_fold_order_and_empty_diff() {
        let entries = rank_leaderboard(vec![
            aggregate("first", StageTime::Finite(60.0), 1),
            aggregate("second", StageTime::Finite(60.0), 1),
        ]);
        assert_eq!(entries[0].name, "first");
        assert_eq!(entries[1].name, "second");
        assert_eq!(entries[1].diff, "");
    }

    #[test]
    fn test_dnf_only_board_keeps_fold_order() {
        let entries = rank_leaderboard(vec![
            aggregate("y", StageTime::NotFinished, 1),
            aggregate("z", StageTime::NotFinished, 3),
        ]);
        assert_eq!(entries[0].name, "y");
        assert_eq!(entries[1].name, "z");
        assert!(entries.iter().all(|e| e.diff.is_empty()));
    }

    #[test]
    fn test_empty_board() {
        assert!(rank_leaderboard(Vec::new()).is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_rank_is_monotone_with_dnfs_last(
            times in prop::collection::vec(
                prop_oneof![
                    (0.1f64..7200.0).prop_map(StageTime::Finite),
                    Just(StageTime::NotFinished),
                ],
                0..24,
            ),
        ) {
            let aggregates = times
                .iter()
                .enumerate()
                .map(|(i, t)| aggregate(&format!("d{i}"), *t, 1))
                .collect();
            let entries = rank_leaderboard(aggregates);

            for pair in entries.windows(2) {
                prop_assert!(pair[0].raw_time <= pair[1].raw_time);
            }
            for (index, entry) in entries.iter().enumerate() {
                prop_assert_eq!(entry.position, index + 1);
                if entry.raw_time == StageTime::NotFinished {
                    prop_assert_eq!(entry.diff.as_str(), "");
                    prop_assert_eq!(entry.time.as_str(), "DNF");
                }
            }
            if let Some(leader) = entries.first() {
                prop_assert_eq!(leader.diff.as_str(), "");
            }
        }
    }
}
