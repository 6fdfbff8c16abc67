//! Property tests for the submission-file filter.

use std::collections::BTreeSet;

use proptest::prelude::*;

use retract_files::filter_pid_records;
use retract_model::PidFileColumn;

fn render_csv(rows: &[(String, String)]) -> Vec<u8> {
    let mut content = String::from("person_id,value\n");
    for (pid, value) in rows {
        content.push_str(pid);
        content.push(',');
        content.push_str(value);
        content.push('\n');
    }
    content.into_bytes()
}

proptest! {
    /// Filtering twice with the same pid set removes nothing on the second
    /// pass and leaves the content byte-identical.
    #[test]
    fn prop_filtering_is_idempotent(
        rows in proptest::collection::vec(
            (
                prop_oneof![
                    (0i64..200).prop_map(|pid| pid.to_string()),
                    "[a-z]{1,6}",
                ],
                "[a-z0-9 ]{0,10}",
            ),
            0..20,
        ),
        pids in proptest::collection::btree_set(0i64..200, 0..10),
    ) {
        let content = render_csv(&rows);
        let once = filter_pid_records("f.csv", &content, PidFileColumn::First, &pids).unwrap();
        let twice =
            filter_pid_records("f.csv", &once.content, PidFileColumn::First, &pids).unwrap();
        prop_assert_eq!(twice.records_removed, 0);
        prop_assert_eq!(&twice.content, &once.content);
    }

    /// A record whose pid field is non-numeric survives any pid set.
    #[test]
    fn prop_non_numeric_pids_survive(
        token in "[a-z]{1,8}",
        pids in proptest::collection::btree_set(0i64..1000, 0..20),
    ) {
        let content = format!("person_id,value\n{token},x\n");
        let outcome =
            filter_pid_records("f.csv", content.as_bytes(), PidFileColumn::First, &pids).unwrap();
        prop_assert_eq!(outcome.records_removed, 0);
        prop_assert!(String::from_utf8(outcome.content).unwrap().contains(&token));
    }

    /// Every removed record's pid is in the set, and every surviving
    /// numeric pid is not.
    #[test]
    fn prop_exactly_the_matching_records_are_removed(
        row_pids in proptest::collection::vec(0i64..50, 1..20),
        pids in proptest::collection::btree_set(0i64..50, 0..10),
    ) {
        let rows: Vec<(String, String)> = row_pids
            .iter()
            .map(|pid| (pid.to_string(), "x".to_string()))
            .collect();
        let content = render_csv(&rows);
        let outcome =
            filter_pid_records("f.csv", &content, PidFileColumn::First, &pids).unwrap();
        let expected_removed = row_pids.iter().filter(|pid| pids.contains(pid)).count();
        prop_assert_eq!(outcome.records_removed, expected_removed);
        let survivors = String::from_utf8(outcome.content).unwrap();
        for line in survivors.lines().skip(1) {
            let pid: i64 = line.split(',').next().unwrap().parse().unwrap();
            prop_assert!(!pids.contains(&pid));
        }
    }
}

#[test]
fn test_empty_file_yields_empty_output() {
    let pids: BTreeSet<i64> = [42].into_iter().collect();
    let outcome = filter_pid_records("f.csv", b"", PidFileColumn::First, &pids).unwrap();
    assert_eq!(outcome.records_kept, 0);
    assert_eq!(outcome.records_removed, 0);
    assert!(outcome.content.is_empty());
}
