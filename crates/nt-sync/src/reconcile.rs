use tracing::warn;

use nt_core::title;
use nt_core::types::{Lecture, User};
use nt_notion::{NewRecord, RemoteRecord};

// ---------------------------------------------------------------------------
// Intent & decision
// ---------------------------------------------------------------------------

/// What triggered this reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIntent {
    /// Ensure every local lecture has a remote record, selection-independent.
    BulkSeed,
    /// One user toggled their selection on one lecture.
    Toggle { user: User, selected: bool },
}

/// The per-(user, lecture) decision, ready to apply against one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create(NewRecord),
    UpdateSelection {
        remote_id: String,
        field: String,
    },
    UpdateNumber {
        remote_id: String,
        title: String,
    },
    NoOp(&'static str),
}

/// Reason string for the one policy no-op that callers surface to users.
pub const NO_REMOTE_RECORD: &str =
    "cannot select a lecture that doesn't exist remotely; run a bulk sync first";

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Decide what to do for one lecture in one user's workspace, given the
/// remote search result.
///
/// Duplicate prevention is this function's primary contract: a lecture that
/// already matches remotely never yields `Create`. When more than one
/// candidate matches (a duplicate left by a prior partial failure), the
/// first match in query order wins deterministically and the inconsistency
/// is logged instead of failing the run.
pub fn reconcile(lecture: &Lecture, candidates: &[RemoteRecord], intent: SyncIntent) -> Decision {
    let matches: Vec<&RemoteRecord> = candidates
        .iter()
        .filter(|r| title::title_matches(lecture.lecture_number, &lecture.title, &r.title))
        .collect();

    if matches.len() > 1 {
        warn!(
            lecture = %lecture.numbered_title(),
            matches = matches.len(),
            "multiple remote records match one lecture; using the first"
        );
    }

    let existing = match matches.first() {
        Some(record) => *record,
        None => {
            return match intent {
                SyncIntent::BulkSeed => Decision::Create(NewRecord {
                    title: lecture.numbered_title(),
                    selection_field: lecture.selections.to_string(),
                    date: lecture.date,
                }),
                // A toggle must never fabricate a remote record: orphaned
                // half-created pages are worse than a visible error.
                SyncIntent::Toggle { .. } => Decision::NoOp(NO_REMOTE_RECORD),
            };
        }
    };

    // Numbering repair: the canonical numbering changed upstream and the
    // remote title still carries the old number.
    if title::parse_number(&existing.title) != Some(lecture.lecture_number) {
        return Decision::UpdateNumber {
            remote_id: existing.remote_id.clone(),
            title: lecture.numbered_title(),
        };
    }

    match intent {
        SyncIntent::BulkSeed => Decision::NoOp("already present"),
        SyncIntent::Toggle { user, selected } => {
            let mut selections = existing.selections();
            if !selections.set(user, selected) {
                return Decision::NoOp("selection unchanged");
            }
            Decision::UpdateSelection {
                remote_id: existing.remote_id.clone(),
                field: selections.to_string(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nt_core::types::SelectionSet;

    fn lecture(number: u32, title: &str) -> Lecture {
        Lecture::new(number, title)
    }

    fn remote(id: &str, title: &str, field: &str) -> RemoteRecord {
        RemoteRecord {
            remote_id: id.into(),
            title: title.into(),
            selection_field: field.into(),
        }
    }

    #[test]
    fn bulk_seed_creates_when_absent() {
        let lec = lecture(12, "Kardiologi");
        let decision = reconcile(&lec, &[], SyncIntent::BulkSeed);
        match decision {
            Decision::Create(record) => {
                assert_eq!(record.title, "12. Kardiologi");
                assert_eq!(record.selection_field, "");
            }
            other => panic!("expected Create, got {other:?}"),
        }
    }

    #[test]
    fn bulk_seed_create_carries_local_selections() {
        let mut lec = lecture(12, "Kardiologi");
        lec.selections.insert(User::Gustav);
        lec.selections.insert(User::David);
        match reconcile(&lec, &[], SyncIntent::BulkSeed) {
            Decision::Create(record) => assert_eq!(record.selection_field, "D, G"),
            other => panic!("expected Create, got {other:?}"),
        }
    }

    #[test]
    fn toggle_never_creates() {
        let lec = lecture(12, "Kardiologi");
        let decision = reconcile(
            &lec,
            &[],
            SyncIntent::Toggle {
                user: User::Adam,
                selected: true,
            },
        );
        assert_eq!(decision, Decision::NoOp(NO_REMOTE_RECORD));
    }

    #[test]
    fn bulk_seed_is_noop_when_present() {
        let lec = lecture(12, "Kardiologi");
        let remotes = [remote("r1", "12. Kardiologi", "D")];
        assert_eq!(
            reconcile(&lec, &remotes, SyncIntent::BulkSeed),
            Decision::NoOp("already present")
        );
    }

    #[test]
    fn number_drift_is_repaired() {
        let lec = lecture(13, "Kardiologi");
        let remotes = [remote("r1", "12. Kardiologi", "D")];
        match reconcile(&lec, &remotes, SyncIntent::BulkSeed) {
            Decision::UpdateNumber { remote_id, title } => {
                assert_eq!(remote_id, "r1");
                assert_eq!(title, "13. Kardiologi");
            }
            other => panic!("expected UpdateNumber, got {other:?}"),
        }
    }

    #[test]
    fn number_repair_wins_over_toggle() {
        // Repair first; the toggle lands on a later pass once numbering is
        // consistent again.
        let lec = lecture(13, "Kardiologi");
        let remotes = [remote("r1", "12. Kardiologi", "")];
        let decision = reconcile(
            &lec,
            &remotes,
            SyncIntent::Toggle {
                user: User::Adam,
                selected: true,
            },
        );
        assert!(matches!(decision, Decision::UpdateNumber { .. }));
    }

    #[test]
    fn toggle_adds_letter_in_priority_order() {
        let lec = lecture(12, "Kardiologi");
        let remotes = [remote("r1", "12. Kardiologi", "G")];
        match reconcile(
            &lec,
            &remotes,
            SyncIntent::Toggle {
                user: User::David,
                selected: true,
            },
        ) {
            Decision::UpdateSelection { remote_id, field } => {
                assert_eq!(remote_id, "r1");
                assert_eq!(field, "D, G");
            }
            other => panic!("expected UpdateSelection, got {other:?}"),
        }
    }

    #[test]
    fn redundant_toggle_is_noop() {
        let lec = lecture(12, "Kardiologi");
        let remotes = [remote("r1", "12. Kardiologi", "D, A")];
        let decision = reconcile(
            &lec,
            &remotes,
            SyncIntent::Toggle {
                user: User::Adam,
                selected: true,
            },
        );
        assert_eq!(decision, Decision::NoOp("selection unchanged"));
    }

    #[test]
    fn toggle_off_then_on_restores_field_byte_for_byte() {
        let lec = lecture(12, "Kardiologi");
        let original = "D, A, G";
        let remotes = [remote("r1", "12. Kardiologi", original)];

        let after_off = match reconcile(
            &lec,
            &remotes,
            SyncIntent::Toggle {
                user: User::Adam,
                selected: false,
            },
        ) {
            Decision::UpdateSelection { field, .. } => field,
            other => panic!("expected UpdateSelection, got {other:?}"),
        };
        assert_eq!(after_off, "D, G");

        let remotes = [remote("r1", "12. Kardiologi", &after_off)];
        let after_on = match reconcile(
            &lec,
            &remotes,
            SyncIntent::Toggle {
                user: User::Adam,
                selected: true,
            },
        ) {
            Decision::UpdateSelection { field, .. } => field,
            other => panic!("expected UpdateSelection, got {other:?}"),
        };
        assert_eq!(after_on, original);
    }

    #[test]
    fn duplicate_candidates_use_first_deterministically() {
        let lec = lecture(12, "Kardiologi");
        let remotes = [
            remote("first", "12. Kardiologi", ""),
            remote("second", "12. Kardiologi", ""),
        ];
        match reconcile(
            &lec,
            &remotes,
            SyncIntent::Toggle {
                user: User::David,
                selected: true,
            },
        ) {
            Decision::UpdateSelection { remote_id, .. } => assert_eq!(remote_id, "first"),
            other => panic!("expected UpdateSelection, got {other:?}"),
        }
    }

    #[test]
    fn unrelated_candidates_are_ignored() {
        let lec = lecture(12, "Kardiologi");
        // Shares the numeric prefix only; must not block creation.
        let remotes = [remote("r9", "12. Njurmedicin", "")];
        assert!(matches!(
            reconcile(&lec, &remotes, SyncIntent::BulkSeed),
            Decision::Create(_)
        ));
    }

    #[test]
    fn malformed_selection_field_degrades_to_empty_set() {
        let lec = lecture(12, "Kardiologi");
        let remotes = [remote("r1", "12. Kardiologi", "???")];
        match reconcile(
            &lec,
            &remotes,
            SyncIntent::Toggle {
                user: User::Adam,
                selected: true,
            },
        ) {
            Decision::UpdateSelection { field, .. } => assert_eq!(field, "A"),
            other => panic!("expected UpdateSelection, got {other:?}"),
        }
    }

    #[test]
    fn selection_set_matches_lecture_field_type() {
        // Guards the derived-projection invariant: a remote field written from
        // a local SelectionSet parses back into the identical set.
        let mut set = SelectionSet::new();
        set.insert(User::Adam);
        set.insert(User::Gustav);
        assert_eq!(SelectionSet::parse(&set.to_string()), set);
    }
}
