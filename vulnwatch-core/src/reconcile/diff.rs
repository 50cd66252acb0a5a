use std::collections::BTreeSet;

use crate::types::EngagementId;

/// Which relation holds between tracker ids `T` and local ids `L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileCase {
    /// `T == L`
    InSync,
    /// `L ⊂ T`: only inserts.
    TrackerSuperset,
    /// `T ⊂ L`: only deletes.
    LocalSuperset,
    /// No overlap and both sides non-empty.
    Disjoint,
    PartialOverlap,
}

/// Store mutations that bring the local id set in line with the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub case: ReconcileCase,
    pub delete: Vec<EngagementId>,
    pub insert: Vec<EngagementId>,
    /// Present on both sides; candidates for a timestamp refresh.
    pub common: Vec<EngagementId>,
}

impl ReconcilePlan {
    pub fn compute(tracker: &BTreeSet<EngagementId>, local: &BTreeSet<EngagementId>) -> Self {
        let common: BTreeSet<EngagementId> = tracker.intersection(local).copied().collect();

        let case = if tracker == local {
            ReconcileCase::InSync
        } else if common == *local {
            ReconcileCase::TrackerSuperset
        } else if common == *tracker {
            ReconcileCase::LocalSuperset
        } else if common.is_empty() {
            ReconcileCase::Disjoint
        } else {
            ReconcileCase::PartialOverlap
        };

        let (delete, insert) = match case {
            ReconcileCase::InSync => (Vec::new(), Vec::new()),
            ReconcileCase::TrackerSuperset => (Vec::new(), difference(tracker, local)),
            ReconcileCase::LocalSuperset => (difference(local, tracker), Vec::new()),
            ReconcileCase::Disjoint => (
                local.iter().copied().collect(),
                tracker.iter().copied().collect(),
            ),
            ReconcileCase::PartialOverlap => {
                (difference(local, &common), difference(tracker, &common))
            }
        };

        Self {
            case,
            delete,
            insert,
            common: common.into_iter().collect(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.delete.is_empty() && self.insert.is_empty()
    }
}

fn difference(a: &BTreeSet<EngagementId>, b: &BTreeSet<EngagementId>) -> Vec<EngagementId> {
    a.difference(b).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> BTreeSet<EngagementId> {
        raw.iter().copied().map(EngagementId).collect()
    }

    fn vec_ids(raw: &[i64]) -> Vec<EngagementId> {
        raw.iter().copied().map(EngagementId).collect()
    }

    #[test]
    fn partial_overlap_deletes_and_inserts_the_edges() {
        let plan = ReconcilePlan::compute(&ids(&[2, 3]), &ids(&[1, 2]));
        assert_eq!(plan.case, ReconcileCase::PartialOverlap);
        assert_eq!(plan.delete, vec_ids(&[1]));
        assert_eq!(plan.insert, vec_ids(&[3]));
        assert_eq!(plan.common, vec_ids(&[2]));
    }

    #[test]
    fn classifies_every_case() {
        let case = |t: &[i64], l: &[i64]| ReconcilePlan::compute(&ids(t), &ids(l)).case;

        assert_eq!(case(&[1, 2], &[1, 2]), ReconcileCase::InSync);
        assert_eq!(case(&[], &[]), ReconcileCase::InSync);
        assert_eq!(case(&[1, 2, 3], &[1]), ReconcileCase::TrackerSuperset);
        assert_eq!(case(&[1, 2], &[]), ReconcileCase::TrackerSuperset);
        assert_eq!(case(&[1], &[1, 2]), ReconcileCase::LocalSuperset);
        assert_eq!(case(&[], &[4]), ReconcileCase::LocalSuperset);
        assert_eq!(case(&[5, 6], &[1, 2]), ReconcileCase::Disjoint);
    }

    #[test]
    fn applying_any_plan_yields_the_tracker_set() {
        let samples: &[(&[i64], &[i64])] = &[
            (&[], &[]),
            (&[1], &[]),
            (&[], &[1]),
            (&[1, 2, 3], &[2]),
            (&[2], &[1, 2, 3]),
            (&[1, 2], &[3, 4]),
            (&[1, 2, 5], &[2, 3, 5, 8]),
        ];

        for (tracker, local) in samples {
            let tracker = ids(tracker);
            let mut local = ids(local);
            let plan = ReconcilePlan::compute(&tracker, &local);

            for id in &plan.delete {
                assert!(local.remove(id), "deleted {id} twice or never stored");
            }
            for id in &plan.insert {
                assert!(local.insert(*id), "inserted {id} twice");
            }
            assert_eq!(local, tracker);
            assert!(ReconcilePlan::compute(&tracker, &local).is_noop());
        }
    }
}
