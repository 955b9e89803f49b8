use std::collections::BTreeMap;

use crate::pr::{Review, ReviewState};

/// Each reviewer's standing review at `head_sha`.
///
/// Only reviews submitted against the head commit count, and only the latest
/// (highest id) per reviewer. Comments and pending reviews leave a reviewer's
/// standing state untouched, so they are skipped. Ordered by reviewer login.
pub fn standing_reviews<'a>(reviews: &'a [Review], head_sha: &str) -> Vec<&'a Review> {
    let mut latest: BTreeMap<&str, &Review> = BTreeMap::new();
    for review in reviews {
        if review.commit_id != head_sha || !sets_state(review.state) {
            continue;
        }
        latest
            .entry(review.reviewer.as_str())
            .and_modify(|current| {
                if review.id > current.id {
                    *current = review;
                }
            })
            .or_insert(review);
    }
    latest.into_values().collect()
}

/// Reviews that block auto-approval: a standing "changes requested" at head.
pub fn blocking_reviews<'a>(reviews: &'a [Review], head_sha: &str) -> Vec<&'a Review> {
    standing_reviews(reviews, head_sha)
        .into_iter()
        .filter(|r| r.state == ReviewState::ChangesRequested)
        .collect()
}

fn sets_state(state: ReviewState) -> bool {
    matches!(
        state,
        ReviewState::Approved | ReviewState::ChangesRequested | ReviewState::Dismissed
    )
}
