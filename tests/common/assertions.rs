//! Domain-specific assertion macros for cwtail harnesses.
//!
//! These wrap `pretty_assertions` and add failure messages that make it clear
//! which tailing guarantee was violated.

// ---------------------------------------------------------------------------
// Event assertions
// ---------------------------------------------------------------------------

/// Assert the ids of a slice of events, in order.
///
/// ```rust
/// assert_event_ids!(events, ["a", "b"]);
/// ```
#[macro_export]
macro_rules! assert_event_ids {
    ($events:expr, [$($id:expr),* $(,)?]) => {{
        let events = &$events;
        let actual: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
        let expected: Vec<&str> = vec![$($id),*];
        pretty_assertions::assert_eq!(actual, expected, "emitted event ids differ");
    }};
}

/// Assert that no event id appears twice.
#[macro_export]
macro_rules! assert_no_duplicates {
    ($events:expr) => {{
        let mut seen = std::collections::HashSet::new();
        for event in $events.iter() {
            if !seen.insert(event.event_id.clone()) {
                panic!(
                    "assert_no_duplicates! failed: {:?} emitted more than once",
                    event.event_id
                );
            }
        }
    }};
}

/// Assert events of each group arrive in non-decreasing timestamp order.
#[macro_export]
macro_rules! assert_ordered_per_group {
    ($events:expr) => {{
        let mut last: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
        for event in $events.iter() {
            let prev = last.entry(event.group.clone()).or_insert(i64::MIN);
            if event.timestamp < *prev {
                panic!(
                    "assert_ordered_per_group! failed: {} ({}) arrived after ts {} in group {}",
                    event.event_id, event.timestamp, prev, event.group
                );
            }
            *prev = event.timestamp;
        }
    }};
}
