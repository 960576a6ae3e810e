//! Correctness streaks over a user's answer history

/// Length of the longest run of consecutive `true` verdicts.
///
/// Input must already be ordered by submission time. Returns 0 for an empty
/// history or one without any correct answer.
pub fn longest_streak<I>(verdicts: I) -> u32
where
    I: IntoIterator<Item = bool>,
{
    let mut longest = 0;
    let mut current = 0;

    for is_correct in verdicts {
        if is_correct {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }

    longest
}
