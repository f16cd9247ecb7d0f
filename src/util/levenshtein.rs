//! Bounded Levenshtein distance, used for typo expansion.

use std::cmp::min;

/// Levenshtein distance between `s1` and `s2` if it does not exceed
/// `threshold`. Rows whose minimum already exceeds the threshold stop early.
#[allow(clippy::needless_range_loop)]
pub fn levenshtein_distance_threshold(s1: &str, s2: &str, threshold: usize) -> Option<usize> {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();

    if len1.abs_diff(len2) > threshold {
        return None;
    }
    if len1 == 0 || len2 == 0 {
        let distance = len1.max(len2);
        return (distance <= threshold).then_some(distance);
    }

    let mut prev_row: Vec<usize> = (0..=len2).collect();
    let mut curr_row = vec![0; len2 + 1];

    for i in 1..=len1 {
        curr_row[0] = i;
        let mut min_in_row = i;

        for j in 1..=len2 {
            let cost = usize::from(s1_chars[i - 1] != s2_chars[j - 1]);
            curr_row[j] = min(
                min(prev_row[j] + 1, curr_row[j - 1] + 1),
                prev_row[j - 1] + cost,
            );
            min_in_row = min(min_in_row, curr_row[j]);
        }

        if min_in_row > threshold {
            return None;
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    let distance = prev_row[len2];
    (distance <= threshold).then_some(distance)
}

/// Edit distance tolerated for a typo search on `term`: one edit for short
/// terms, two otherwise.
pub fn typo_threshold(term: &str) -> usize {
    if term.chars().count() <= 4 { 1 } else { 2 }
}
