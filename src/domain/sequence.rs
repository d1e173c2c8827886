//! Integer and letter sequences used to expand ranges and label the grid.

/// Returns the integers from `start` to `end`, both inclusive.
///
/// An `end` smaller than `start` yields an empty sequence.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::sequence::range;
///
/// assert_eq!(range(3, 6), vec![3, 4, 5, 6]);
/// assert!(range(6, 3).is_empty());
/// ```
pub fn range(start: i64, end: i64) -> Vec<i64> {
    (start..=end).collect()
}

/// Returns the characters from `start` to `end` by character code, both inclusive.
///
/// Codes in the range that are not valid scalar values are skipped.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::sequence::char_range;
///
/// assert_eq!(char_range('A', 'D'), vec!['A', 'B', 'C', 'D']);
/// ```
pub fn char_range(start: char, end: char) -> Vec<char> {
    range(start as i64, end as i64)
        .into_iter()
        .filter_map(|code| u32::try_from(code).ok().and_then(char::from_u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_inclusive() {
        assert_eq!(range(1, 1), vec![1]);
        assert_eq!(range(1, 5).len(), 5);
        assert_eq!(range(-2, 1), vec![-2, -1, 0, 1]);
    }

    #[test]
    fn test_range_reversed_is_empty() {
        assert!(range(2, 1).is_empty());
    }

    #[test]
    fn test_char_range_grid_columns() {
        let columns: String = char_range('A', 'J').into_iter().collect();
        assert_eq!(columns, "ABCDEFGHIJ");
    }

    #[test]
    fn test_char_range_single_and_reversed() {
        assert_eq!(char_range('C', 'C'), vec!['C']);
        assert!(char_range('J', 'A').is_empty());
    }
}
