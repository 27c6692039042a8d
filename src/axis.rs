//! Numeric axes for periods and ages.
//!
//! Periods and ages are string-typed at the tabular boundary ("1", "2", …) but all lag
//! arithmetic is integer arithmetic. An [`Axis`] owns both views: the ordered labels used in
//! parameter keys and result rows, and the parsed numbers used for offsets.
use crate::error::PlanningError;
use anyhow::Result;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::rc::Rc;

/// An ordered axis of integer-labelled members.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Axis {
    labels: IndexSet<Rc<str>>,
    numbers: Vec<i64>,
    by_number: HashMap<i64, usize>,
}

impl Axis {
    /// Build an axis from string labels, sorting numerically and rejecting non-integers.
    ///
    /// `minimum` is the smallest admissible value (1 for periods, 0 for ages). Duplicates
    /// collapse to one member.
    pub fn from_labels<I: IntoIterator<Item = String>>(
        what: &str,
        labels: I,
        minimum: i64,
    ) -> Result<Axis> {
        let mut numbers: Vec<i64> = Vec::new();
        for label in labels {
            let number: i64 = label.trim().parse().map_err(|_| {
                PlanningError::InputSemantic(format!(
                    "{what} {label:?} does not parse as an integer"
                ))
            })?;
            if number < minimum {
                return Err(PlanningError::InputSemantic(format!(
                    "{what} {number} is below the minimum of {minimum}"
                ))
                .into());
            }
            numbers.push(number);
        }
        numbers.sort_unstable();
        numbers.dedup();

        Ok(Self::from_numbers(numbers))
    }

    /// Build an axis directly from sorted, deduplicated numbers.
    pub fn from_numbers(numbers: Vec<i64>) -> Axis {
        let labels = numbers.iter().map(|n| Rc::from(n.to_string())).collect();
        let by_number = numbers.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        Axis {
            labels,
            numbers,
            by_number,
        }
    }

    /// The axis derived by shifting every member down one step (ages from periods).
    pub fn predecessors(&self) -> Axis {
        Axis::from_numbers(self.numbers.iter().map(|n| n - 1).collect())
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    /// Whether the axis has no members.
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// The label at a position.
    pub fn label(&self, index: usize) -> &Rc<str> {
        self.labels.get_index(index).expect("Axis index in range")
    }

    /// The number at a position.
    pub fn number(&self, index: usize) -> i64 {
        self.numbers[index]
    }

    /// The ordered label set (for use as a parameter key domain).
    pub fn labels(&self) -> &IndexSet<Rc<str>> {
        &self.labels
    }

    /// The position holding `number`, if the axis has it.
    pub fn position_of(&self, number: i64) -> Option<usize> {
        self.by_number.get(&number).copied()
    }

    /// The position reached from `index` by subtracting `lag`, if it is on the axis.
    pub fn lagged(&self, index: usize, lag: i64) -> Option<usize> {
        self.position_of(self.numbers[index] - lag)
    }

    /// The last position whose number is at most `number`, if any member qualifies.
    pub fn position_at_or_before(&self, number: i64) -> Option<usize> {
        match self.numbers.partition_point(|&n| n <= number) {
            0 => None,
            p => Some(p - 1),
        }
    }

    /// Iterate over `(position, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Rc<str>)> + Clone {
        self.labels.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_labels_sorts_numerically() {
        let axis =
            Axis::from_labels("period", ["10", "2", "1"].map(String::from), 1).unwrap();
        assert_eq!(axis.len(), 3);
        assert_eq!(axis.number(0), 1);
        assert_eq!(axis.number(2), 10);
        assert_eq!(axis.label(2).as_ref(), "10");
    }

    #[test]
    fn test_from_labels_rejects_bad_values() {
        assert!(Axis::from_labels("period", ["one".to_string()], 1).is_err());
        assert!(Axis::from_labels("period", ["0".to_string()], 1).is_err());
        assert!(Axis::from_labels("age", ["0".to_string()], 0).is_ok());
    }

    #[test]
    fn test_lagged() {
        let axis = Axis::from_labels("period", ["1", "2", "3"].map(String::from), 1).unwrap();
        assert_eq!(axis.lagged(2, 1), Some(1));
        assert_eq!(axis.lagged(2, 0), Some(2));
        // Lagging off the start of the horizon yields nothing
        assert_eq!(axis.lagged(0, 1), None);
    }

    #[test]
    fn test_predecessors() {
        let periods = Axis::from_labels("period", ["1", "2"].map(String::from), 1).unwrap();
        let ages = periods.predecessors();
        assert_eq!(ages.number(0), 0);
        assert_eq!(ages.label(1).as_ref(), "1");
    }
}
