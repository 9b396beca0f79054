//! Action-value functions and greedy selection

use crate::{Action, State};

/// Action value function Q(s, a)
pub trait ActionValueFunction {
    /// Action type
    type Action: Action;

    /// Q-values of every action, in enumeration order, if the state is known
    fn q_values(&self, state: &State) -> Option<Vec<f64>>;

    /// Best action and its value; ties go to the lowest enumeration index
    fn best_action_value(&self, state: &State) -> Option<(Self::Action, f64)> {
        let q = self.q_values(state)?;
        let index = greedy_index(&q)?;
        Self::Action::from_index(index).map(|a| (a, q[index]))
    }
}

/// Index of the first maximal value
#[must_use]
pub fn greedy_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_go_to_lowest_index() {
        assert_eq!(greedy_index(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(greedy_index(&[5.0, 5.0]), Some(0));
        assert_eq!(greedy_index(&[]), None);
    }
}
