//! Action sets and action spaces

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{OomdpError, Result};

/// A finite, closed set of action symbols
///
/// `all()` fixes the enumeration order, which is also the tie-breaking
/// order wherever several actions are equally good.
pub trait Action: Copy + Eq + Ord + Hash + Debug + Serialize + Send + Sync + 'static {
    /// Every action, in enumeration order
    fn all() -> &'static [Self];

    /// Symbolic name
    fn name(self) -> &'static str;

    /// Position in `all()`
    fn index(self) -> usize {
        Self::all().iter().position(|a| *a == self).unwrap_or_default()
    }

    /// Number of actions
    fn count() -> usize {
        Self::all().len()
    }

    /// Action at an enumeration index
    fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }

    /// Action by (case-insensitive) name
    fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(name))
    }
}

/// Raw discrete action symbol, as received from outside the typed API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteAction(pub usize);

impl DiscreteAction {
    /// Resolve into a typed action, failing with `IllegalAction` outside the set
    pub fn resolve<A: Action>(self) -> Result<A> {
        A::from_index(self.0).ok_or_else(|| {
            OomdpError::IllegalAction(format!(
                "action index {} outside 0..{}",
                self.0,
                A::count()
            ))
        })
    }
}

/// Resolve an action by name, failing with `IllegalAction` outside the set
pub fn parse_action<A: Action>(name: &str) -> Result<A> {
    A::from_name(name).ok_or_else(|| OomdpError::IllegalAction(format!("unknown action `{name}`")))
}

/// Discrete action space over `n` symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscreteSpace {
    /// Number of discrete actions
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// The space of a typed action set
    #[must_use]
    pub fn of<A: Action>() -> Self {
        Self::new(A::count())
    }

    /// Sample a symbol uniformly from an injected random source
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DiscreteAction {
        DiscreteAction(rng.gen_range(0..self.n))
    }

    /// Whether a symbol belongs to the space
    #[must_use]
    pub fn contains(&self, action: DiscreteAction) -> bool {
        action.0 < self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    enum Toggle {
        Left,
        Right,
    }

    impl Action for Toggle {
        fn all() -> &'static [Self] {
            &[Toggle::Left, Toggle::Right]
        }

        fn name(self) -> &'static str {
            match self {
                Toggle::Left => "Left",
                Toggle::Right => "Right",
            }
        }
    }

    #[test]
    fn test_index_round_trip() {
        assert_eq!(Toggle::Right.index(), 1);
        assert_eq!(Toggle::from_index(0), Some(Toggle::Left));
        assert_eq!(Toggle::from_name("right"), Some(Toggle::Right));
    }

    #[test]
    fn test_illegal_symbols() {
        assert!(matches!(
            DiscreteAction(2).resolve::<Toggle>(),
            Err(OomdpError::IllegalAction(_))
        ));
        assert!(matches!(parse_action::<Toggle>("Up"), Err(OomdpError::IllegalAction(_))));
        assert_eq!(DiscreteAction(1).resolve::<Toggle>().unwrap(), Toggle::Right);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let space = DiscreteSpace::of::<Toggle>();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            let x = space.sample(&mut a);
            assert!(space.contains(x));
            assert_eq!(x, space.sample(&mut b));
        }
    }
}
