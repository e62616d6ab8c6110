use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::selection::Environment;

/// Per-generation state: the seeded random source and the stack of label
/// environments opened by the references and groups being expanded.
///
/// A context belongs to exactly one generation at a time. Run parallel
/// generations with one context each.
#[derive(Debug)]
pub struct Context {
    rng: StdRng,
    seed: u64,
    base: Environment,
    scopes: Vec<Environment>,
}

impl Context {
    /// Create a context from an optional seed. Without one a fresh seed is
    /// drawn and recorded, so the run can still be reproduced.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random::<u64>);
        log::debug!("seed used: {}", seed);
        Context {
            rng: StdRng::seed_from_u64(seed),
            seed,
            base: Environment::default(),
            scopes: Vec::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    /// The seed this context was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniformly distributed integer in `[low, high]`
    pub fn get_random_number(&mut self, low: usize, high: usize) -> usize {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    /// The innermost active environment
    pub fn environment(&self) -> &Environment {
        self.scopes.last().unwrap_or(&self.base)
    }

    /// Nesting depth of the environment stack
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Run `f` with `environment` active. The environment is removed again
    /// when `f` returns, whatever it returns.
    pub fn scoped<T>(&mut self, environment: Environment, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(environment);
        let output = f(self);
        self.scopes.pop();
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut first = Context::with_seed(42);
        let mut second = Context::with_seed(42);
        let a: Vec<usize> = (0..32).map(|_| first.get_random_number(0, 9)).collect();
        let b: Vec<usize> = (0..32).map(|_| second.get_random_number(0, 9)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_numbers_stay_in_inclusive_range() {
        let mut context = Context::with_seed(7);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let n = context.get_random_number(2, 4);
            assert!((2..=4).contains(&n));
            seen[n - 2] = true;
        }
        assert_eq!(seen, [true, true, true]);
        assert_eq!(context.get_random_number(5, 5), 5);
    }

    #[test]
    fn test_unseeded_context_records_its_seed() {
        let mut context = Context::new(None);
        let mut replay = Context::with_seed(context.seed());
        assert_eq!(
            context.get_random_number(0, 1000),
            replay.get_random_number(0, 1000)
        );
    }

    #[test]
    fn test_scope_is_popped_after_callback() {
        let mut context = Context::with_seed(0);
        let result: Result<(), String> =
            context.scoped(Environment::from_labels(["M"]), |context| {
                assert!(context.environment().contains("M"));
                assert_eq!(context.depth(), 1);
                Err("failed".to_string())
            });
        assert!(result.is_err());
        assert_eq!(context.depth(), 0);
        assert!(context.environment().is_empty());
    }

    #[test]
    fn test_nested_scopes_restore_outer_environment() {
        let mut context = Context::with_seed(0);
        context.scoped(Environment::from_labels(["S"]), |context| {
            context.scoped(Environment::from_labels(["P"]), |context| {
                assert!(context.environment().contains("P"));
            });
            assert!(context.environment().contains("S"));
            assert!(!context.environment().contains("P"));
        });
    }
}
