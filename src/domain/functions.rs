//! Built-in spreadsheet functions.
//!
//! Every function takes the flattened numeric arguments of a call and returns
//! either a single number or a list. Names are matched case-insensitively.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rand::Rng;

use super::models::Value;
use super::sequence;

/// Longest list the `range` function will produce.
pub const MAX_SEQUENCE_LEN: usize = 65_536;

/// Function signature for built-in and user-defined functions.
pub type FunctionImpl = fn(&[f64]) -> Value;

static BUILTINS: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// Registry for spreadsheet functions.
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionImpl>,
}

impl FunctionRegistry {
    /// Creates a new function registry with built-in functions.
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_builtin_functions();
        registry
    }

    /// The process-wide table of built-in functions.
    pub fn builtin() -> &'static FunctionRegistry {
        &BUILTINS
    }

    /// Registers a new function in the registry.
    pub fn register_function(&mut self, name: &str, func: FunctionImpl) {
        self.functions.insert(name.to_lowercase(), func);
    }

    /// Gets a function by name.
    pub fn get_function(&self, name: &str) -> Option<&FunctionImpl> {
        self.functions.get(&name.to_lowercase())
    }

    fn register_builtin_functions(&mut self) {
        self.register_function("sum", |args| Value::Number(sum(args)));
        self.register_function("average", |args| Value::Number(average(args)));
        self.register_function("median", |args| Value::Number(median(args)));

        self.register_function("even", |args| {
            args.iter().copied().filter(|&n| is_even(n)).collect::<Vec<_>>().into()
        });
        self.register_function("someeven", |args| args.iter().any(|&n| is_even(n)).into());
        self.register_function("everyeven", |args| args.iter().all(|&n| is_even(n)).into());

        self.register_function("firsttwo", |args| args[..args.len().min(2)].to_vec().into());
        self.register_function("lasttwo", |args| {
            args[args.len().saturating_sub(2)..].to_vec().into()
        });

        self.register_function("has2", |args| args.contains(&2.0).into());
        self.register_function("increment", |args| {
            args.iter().map(|n| n + 1.0).collect::<Vec<_>>().into()
        });

        self.register_function("random", |args| match args {
            [low, high, ..] => {
                let unit: f64 = rand::thread_rng().r#gen();
                Value::Number((unit * (high - low) + low).floor())
            }
            _ => Value::Number(f64::NAN),
        });

        self.register_function("range", |args| match args {
            [start, end, ..] => number_range(*start, *end).into(),
            _ => Value::List(Vec::new()),
        });

        self.register_function("nodupes", |args| {
            let mut unique: Vec<f64> = Vec::with_capacity(args.len());
            for &n in args {
                if !unique.iter().any(|&seen| same_value(seen, n)) {
                    unique.push(n);
                }
            }
            unique.into()
        });

        // A bare parenthesised list, e.g. `(1,2)` or `(2+3)`.
        self.register_function("", |args| args.to_vec().into());
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_even(n: f64) -> bool {
    n % 2.0 == 0.0
}

fn sum(nums: &[f64]) -> f64 {
    nums.iter().sum()
}

fn average(nums: &[f64]) -> f64 {
    sum(nums) / nums.len() as f64
}

fn median(nums: &[f64]) -> f64 {
    let mut sorted = nums.to_vec();
    sorted.sort_by(f64::total_cmp);

    let len = sorted.len();
    if len == 0 {
        f64::NAN
    } else if len % 2 == 0 {
        average(&sorted[len / 2 - 1..=len / 2])
    } else {
        sorted[len / 2]
    }
}

// NaN matches NaN and 0 matches -0, as in set membership.
fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn number_range(start: f64, end: f64) -> Vec<f64> {
    let count = end - start + 1.0;
    let integral = start.fract() == 0.0 && end.fract() == 0.0;
    if !integral || !count.is_finite() || count < 0.0 || count > MAX_SEQUENCE_LEN as f64 {
        return Vec::new();
    }

    sequence::range(start as i64, end as i64)
        .into_iter()
        .map(|n| n as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[f64]) -> Value {
        let func = FunctionRegistry::builtin()
            .get_function(name)
            .unwrap_or_else(|| panic!("{} should be registered", name));
        func(args)
    }

    fn number(value: Value) -> f64 {
        match value {
            Value::Number(n) => n,
            other => panic!("Expected a number, got {:?}", other),
        }
    }

    #[test]
    fn test_function_registry() {
        let mut registry = FunctionRegistry::new();

        for name in [
            "sum", "average", "median", "even", "someeven", "everyeven", "firsttwo",
            "lasttwo", "has2", "increment", "random", "range", "nodupes", "",
        ] {
            assert!(registry.get_function(name).is_some(), "missing {}", name);
        }

        assert!(registry.get_function("SUM").is_some());
        assert!(registry.get_function("Sum").is_some());
        assert!(registry.get_function("UNKNOWN").is_none());

        registry.register_function("DOUBLE", |args| {
            args.iter().map(|n| n * 2.0).collect::<Vec<_>>().into()
        });
        let double_func = registry.get_function("double").unwrap();
        assert_eq!(double_func(&[5.0]), Value::List(vec![10.0]));
        assert!(FunctionRegistry::builtin().get_function("double").is_none());
    }

    #[test]
    fn test_sum_and_average() {
        assert_eq!(call("sum", &[1.0, 2.0, 3.0]), Value::Number(6.0));
        assert_eq!(call("sum", &[]), Value::Number(0.0));
        assert_eq!(call("average", &[2.0, 4.0, 6.0]), Value::Number(4.0));
        assert!(number(call("average", &[])).is_nan());
    }

    #[test]
    fn test_median_odd_lengths() {
        assert_eq!(call("median", &[3.0, 1.0, 2.0]), Value::Number(2.0));
        assert_eq!(call("median", &[9.0, 1.0, 5.0, 3.0, 7.0]), Value::Number(5.0));
    }

    #[test]
    fn test_median_even_length() {
        assert_eq!(call("median", &[4.0, 1.0, 3.0, 2.0]), Value::Number(2.5));
        assert_eq!(call("median", &[10.0, 20.0]), Value::Number(15.0));
        assert!(number(call("median", &[])).is_nan());
    }

    #[test]
    fn test_even_predicates() {
        assert_eq!(call("even", &[1.0, 2.0, 3.0, 4.0]), Value::List(vec![2.0, 4.0]));
        assert_eq!(call("even", &[1.5, 3.0]), Value::List(vec![]));
        assert_eq!(call("someeven", &[1.0, 3.0, 4.0]), Value::Number(1.0));
        assert_eq!(call("someeven", &[1.0, 3.0]), Value::Number(0.0));
        assert_eq!(call("everyeven", &[2.0, 4.0]), Value::Number(1.0));
        assert_eq!(call("everyeven", &[2.0, 5.0]), Value::Number(0.0));
        assert_eq!(call("everyeven", &[]), Value::Number(1.0));
    }

    #[test]
    fn test_first_and_last_two() {
        assert_eq!(call("firsttwo", &[5.0, 6.0, 7.0]), Value::List(vec![5.0, 6.0]));
        assert_eq!(call("lasttwo", &[5.0, 6.0, 7.0]), Value::List(vec![6.0, 7.0]));
        assert_eq!(call("firsttwo", &[5.0]), Value::List(vec![5.0]));
        assert_eq!(call("lasttwo", &[]), Value::List(vec![]));
    }

    #[test]
    fn test_has2_and_increment() {
        assert_eq!(call("has2", &[1.0, 2.0]), Value::Number(1.0));
        assert_eq!(call("has2", &[1.0, 3.0]), Value::Number(0.0));
        assert_eq!(call("increment", &[1.0, 2.0, 3.0]), Value::List(vec![2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_random_bounds() {
        for _ in 0..100 {
            let n = number(call("random", &[1.0, 10.0]));
            assert!((1.0..10.0).contains(&n), "{} out of range", n);
            assert_eq!(n.fract(), 0.0);
        }
        assert!(number(call("random", &[1.0])).is_nan());
    }

    #[test]
    fn test_range_function() {
        assert_eq!(call("range", &[1.0, 4.0]), Value::List(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(call("range", &[4.0, 1.0]), Value::List(vec![]));
        assert_eq!(call("range", &[1.5, 3.0]), Value::List(vec![]));
        assert_eq!(call("range", &[1.0, 1e12]), Value::List(vec![]));
        assert_eq!(call("range", &[1.0]), Value::List(vec![]));
    }

    #[test]
    fn test_nodupes() {
        assert_eq!(
            call("nodupes", &[3.0, 1.0, 3.0, 2.0, 1.0]),
            Value::List(vec![3.0, 1.0, 2.0])
        );

        match call("nodupes", &[f64::NAN, f64::NAN, 0.0, -0.0]) {
            Value::List(items) => {
                assert_eq!(items.len(), 2);
                assert!(items[0].is_nan());
                assert_eq!(items[1], 0.0);
            }
            other => panic!("Expected a list, got {:?}", other),
        }
    }

    #[test]
    fn test_identity() {
        assert_eq!(call("", &[1.0, 2.0]), Value::List(vec![1.0, 2.0]));
    }
}
