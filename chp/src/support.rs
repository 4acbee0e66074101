//! Generators and validators for sources and checking sinks.

use std::fmt::Debug;

use rand::Rng;

use crate::error::Misconfigured;

/// Cycles through `values` forever.
///
/// # Panics
///
/// The returned generator panics if `values` is empty.
pub fn values<T: Clone>(values: Vec<T>) -> impl FnMut(i64) -> T {
    move |i| values[i.rem_euclid(values.len() as i64) as usize].clone()
}

/// Uniform integers in `lower..upper`, biased towards small magnitudes.
///
/// Each draw first picks a bound `2^k - 1` with `k` uniform in `0..64` and
/// clamps the range to `-bound..=bound`, so short and long digit streams
/// both show up in a run. When the clamped range is empty the draw is uniform
/// over the full range; an empty `lower..upper` yields `lower`.
pub fn random_i64(lower: i64, upper: i64) -> impl FnMut(i64) -> i64 {
    move |_| {
        let mut rng = rand::rng();
        let bound = i64::MAX >> (63 - rng.random_range(0..64u32));
        let low = lower.max(-bound);
        let high = upper.min(bound);
        if high > low {
            rng.random_range(low..high)
        } else if upper > lower {
            rng.random_range(lower..upper)
        } else {
            lower
        }
    }
}

pub fn random_bool() -> impl FnMut(i64) -> bool {
    |_| rand::rng().random_bool(0.5)
}

/// Accepts a tick when every branch delivered the same value.
///
/// # Errors
///
/// [`Misconfigured::Mismatch`] naming the first branch that differs from
/// branch 0.
pub fn are_equal<T: PartialEq + Debug>(token: i64, values: &[T]) -> Result<(), Misconfigured> {
    let Some((first, rest)) = values.split_first() else {
        return Ok(());
    };
    match rest.iter().find(|v| *v != first) {
        Some(other) => Err(Misconfigured::Mismatch {
            token,
            expected: format!("{first:?}"),
            found: format!("{other:?}"),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_wrap_around() {
        let mut g = values(vec!['a', 'b', 'c']);
        let got: String = (0..5).map(&mut g).collect();
        assert_eq!(got, "abcab");
    }

    #[test]
    fn random_values_stay_in_range() {
        let mut g = random_i64(-5, 9);
        for i in 0..1000 {
            let v = g(i);
            assert!((-5..9).contains(&v), "{v}");
        }
        let mut b = random_bool();
        let _ = b(0);
    }

    #[test]
    fn mismatch_reports_values() {
        assert!(are_equal(0, &[1, 1, 1]).is_ok());
        assert!(are_equal::<i64>(0, &[]).is_ok());
        let err = are_equal(4, &[1, 1, 2]).unwrap_err();
        assert_eq!(err.to_string(), "expected 1, found 2 at token 4");
    }
}
