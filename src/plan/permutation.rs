use thiserror::Error;

/// Raised when the number of orderings would exceed the configured cap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "refusing to permute {items} steps: {estimated} orderings exceed the limit of {limit}"
)]
pub struct PermutationLimitExceeded {
    pub items: usize,
    /// `items!`, saturated at `u128::MAX`.
    pub estimated: u128,
    pub limit: u128,
}

/// `n!`, saturating instead of overflowing.
pub fn factorial_estimate(n: usize) -> u128 {
    (2..=n as u128).fold(1u128, |acc, k| acc.saturating_mul(k))
}

/// Lazy permutation iterator using the iterative form of Heap's algorithm.
///
/// Yields nothing for an empty input.
pub struct Permutations<T> {
    items: Vec<T>,
    counters: Vec<usize>,
    index: usize,
    started: bool,
}

impl<T: Clone> Permutations<T> {
    pub fn new(items: Vec<T>) -> Self {
        let n = items.len();
        Self {
            items,
            counters: vec![0; n],
            index: 1,
            started: false,
        }
    }
}

impl<T: Clone> Iterator for Permutations<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.items.is_empty() {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.items.clone());
        }

        while self.index < self.items.len() {
            let i = self.index;
            if self.counters[i] < i {
                if i % 2 == 0 {
                    self.items.swap(0, i);
                } else {
                    self.items.swap(self.counters[i], i);
                }
                self.counters[i] += 1;
                self.index = 1;
                return Some(self.items.clone());
            }
            self.counters[i] = 0;
            self.index += 1;
        }
        None
    }
}

/// Every ordering of `items`. An empty input yields no orderings at all.
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    Permutations::new(items.to_vec()).collect()
}

/// Like [`permutations`], but fails before generating anything when
/// `items.len()!` exceeds `limit`.
///
/// # Errors
///
/// Returns [`PermutationLimitExceeded`] with the estimated ordering count.
pub fn bounded_permutations<T: Clone>(
    items: &[T],
    limit: u128,
) -> Result<Vec<Vec<T>>, PermutationLimitExceeded> {
    let estimated = factorial_estimate(items.len());
    if estimated > limit {
        return Err(PermutationLimitExceeded {
            items: items.len(),
            estimated,
            limit,
        });
    }
    Ok(permutations(items))
}

/// Concatenate every left ordering with every right ordering.
///
/// Joining with an empty side returns the other side unchanged.
pub fn outer_join<T: Clone>(left: &[Vec<T>], right: &[Vec<T>]) -> Vec<Vec<T>> {
    if left.is_empty() {
        return right.to_vec();
    }
    if right.is_empty() {
        return left.to_vec();
    }

    let mut joined = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            let mut ordering = Vec::with_capacity(l.len() + r.len());
            ordering.extend(l.iter().cloned());
            ordering.extend(r.iter().cloned());
            joined.push(ordering);
        }
    }
    joined
}
