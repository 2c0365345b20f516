//! Recursion guard for cycle detection, depth limiting and iteration
//! bounding in recursive descriptor walks.
//!
//! Self-referential descriptors make naive structural recursion loop forever.
//! Every recursive walk in the solver (pattern matching, substitution,
//! evaluation, formatting) goes through a `RecursionGuard`, which combines:
//!
//! 1. **Cycle detection** via a visiting set (`FxHashSet<K>`)
//! 2. **Depth limiting** to prevent stack overflow
//! 3. **Iteration bounding** to cap total work
//!
//! [`RecursionProfile`] names the limits used at each call site so that the
//! numbers live in one place.
//!
//! In debug builds, dropping a guard with active entries panics, which
//! catches a forgotten `leave()`.

use rustc_hash::FxHashSet;
use std::hash::Hash;

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Structural pattern matching (`subject extends pattern`).
    ///
    /// depth = 100, iterations = 100,000
    PatternMatch,

    /// Conditional and mapped type evaluation.
    ///
    /// depth = 100, iterations = 100,000
    TypeEvaluation,

    /// Replacing infer variables inside a branch template.
    ///
    /// depth = 100, iterations = 100,000
    Substitution,

    /// Rendering descriptors as text.
    ///
    /// depth = 32, iterations = 10,000
    Formatting,

    /// Custom limits for one-off or test scenarios.
    Custom { max_depth: u32, max_iterations: u32 },
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::PatternMatch => 100,
            Self::TypeEvaluation => 100,
            Self::Substitution => 100,
            Self::Formatting => 32,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::PatternMatch => 100_000,
            Self::TypeEvaluation => 100_000,
            Self::Substitution => 100_000,
            Self::Formatting => 10_000,
            Self::Custom { max_iterations, .. } => max_iterations,
        }
    }
}

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    /// Proceed with the computation.
    Entered,
    /// This key is already being visited.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }
}

/// Tracks recursion state for cycle detection, depth limiting and
/// iteration bounding.
///
/// ```ignore
/// match guard.enter(key) {
///     RecursionResult::Entered => {
///         let result = do_work();
///         guard.leave(key);
///         result
///     }
///     RecursionResult::Cycle => handle_cycle(),
///     RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => bail(),
/// }
/// ```
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    /// Try to enter a recursive computation for `key`.
    ///
    /// On [`RecursionResult::Entered`] the caller must call
    /// [`leave`](Self::leave) with the same key when done.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);

        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }
        if !self.visiting.insert(key) {
            return RecursionResult::Cycle;
        }

        self.depth += 1;
        RecursionResult::Entered
    }

    /// Leave a computation previously entered with `key`.
    pub fn leave(&mut self, key: K) {
        let was_present = self.visiting.remove(&key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not being visited"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Sticky flag: once a limit is hit it stays set until [`reset`](Self::reset).
    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn reset(&mut self) {
        self.visiting.clear();
        self.depth = 0;
        self.iterations = 0;
        self.exceeded = false;
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.is_empty() {
            panic!(
                "RecursionGuard dropped with {} active entries; enter() without leave()",
                self.visiting.len(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_limits() {
        assert_eq!(RecursionProfile::PatternMatch.max_depth(), 100);
        assert_eq!(RecursionProfile::Formatting.max_iterations(), 10_000);
        let custom = RecursionProfile::Custom {
            max_depth: 7,
            max_iterations: 42,
        };
        assert_eq!(custom.max_depth(), 7);
        assert_eq!(custom.max_iterations(), 42);
    }

    #[test]
    fn enter_leave_tracks_depth() {
        let mut guard = RecursionGuard::new(10, 100);
        assert_eq!(guard.enter(1u32), RecursionResult::Entered);
        assert_eq!(guard.enter(2u32), RecursionResult::Entered);
        assert_eq!(guard.depth(), 2);
        assert!(guard.is_visiting(&1));

        guard.leave(2);
        guard.leave(1);
        assert_eq!(guard.depth(), 0);
        assert_eq!(guard.iterations(), 2);
    }

    #[test]
    fn cycle_on_same_key() {
        let mut guard = RecursionGuard::new(10, 100);
        assert!(guard.enter(1u32).is_entered());
        assert!(guard.enter(1u32).is_cycle());
        assert_eq!(guard.depth(), 1);
        assert!(!guard.is_exceeded());
        guard.leave(1);
    }

    #[test]
    fn depth_limit_is_sticky() {
        let mut guard = RecursionGuard::new(2, 100);
        assert!(guard.enter(1u32).is_entered());
        assert!(guard.enter(2u32).is_entered());
        assert_eq!(guard.enter(3u32), RecursionResult::DepthExceeded);
        guard.leave(2);
        guard.leave(1);
        assert!(guard.is_exceeded());

        guard.reset();
        assert!(!guard.is_exceeded());
    }

    #[test]
    fn iteration_limit() {
        let mut guard = RecursionGuard::new(10, 3);
        for key in 0u32..3 {
            assert!(guard.enter(key).is_entered());
            guard.leave(key);
        }
        assert!(guard.enter(99).is_exceeded());
    }
}
