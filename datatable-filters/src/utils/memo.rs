//! Single-slot memoization keyed on shallow dependency equality.
//!
//! Dependencies are compared the way a UI framework compares hook
//! dependencies: shared data by pointer (`Arc::ptr_eq`), small copy values by
//! value. Only the most recent dependency tuple and its result are kept.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::types::{ColumnDataType, FilterStrategy};

/// Cheap, reference-level equality used to decide whether to recompute.
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

impl<T: ?Sized> ShallowEq for Arc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

macro_rules! shallow_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ShallowEq for $ty {
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

shallow_eq_by_value!(bool, usize, u64, i64, f64, FilterStrategy, ColumnDataType);

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.shallow_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ShallowEq, E: PartialEq> ShallowEq for Result<T, E> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ok(a), Ok(b)) => a.shallow_eq(b),
            (Err(a), Err(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! shallow_eq_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ShallowEq),+> ShallowEq for ($($name,)+) {
            fn shallow_eq(&self, other: &Self) -> bool {
                $(self.$idx.shallow_eq(&other.$idx))&&+
            }
        }
    };
}

shallow_eq_tuple!(A: 0);
shallow_eq_tuple!(A: 0, B: 1);
shallow_eq_tuple!(A: 0, B: 1, C: 2);
shallow_eq_tuple!(A: 0, B: 1, C: 2, D: 3);
shallow_eq_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);

/// A cache slot holding the last dependency tuple and its result.
///
/// Callers pass the dependencies on every lookup. Use [`Memo`] when the
/// dependencies can be produced by a closure.
pub struct MemoSlot<D, R> {
    key: String,
    slot: Mutex<Option<(D, R)>>,
}

impl<D: ShallowEq, R: Clone> MemoSlot<D, R> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slot: Mutex::new(None),
        }
    }

    /// Return the cached result if `deps` shallow-equals the previous
    /// dependencies, otherwise compute, store, and return a fresh one.
    pub fn get_or_compute(&self, deps: D, compute: impl FnOnce(&D) -> R) -> R {
        {
            let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((prev, result)) = slot.as_ref() {
                if prev.shallow_eq(&deps) {
                    trace!(key = %self.key, "memo hit");
                    return result.clone();
                }
            }
        }

        trace!(key = %self.key, "memo miss");
        // Computed outside the lock so `compute` may consult other memos
        let result = compute(&deps);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((deps, result.clone()));
        result
    }

    /// Forget the cached result.
    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

type DepsFn<D> = Box<dyn Fn() -> D + Send + Sync>;
type ComputeFn<D, R> = Box<dyn Fn(&D) -> R + Send + Sync>;

/// A memoized computation: a dependency producer and a pure `compute`.
pub struct Memo<D, R> {
    slot: MemoSlot<D, R>,
    deps: DepsFn<D>,
    compute: ComputeFn<D, R>,
}

/// Build a [`Memo`] from a dependency producer and a pure computation.
///
/// ```
/// use std::sync::Arc;
/// use datatable_filters::utils::memo::memo;
///
/// let rows = Arc::new(vec![3, 1, 2]);
/// let deps_rows = rows.clone();
/// let sorted = memo(
///     "sorted",
///     move || (deps_rows.clone(),),
///     |(rows,)| {
///         let mut v = rows.to_vec();
///         v.sort();
///         Arc::new(v)
///     },
/// );
/// assert!(Arc::ptr_eq(&sorted.get(), &sorted.get()));
/// ```
pub fn memo<D, R>(
    key: impl Into<String>,
    deps: impl Fn() -> D + Send + Sync + 'static,
    compute: impl Fn(&D) -> R + Send + Sync + 'static,
) -> Memo<D, R>
where
    D: ShallowEq,
    R: Clone,
{
    Memo {
        slot: MemoSlot::new(key),
        deps: Box::new(deps),
        compute: Box::new(compute),
    }
}

impl<D: ShallowEq, R: Clone> Memo<D, R> {
    pub fn get(&self) -> R {
        let deps = (self.deps)();
        self.slot.get_or_compute(deps, |d| (self.compute)(d))
    }

    pub fn key(&self) -> &str {
        self.slot.key()
    }
}
