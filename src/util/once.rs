//! Function wrappers: memoize the first call, or always give one value

use once_cell::sync::OnceCell;

/// Function running `unstable` on its first call only.
///
/// Every later call returns the first result, whatever its argument.
pub fn once<A, R, F>(unstable: F) -> impl Fn(A) -> R
where
    F: Fn(A) -> R,
    R: Clone,
{
    let cell = OnceCell::new();
    move |argument| cell.get_or_init(|| unstable(argument)).clone()
}

/// Function giving `value` as result
pub fn stable<R: Clone>(value: R) -> impl Fn() -> R {
    move || value.clone()
}
