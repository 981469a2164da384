//! Precedence values shared by handler mappings and view resolvers.

/// Runs first.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;
/// Runs last; the default for anything that does not declare an order.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// Stable sort by declared order, so equal orders keep registration order.
pub fn sort_by_order<T>(items: &mut [T], order: impl Fn(&T) -> i32) {
    items.sort_by_key(|item| order(item));
}
