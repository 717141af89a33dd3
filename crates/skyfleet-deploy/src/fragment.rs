//! Node fragmentation policy

/// Decides how many of the remaining nodes the next region receives
pub trait FragmentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Nodes to request from the next region. Clamped to `1..=remaining`
    /// by the caller.
    fn nodes_for_next(&self, remaining: u32, regions_left: usize) -> u32;
}

/// One node per region. Never asks any single region for more.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitFragments;

impl FragmentStrategy for UnitFragments {
    fn name(&self) -> &'static str {
        "unit"
    }

    fn nodes_for_next(&self, _remaining: u32, _regions_left: usize) -> u32 {
        1
    }
}

/// Spreads the remaining nodes evenly over the regions still untried
#[derive(Debug, Clone, Copy, Default)]
pub struct EvenFragments;

impl FragmentStrategy for EvenFragments {
    fn name(&self) -> &'static str {
        "even"
    }

    fn nodes_for_next(&self, remaining: u32, regions_left: usize) -> u32 {
        let regions = u32::try_from(regions_left.max(1)).unwrap_or(u32::MAX);
        remaining.div_ceil(regions)
    }
}

pub(crate) fn next_chunk(strategy: &dyn FragmentStrategy, remaining: u32, regions_left: usize) -> u32 {
    strategy
        .nodes_for_next(remaining, regions_left)
        .clamp(1, remaining.max(1))
}
