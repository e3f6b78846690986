/// Policy for choosing the two routers promoted when a node splits.
///
/// Any choice is correct as long as every candidate lands in exactly one
/// partition and radii are recomputed afterwards; the policy only affects
/// tree quality and therefore pruning efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromotionPolicy {
    /// Promote the first two candidates encountered. Cheapest, and the
    /// recommended default.
    #[default]
    FirstTwo,
    /// Promote the pair with the maximum pairwise distance. Costs
    /// O(capacity^2) extra distance calls per split but tends to produce
    /// better-separated partitions.
    MaxSpread,
}
