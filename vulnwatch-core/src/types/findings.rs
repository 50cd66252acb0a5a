/// Findings count for a product, or an explicit marker that the tracker could
/// not provide one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingsCount {
    Unavailable,
    Count(u64),
}
