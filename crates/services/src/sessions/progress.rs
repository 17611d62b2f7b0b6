/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    /// `answered / total` rounded half up, 0 for an empty session.
    pub percentage: u8,
    pub is_complete: bool,
}
