use crate::error::Result;
use crate::types::{Size, TerminalSnapshot};
use async_trait::async_trait;

/// Source of uniform random values for glitch decisions.
///
/// Implementations need not be cryptographically strong.
pub trait RandomSource: Send {
    /// Next value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize {
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

/// Trait for display surfaces that paint terminal snapshots
#[async_trait]
pub trait TerminalFrontend: Send {
    /// Paint the snapshot of the terminal shown in `panel`
    async fn update(&mut self, panel: usize, snapshot: &TerminalSnapshot) -> Result<()>;

    /// Handle resize events
    async fn resize(&mut self, size: Size) -> Result<()>;

    /// Flush pending output
    async fn refresh(&mut self) -> Result<()>;
}
