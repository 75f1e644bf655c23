use crate::error::Result;
use crate::slide_set::SlideSet;
use crate::url_normalizer::{AcquisitionMode, PresentationSource};

/// A way of turning a presentation into an ordered set of slide images.
///
/// Implementations either return every slide of the deck or fail; a partially
/// captured deck is never returned.
#[allow(async_fn_in_trait)]
pub trait SlideAcquirer {
    /// The mode this strategy serves
    fn mode(&self) -> AcquisitionMode;

    async fn acquire(&self, source: &PresentationSource) -> Result<SlideSet>;
}
