//! Trait for object detection inference backends.

use crate::tracker::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the tracker.
///
/// # Example
///
/// ```ignore
/// use skytrack_rs::{DetectionSource, Detection};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(
///         &mut self,
///         input: &[u8],
///         width: u32,
///         height: u32,
///     ) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error;

    /// Run inference on raw image data and return detections.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes (format depends on implementation)
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    fn detect(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A detector chosen at composition time: the primary model when it can be
/// loaded, otherwise the fallback.
#[derive(Debug)]
pub enum DetectorBackend<P, F> {
    Primary(P),
    Fallback(F),
}

impl<P, F, E> DetectorBackend<P, F>
where
    P: DetectionSource<Error = E>,
    F: DetectionSource<Error = E>,
{
    /// Use `primary` if it loaded, otherwise build the fallback. The primary
    /// failure is logged; a fallback failure is returned.
    pub fn select<PE, FE>(
        primary: Result<P, PE>,
        fallback: impl FnOnce() -> Result<F, FE>,
    ) -> Result<Self, FE>
    where
        PE: std::fmt::Display,
    {
        match primary {
            Ok(detector) => {
                tracing::info!(backend = detector.name(), "using primary detector");
                Ok(DetectorBackend::Primary(detector))
            }
            Err(err) => {
                tracing::warn!(error = %err, "primary detector unavailable, using fallback");
                let detector = fallback()?;
                tracing::info!(backend = detector.name(), "using fallback detector");
                Ok(DetectorBackend::Fallback(detector))
            }
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, DetectorBackend::Primary(_))
    }
}

impl<P, F, E> DetectionSource for DetectorBackend<P, F>
where
    P: DetectionSource<Error = E>,
    F: DetectionSource<Error = E>,
{
    type Error = E;

    fn detect(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error> {
        match self {
            DetectorBackend::Primary(detector) => detector.detect(input, width, height),
            DetectorBackend::Fallback(detector) => detector.detect(input, width, height),
        }
    }

    fn name(&self) -> &str {
        match self {
            DetectorBackend::Primary(detector) => detector.name(),
            DetectorBackend::Fallback(detector) => detector.name(),
        }
    }
}
