use crate::interface::frame::Frame;
use crate::prelude::{CombinationStrategy, PipelineError, PipelineResult};
use ndarray::Axis;

/// Per-channel means over the frame's region of interest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMeans {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

/// Full-scale pixel level. The chrominance ratio is multiplied by this so every strategy
/// yields samples in pixel-level units and the detector and quality gates apply unchanged.
const CHROMINANCE_SCALE: f64 = 255.0;

/// Reduces one frame to a single PPG sample. Stateless and allocation-free per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameReducer;

impl FrameReducer {
    pub fn new() -> Self {
        Self
    }

    pub fn reduce(&self, frame: &Frame, strategy: CombinationStrategy) -> PipelineResult<f32> {
        let means = Self::channel_means(frame)?;
        let value = match strategy {
            CombinationStrategy::Default => means.green,
            CombinationStrategy::RedOnly => means.red,
            CombinationStrategy::BlueOnly => means.blue,
            CombinationStrategy::ChrominanceCombination => {
                let total = means.red + means.green + means.blue;
                if total <= f64::EPSILON {
                    0.0
                } else {
                    CHROMINANCE_SCALE * (2.0 * means.green - means.red - means.blue) / total
                }
            }
        };

        let value = value as f32;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(PipelineError::InvalidFrame("reduced value is not finite".into()))
        }
    }

    pub fn channel_means(frame: &Frame) -> PipelineResult<ChannelMeans> {
        let region = frame.region()?;
        let mut sums = [0u64; 3];
        for pixel in region.lanes(Axis(2)) {
            sums[0] += pixel[0] as u64;
            sums[1] += pixel[1] as u64;
            sums[2] += pixel[2] as u64;
        }

        let count = (region.dim().0 * region.dim().1) as f64;
        Ok(ChannelMeans {
            red: sums[0] as f64 / count,
            green: sums[1] as f64 / count,
            blue: sums[2] as f64 / count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::frame::Roi;
    use ndarray::Array3;
    use std::time::Duration;

    fn solid_frame(rgb: [u8; 3], channels: usize) -> Frame {
        let mut pixels = Array3::from_elem((4, 4, channels), 255u8);
        for mut pixel in pixels.lanes_mut(Axis(2)) {
            pixel[0] = rgb[0];
            pixel[1] = rgb[1];
            pixel[2] = rgb[2];
        }
        Frame::new(pixels, Duration::ZERO)
    }

    #[test]
    fn strategies_select_expected_channel() {
        let reducer = FrameReducer::new();
        let frame = solid_frame([200, 120, 60], 3);
        assert_eq!(reducer.reduce(&frame, CombinationStrategy::Default).unwrap(), 120.0);
        assert_eq!(reducer.reduce(&frame, CombinationStrategy::RedOnly).unwrap(), 200.0);
        assert_eq!(reducer.reduce(&frame, CombinationStrategy::BlueOnly).unwrap(), 60.0);

        let chrom = reducer
            .reduce(&frame, CombinationStrategy::ChrominanceCombination)
            .unwrap();
        assert!((chrom - 255.0 * (240.0 - 200.0 - 60.0) / 380.0).abs() < 1e-4);
    }

    #[test]
    fn chrominance_swing_is_in_pixel_level_units() {
        let reducer = FrameReducer::new();
        let rest = solid_frame([170, 120, 100], 3);
        let peak = solid_frame([172, 126, 101], 3);
        let strategy = CombinationStrategy::ChrominanceCombination;
        let swing = reducer.reduce(&peak, strategy).unwrap() - reducer.reduce(&rest, strategy).unwrap();
        let green_swing = reducer.reduce(&peak, CombinationStrategy::Default).unwrap()
            - reducer.reduce(&rest, CombinationStrategy::Default).unwrap();
        assert!(swing > 1.0, "chrominance swing {} too small", swing);
        assert!(swing < 2.0 * green_swing);
    }

    #[test]
    fn chrominance_ignores_uniform_brightness() {
        let reducer = FrameReducer::new();
        let strategy = CombinationStrategy::ChrominanceCombination;
        let dim = reducer.reduce(&solid_frame([80, 60, 50], 3), strategy).unwrap();
        let bright = reducer.reduce(&solid_frame([160, 120, 100], 3), strategy).unwrap();
        assert!((dim - bright).abs() < 1e-4);
    }

    #[test]
    fn alpha_channel_is_ignored() {
        let reducer = FrameReducer::new();
        let rgb = solid_frame([10, 20, 30], 3);
        let rgba = solid_frame([10, 20, 30], 4);
        for strategy in [
            CombinationStrategy::Default,
            CombinationStrategy::ChrominanceCombination,
        ] {
            assert_eq!(
                reducer.reduce(&rgb, strategy).unwrap(),
                reducer.reduce(&rgba, strategy).unwrap()
            );
        }
    }

    #[test]
    fn black_frame_stays_finite_and_deterministic() {
        let reducer = FrameReducer::new();
        let frame = solid_frame([0, 0, 0], 3);
        let first = reducer
            .reduce(&frame, CombinationStrategy::ChrominanceCombination)
            .unwrap();
        let second = reducer
            .reduce(&frame, CombinationStrategy::ChrominanceCombination)
            .unwrap();
        assert_eq!(first, 0.0);
        assert_eq!(first, second);
    }

    #[test]
    fn roi_limits_averaged_pixels() {
        let mut pixels = Array3::zeros((2, 4, 3));
        pixels[[0, 3, 1]] = 100;
        pixels[[1, 3, 1]] = 50;
        let frame = Frame::new(pixels, Duration::ZERO).with_roi(Roi {
            x: 3,
            y: 0,
            width: 1,
            height: 2,
        });
        let value = FrameReducer::new()
            .reduce(&frame, CombinationStrategy::Default)
            .unwrap();
        assert_eq!(value, 75.0);
    }

    #[test]
    fn empty_frame_is_invalid() {
        let frame = Frame::new(Array3::zeros((0, 4, 3)), Duration::ZERO);
        assert!(matches!(
            FrameReducer::new().reduce(&frame, CombinationStrategy::Default),
            Err(PipelineError::InvalidFrame(_))
        ));
    }
}
