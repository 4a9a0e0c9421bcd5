use crate::prelude::{PipelineError, PipelineResult};
use ndarray::{s, Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rectangular region of interest in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Raw video frame laid out as `(height, width, channels)` with RGB or RGBA channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array3<u8>,
    roi: Option<Roi>,
    captured_at: Duration,
}

impl Frame {
    pub fn new(pixels: Array3<u8>, captured_at: Duration) -> Self {
        Self {
            pixels,
            roi: None,
            captured_at,
        }
    }

    /// Wraps an interleaved pixel buffer, e.g. canvas `getImageData` output with 4 channels.
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
        captured_at: Duration,
    ) -> PipelineResult<Self> {
        let pixels = Array3::from_shape_vec((height, width, channels), data).map_err(|err| {
            PipelineError::InvalidFrame(format!(
                "buffer does not match {}x{}x{}: {}",
                width, height, channels, err
            ))
        })?;
        Ok(Self::new(pixels, captured_at))
    }

    pub fn with_roi(mut self, roi: Roi) -> Self {
        self.roi = Some(roi);
        self
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn channels(&self) -> usize {
        self.pixels.dim().2
    }

    pub fn captured_at(&self) -> Duration {
        self.captured_at
    }

    /// Validated view over the region the reducer should average.
    pub fn region(&self) -> PipelineResult<ArrayView3<'_, u8>> {
        let (height, width, channels) = self.pixels.dim();
        if height == 0 || width == 0 {
            return Err(PipelineError::InvalidFrame("empty frame".into()));
        }
        if channels != 3 && channels != 4 {
            return Err(PipelineError::InvalidFrame(format!(
                "expected 3 or 4 channels, got {}",
                channels
            )));
        }

        let Some(roi) = self.roi else {
            return Ok(self.pixels.view());
        };
        if roi.width == 0 || roi.height == 0 {
            return Err(PipelineError::InvalidFrame("empty region of interest".into()));
        }
        let x_end = roi.x.checked_add(roi.width).filter(|&end| end <= width);
        let y_end = roi.y.checked_add(roi.height).filter(|&end| end <= height);
        match (x_end, y_end) {
            (Some(x_end), Some(y_end)) => Ok(self.pixels.slice(s![roi.y..y_end, roi.x..x_end, ..])),
            _ => Err(PipelineError::InvalidFrame(format!(
                "region {:?} exceeds {}x{} frame",
                roi, width, height
            ))),
        }
    }
}

/// Camera-side collaborator polled once per scheduling tick.
pub trait FrameSource {
    /// `None` means no frame is available this tick; it is not an error.
    fn next_frame(&mut self) -> Option<Frame>;
}
