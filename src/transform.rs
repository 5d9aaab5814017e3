use image::{RgbaImage, imageops};

use crate::{
    error::{ClipstackError, ClipstackResult},
    media::{FrameRgba, decode::decode_frames_at, probe::VideoSource},
    plan::Interval,
};

/// Fixed spatial window applied before resize when the source exceeds it.
/// Horizontally centered, anchored at the top row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropBox {
    pub width: u32,
    pub height: u32,
}

/// Output height for a resize to `target_width`.
///
/// Uses `target * min(w, h) / max(w, h)` so a portrait source lands at the
/// same height as its rotated landscape twin instead of towering over the
/// stack.
pub fn aspect_height(width: u32, height: u32, target_width: u32) -> u32 {
    let (lo, hi) = if width >= height {
        (height, width)
    } else {
        (width, height)
    };
    let h = (f64::from(target_width) * f64::from(lo) / f64::from(hi)).round() as u32;
    h.max(1)
}

/// Lanczos resize to `target_width`, height from [`aspect_height`].
pub fn resize_frame(frame: &FrameRgba, target_width: u32) -> ClipstackResult<FrameRgba> {
    let target_height = aspect_height(frame.width, frame.height, target_width);
    if target_width == frame.width && target_height == frame.height {
        return Ok(frame.clone());
    }
    let img = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| ClipstackError::media("frame buffer does not match its dimensions"))?;
    let resized = imageops::resize(&img, target_width, target_height, imageops::FilterType::Lanczos3);
    Ok(FrameRgba {
        width: target_width,
        height: target_height,
        data: resized.into_raw(),
    })
}

fn crop_frame(frame: &FrameRgba, crop: CropBox) -> ClipstackResult<FrameRgba> {
    if frame.width <= crop.width && frame.height <= crop.height {
        return Ok(frame.clone());
    }
    let out_w = frame.width.min(crop.width);
    let out_h = frame.height.min(crop.height);
    let x = (frame.width - out_w) / 2;
    let img = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| ClipstackError::media("frame buffer does not match its dimensions"))?;
    let cropped = imageops::crop_imm(&img, x, 0, out_w, out_h).to_image();
    Ok(FrameRgba {
        width: out_w,
        height: out_h,
        data: cropped.into_raw(),
    })
}

/// One planned slice of a video with its transform parameters captured by
/// value. Borrowing the source means a segment cannot outlive the handle it
/// reads from.
#[derive(Clone, Debug)]
pub struct Segment<'a> {
    source: &'a VideoSource,
    interval: Interval,
    speed: f64,
    crop: Option<CropBox>,
    target_width: u32,
}

impl<'a> Segment<'a> {
    pub fn new(
        source: &'a VideoSource,
        interval: Interval,
        speed: f64,
        crop: Option<CropBox>,
        target_width: u32,
    ) -> ClipstackResult<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ClipstackError::invalid_input(format!(
                "speed factor must be > 0, got {speed}"
            )));
        }
        if target_width == 0 {
            return Err(ClipstackError::invalid_input("target width must be non-zero"));
        }
        if let Some(c) = crop {
            if c.width == 0 || c.height == 0 {
                return Err(ClipstackError::invalid_input("crop box must be non-zero"));
            }
        }
        Ok(Self {
            source,
            interval,
            speed,
            crop,
            target_width,
        })
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Playback length after the speed-up.
    pub fn output_duration_sec(&self) -> f64 {
        self.interval.len_sec() / self.speed
    }

    pub fn output_frame_count(&self, fps: u32) -> usize {
        ((self.output_duration_sec() * f64::from(fps)).ceil() as usize).max(1)
    }

    /// Source timestamps backing each output frame: playing every
    /// `speed / fps` seconds of source per output frame is the speed-up.
    pub fn sample_times(&self, fps: u32) -> Vec<f64> {
        let n = self.output_frame_count(fps);
        let step = self.speed / f64::from(fps);
        (0..n)
            .map(|i| (self.interval.start + (i as f64) * step).min(self.interval.end))
            .collect()
    }

    /// Width/height a rendered frame of this segment will have.
    pub fn output_dims(&self) -> (u32, u32) {
        let (mut w, mut h) = (self.source.width, self.source.height);
        if let Some(c) = self.crop {
            if w > c.width || h > c.height {
                w = w.min(c.width);
                h = h.min(c.height);
            }
        }
        (self.target_width, aspect_height(w, h, self.target_width))
    }

    /// Decode, crop, and resize this segment's frames at `fps`.
    ///
    /// Streams the decode so only transformed base-width frames are retained.
    /// The source handle is read, never mutated.
    pub fn render(&self, fps: u32) -> ClipstackResult<RenderedSegment> {
        if fps == 0 {
            return Err(ClipstackError::invalid_input("fps must be non-zero"));
        }
        let times = self.sample_times(fps);
        let mut frames = Vec::with_capacity(times.len());
        decode_frames_at(self.source, self.interval, &times, |raw| {
            let cropped = match self.crop {
                Some(c) => crop_frame(raw, c)?,
                None => raw.clone(),
            };
            frames.push(resize_frame(&cropped, self.target_width)?);
            Ok(())
        })?;

        let (width, height) = self.output_dims();
        Ok(RenderedSegment {
            width,
            height,
            frames,
        })
    }
}

/// A segment's transformed frames, all sharing one width. This is what the
/// stack encoder and the size-fit search work on; it owns its pixels and no
/// longer references the source handle.
#[derive(Clone, Debug)]
pub struct RenderedSegment {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<FrameRgba>,
}

impl RenderedSegment {
    /// Re-resize every frame to `target_width` (the fit search's step 1).
    pub fn rescaled(&self, target_width: u32) -> ClipstackResult<RenderedSegment> {
        if target_width == 0 {
            return Err(ClipstackError::invalid_input("target width must be non-zero"));
        }
        if target_width == self.width {
            return Ok(self.clone());
        }
        let mut frames = Vec::with_capacity(self.frames.len());
        for f in &self.frames {
            frames.push(resize_frame(f, target_width)?);
        }
        let height = aspect_height(self.width, self.height, target_width);
        Ok(RenderedSegment {
            width: target_width,
            height,
            frames,
        })
    }
}
