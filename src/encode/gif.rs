use std::{
    io::Write as _,
    path::Path,
    process::{Command, Stdio},
};

use crate::{
    encode::ensure_parent_dir,
    error::{ClipstackError, ClipstackResult},
    media::FrameRgba,
    transform::RenderedSegment,
};

/// Per-encode knobs the size-fit search varies (palette) or pins (rate).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GifSettings {
    pub fps: u32,
    pub max_colors: u32,
}

impl GifSettings {
    pub fn validate(&self) -> ClipstackResult<()> {
        if self.fps == 0 {
            return Err(ClipstackError::invalid_input("gif fps must be non-zero"));
        }
        if self.max_colors < 2 || self.max_colors > 256 {
            return Err(ClipstackError::invalid_input(format!(
                "gif palette must have 2..=256 colors, got {}",
                self.max_colors
            )));
        }
        Ok(())
    }
}

/// Geometry of a single-column vertical stack: one row per segment, widths
/// shared, heights summed, duration set by the longest row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackLayout {
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
}

impl StackLayout {
    pub fn of_rows(rows: &[RenderedSegment]) -> ClipstackResult<Self> {
        let first = rows
            .first()
            .ok_or_else(|| ClipstackError::invalid_input("stack needs at least one row"))?;
        let width = first.width;
        let mut height = 0u32;
        let mut frame_count = 0usize;
        for (i, row) in rows.iter().enumerate() {
            if row.width != width {
                return Err(ClipstackError::invalid_input(format!(
                    "stack rows must share one width: row 0 is {width}px, row {i} is {}px",
                    row.width
                )));
            }
            if row.height == 0 || row.frames.is_empty() {
                return Err(ClipstackError::invalid_input(format!(
                    "stack row {i} is empty"
                )));
            }
            for f in &row.frames {
                if f.width != row.width || f.height != row.height {
                    return Err(ClipstackError::invalid_input(format!(
                        "frame in row {i} is {}x{}, row claims {}x{}",
                        f.width, f.height, row.width, row.height
                    )));
                }
            }
            height = height
                .checked_add(row.height)
                .ok_or_else(|| ClipstackError::invalid_input("stack height overflows"))?;
            frame_count = frame_count.max(row.frames.len());
        }
        Ok(Self {
            width,
            height,
            frame_count,
        })
    }
}

/// Composite frame `index` of the stack. Rows shorter than the stack hold
/// their final frame, preserving temporal order within and across rows.
pub fn compose_stack_frame(
    rows: &[RenderedSegment],
    layout: &StackLayout,
    index: usize,
) -> FrameRgba {
    let mut data = vec![0u8; FrameRgba::byte_len(layout.width, layout.height)];
    let row_stride = layout.width as usize * 4;
    let mut y_off = 0usize;
    for row in rows {
        let frame = &row.frames[index.min(row.frames.len() - 1)];
        let start = y_off * row_stride;
        data[start..start + frame.data.len()].copy_from_slice(&frame.data);
        y_off += row.height as usize;
    }
    FrameRgba {
        width: layout.width,
        height: layout.height,
        data,
    }
}

/// Anything that can turn a stack of rendered segments into one animated
/// artifact on disk and report its byte size. The production implementation
/// shells out to ffmpeg; tests substitute a scripted one.
pub trait StackEncoder {
    fn encode_stack(
        &mut self,
        rows: &[RenderedSegment],
        settings: &GifSettings,
        out_path: &Path,
    ) -> ClipstackResult<u64>;
}

/// Streams composed RGBA frames into a system ffmpeg child that writes a
/// looping GIF. The palette pass is pinned to `palettegen(stats_mode=diff)` +
/// `paletteuse(bayer)` so a given input and candidate re-encode to the same
/// bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegGifEncoder;

impl FfmpegGifEncoder {
    fn filter_graph(max_colors: u32) -> String {
        format!(
            "[0:v]split[a][b];[a]palettegen=max_colors={max_colors}:stats_mode=diff[p];\
             [b][p]paletteuse=dither=bayer:bayer_scale=3"
        )
    }
}

impl StackEncoder for FfmpegGifEncoder {
    fn encode_stack(
        &mut self,
        rows: &[RenderedSegment],
        settings: &GifSettings,
        out_path: &Path,
    ) -> ClipstackResult<u64> {
        settings.validate()?;
        let layout = StackLayout::of_rows(rows)?;
        ensure_parent_dir(out_path)?;

        let mut child = Command::new("ffmpeg")
            .args([
                "-y",
                "-v",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", layout.width, layout.height),
                "-r",
                &settings.fps.to_string(),
                "-i",
                "pipe:0",
                "-filter_complex",
                &Self::filter_graph(settings.max_colors),
                "-loop",
                "0",
            ])
            .arg(out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ClipstackError::encode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipstackError::encode("failed to open ffmpeg stdin (unexpected)"))?;

        let mut write_err = None;
        for i in 0..layout.frame_count {
            let frame = compose_stack_frame(rows, &layout, i);
            if let Err(e) = stdin.write_all(&frame.data) {
                // Keep the exit status as the primary diagnostic; a broken
                // pipe here just means the child died first.
                write_err = Some(e);
                break;
            }
        }
        drop(stdin);

        let out = child
            .wait_with_output()
            .map_err(|e| ClipstackError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(ClipstackError::encode(format!(
                "ffmpeg gif encode exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        if let Some(e) = write_err {
            return Err(ClipstackError::encode(format!(
                "failed to write frames to ffmpeg stdin: {e}"
            )));
        }

        let size = std::fs::metadata(out_path)
            .map_err(|e| {
                ClipstackError::encode(format!(
                    "encoded artifact missing at '{}': {e}",
                    out_path.display()
                ))
            })?
            .len();
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(width: u32, height: u32, frame_values: &[u8]) -> RenderedSegment {
        RenderedSegment {
            width,
            height,
            frames: frame_values
                .iter()
                .map(|&v| FrameRgba {
                    width,
                    height,
                    data: vec![v; FrameRgba::byte_len(width, height)],
                })
                .collect(),
        }
    }

    #[test]
    fn settings_validation_catches_bad_values() {
        assert!(GifSettings { fps: 0, max_colors: 128 }.validate().is_err());
        assert!(GifSettings { fps: 15, max_colors: 1 }.validate().is_err());
        assert!(GifSettings { fps: 15, max_colors: 300 }.validate().is_err());
        assert!(GifSettings { fps: 15, max_colors: 128 }.validate().is_ok());
    }

    #[test]
    fn layout_sums_heights_and_takes_longest_row() {
        let layout =
            StackLayout::of_rows(&[row(2, 1, &[1, 2]), row(2, 2, &[3])]).unwrap();
        assert_eq!(
            layout,
            StackLayout {
                width: 2,
                height: 3,
                frame_count: 2
            }
        );
    }

    #[test]
    fn layout_rejects_mismatched_widths_and_empty_rows() {
        assert!(StackLayout::of_rows(&[]).is_err());
        assert!(StackLayout::of_rows(&[row(2, 1, &[1]), row(3, 1, &[1])]).is_err());
        assert!(StackLayout::of_rows(&[row(2, 1, &[])]).is_err());
    }

    #[test]
    fn layout_rejects_frames_that_disagree_with_their_row() {
        let mut bad = row(2, 2, &[1]);
        bad.frames[0].height = 1;
        bad.frames[0].data.truncate(FrameRgba::byte_len(2, 1));
        assert!(StackLayout::of_rows(&[bad]).is_err());
    }

    #[test]
    fn compose_stacks_rows_in_order_and_freezes_short_rows() {
        let rows = [row(2, 1, &[10, 20]), row(2, 2, &[30])];
        let layout = StackLayout::of_rows(&rows).unwrap();

        let f0 = compose_stack_frame(&rows, &layout, 0);
        assert_eq!((f0.width, f0.height), (2, 3));
        // Row 0 occupies the first pixel row, row 1 the next two.
        assert!(f0.data[..8].iter().all(|&b| b == 10));
        assert!(f0.data[8..].iter().all(|&b| b == 30));

        // Frame 1: row 0 advances, row 1 has run out and holds its last frame.
        let f1 = compose_stack_frame(&rows, &layout, 1);
        assert!(f1.data[..8].iter().all(|&b| b == 20));
        assert!(f1.data[8..].iter().all(|&b| b == 30));
    }

    #[test]
    fn filter_graph_pins_palette_and_dither() {
        let g = FfmpegGifEncoder::filter_graph(64);
        assert!(g.contains("palettegen=max_colors=64:stats_mode=diff"));
        assert!(g.contains("paletteuse=dither=bayer"));
    }
}
