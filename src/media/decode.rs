use std::io::Read;
use std::process::{Command, Stdio};

use crate::{
    error::{ClipstackError, ClipstackResult},
    media::FrameRgba,
    media::probe::VideoSource,
    plan::Interval,
};

/// Decode one segment of `source` and hand the caller the frame nearest each
/// requested sample time, in order.
///
/// A single ffmpeg child streams rawvideo RGBA for the interval; frames are
/// read sequentially off its stdout and matched against the (non-decreasing)
/// sample times, so memory holds one source frame at a time. If the stream
/// ends before the last sample time, the final decoded frame is repeated —
/// the planner's tail guard makes that window small.
pub fn decode_frames_at(
    source: &VideoSource,
    interval: Interval,
    sample_times: &[f64],
    mut on_frame: impl FnMut(&FrameRgba) -> ClipstackResult<()>,
) -> ClipstackResult<()> {
    if sample_times.is_empty() {
        return Ok(());
    }
    let src_fps = source.source_fps();
    if src_fps <= 0.0 {
        return Err(ClipstackError::media(format!(
            "source '{}' has no usable frame rate",
            source.path.display()
        )));
    }

    // Map each sample time onto a decoded-frame index. Rounding can step
    // backwards across adjacent times at low source rates; clamp to keep the
    // target sequence non-decreasing so one forward pass serves all of them.
    let mut targets = Vec::with_capacity(sample_times.len());
    let mut prev = 0u64;
    for &t in sample_times {
        let idx = ((t - interval.start) * src_fps).round().max(0.0) as u64;
        let idx = idx.max(prev);
        targets.push(idx);
        prev = idx;
    }

    let mut child = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{:.9}", interval.start)])
        .arg("-i")
        .arg(&source.path)
        .args([
            "-t",
            &format!("{:.9}", interval.len_sec()),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ClipstackError::media(format!("failed to spawn ffmpeg for decode: {e}")))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ClipstackError::media("failed to open ffmpeg stdout (unexpected)"))?;

    let frame_len = FrameRgba::byte_len(source.width, source.height);
    let mut frame = FrameRgba {
        width: source.width,
        height: source.height,
        data: vec![0u8; frame_len],
    };

    let mut decoded_any = false;
    let mut next_idx = 0u64;
    let mut ti = 0usize;
    let mut eof = false;

    while ti < targets.len() {
        let want = targets[ti];
        if eof || (decoded_any && want < next_idx) {
            // Past the stream end (or a duplicate target): repeat the frame
            // already in the buffer.
            if !decoded_any {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClipstackError::media(format!(
                    "ffmpeg produced no frames for '{}' [{:.3}s, {:.3}s)",
                    source.path.display(),
                    interval.start,
                    interval.end
                )));
            }
            on_frame(&frame)?;
            ti += 1;
            continue;
        }

        match read_exact_frame(&mut stdout, &mut frame.data)? {
            true => {
                decoded_any = true;
                next_idx += 1;
                if want == next_idx - 1 {
                    on_frame(&frame)?;
                    ti += 1;
                }
            }
            false => eof = true,
        }
    }

    drop(stdout);
    if eof {
        let out = child.wait_with_output().map_err(|e| {
            ClipstackError::media(format!("failed to wait for ffmpeg decode: {e}"))
        })?;
        if !out.status.success() {
            // Frames were already delivered; a nonzero tail status is only
            // interesting for diagnostics.
            tracing::debug!(
                source = %source.path.display(),
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "ffmpeg decode exited nonzero after end of stream"
            );
        }
    } else {
        // All samples satisfied before the stream drained; stop the child.
        let _ = child.kill();
        let _ = child.wait();
    }

    Ok(())
}

/// Read one full frame. Returns `false` on a clean end of stream.
fn read_exact_frame(r: &mut impl Read, buf: &mut [u8]) -> ClipstackResult<bool> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(ClipstackError::media(format!(
                    "truncated frame from decoder: {filled} of {} bytes",
                    buf.len()
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                return Err(ClipstackError::media(format!(
                    "failed to read decoded frame: {e}"
                )));
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_exact_frame_handles_clean_eof_and_truncation() {
        let mut buf = [0u8; 4];

        let mut empty: &[u8] = &[];
        assert!(!read_exact_frame(&mut empty, &mut buf).unwrap());

        let mut whole: &[u8] = &[1, 2, 3, 4, 5, 6, 7, 8];
        assert!(read_exact_frame(&mut whole, &mut buf).unwrap());
        assert_eq!(buf, [1, 2, 3, 4]);
        assert!(read_exact_frame(&mut whole, &mut buf).unwrap());
        assert_eq!(buf, [5, 6, 7, 8]);

        let mut short: &[u8] = &[9, 9];
        assert!(read_exact_frame(&mut short, &mut buf).is_err());
    }
}
