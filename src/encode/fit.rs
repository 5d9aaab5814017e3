use std::path::{Path, PathBuf};

use crate::{
    encode::gif::{GifSettings, StackEncoder, StackLayout},
    error::{ClipstackError, ClipstackResult},
    transform::RenderedSegment,
};

/// One point in the quality-degradation space the search walks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncodeCandidate {
    pub width_scale: f64,
    pub color_depth: u32,
    pub fps: u32,
}

/// Priority-ordered candidate space: width scales from largest to smallest
/// (coarse spatial downscaling degrades quality most, so it is tried last),
/// palette depths from largest to smallest within each scale. Frame rate is
/// held constant across the grid — temporal smoothness is never sacrificed.
#[derive(Clone, Debug)]
pub struct CandidateGrid {
    width_scales: Vec<f64>,
    color_depths: Vec<u32>,
    fps: u32,
}

impl CandidateGrid {
    pub fn new(width_scales: Vec<f64>, color_depths: Vec<u32>, fps: u32) -> ClipstackResult<Self> {
        if width_scales.is_empty() || color_depths.is_empty() {
            return Err(ClipstackError::invalid_input(
                "candidate grid needs at least one scale and one color depth",
            ));
        }
        if fps == 0 {
            return Err(ClipstackError::invalid_input("grid fps must be non-zero"));
        }
        for &s in &width_scales {
            if !s.is_finite() || s <= 0.0 || s > 1.0 {
                return Err(ClipstackError::invalid_input(format!(
                    "width scale must be in (0, 1], got {s}"
                )));
            }
        }
        for &d in &color_depths {
            (GifSettings { fps, max_colors: d }).validate()?;
        }
        Ok(Self {
            width_scales,
            color_depths,
            fps,
        })
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn len(&self) -> usize {
        self.width_scales.len() * self.color_depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidates in search-priority order.
    pub fn iter(&self) -> impl Iterator<Item = EncodeCandidate> + '_ {
        self.width_scales.iter().flat_map(move |&width_scale| {
            self.color_depths.iter().map(move |&color_depth| EncodeCandidate {
                width_scale,
                color_depth,
                fps: self.fps,
            })
        })
    }
}

impl Default for CandidateGrid {
    fn default() -> Self {
        Self {
            width_scales: vec![1.0, 0.8, 0.6, 0.5],
            color_depths: vec![128, 64, 32],
            fps: 15,
        }
    }
}

/// What a fit run leaves on disk. `candidate == None` means the grid was
/// exhausted: the smallest attempt is still in place but violates the
/// ceiling, and the caller is expected to surface that as a warning rather
/// than abort.
#[derive(Clone, Debug)]
pub struct ArtifactResult {
    pub path: PathBuf,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    pub candidate: Option<EncodeCandidate>,
}

impl ArtifactResult {
    pub fn meets_ceiling(&self) -> bool {
        self.candidate.is_some()
    }
}

/// First-fit search over a [`CandidateGrid`].
///
/// Each candidate re-resizes the rows, re-encodes the stack, and measures
/// the artifact; the first one at or under the ceiling wins. First-fit (not
/// best-fit) bounds the work at `scales x depths` encoder runs — the policy
/// is deliberate and lives entirely in [`SizeFitSearch::run`].
#[derive(Clone, Debug)]
pub struct SizeFitSearch {
    grid: CandidateGrid,
    ceiling_bytes: u64,
}

impl SizeFitSearch {
    pub fn new(grid: CandidateGrid, ceiling_bytes: u64) -> ClipstackResult<Self> {
        if ceiling_bytes == 0 {
            return Err(ClipstackError::invalid_input("size ceiling must be non-zero"));
        }
        Ok(Self {
            grid,
            ceiling_bytes,
        })
    }

    pub fn ceiling_bytes(&self) -> u64 {
        self.ceiling_bytes
    }

    #[tracing::instrument(skip_all, fields(out = %out_path.display(), ceiling = self.ceiling_bytes))]
    pub fn run(
        &self,
        rows: &[RenderedSegment],
        out_path: &Path,
        encoder: &mut dyn StackEncoder,
    ) -> ClipstackResult<ArtifactResult> {
        // Establishes the shared base width before any encoding happens.
        let base = StackLayout::of_rows(rows)?;

        let mut last: Option<(u64, StackLayout)> = None;
        for candidate in self.grid.iter() {
            let target_width =
                ((f64::from(base.width) * candidate.width_scale).round() as u32).max(1);
            let scaled = rows
                .iter()
                .map(|r| r.rescaled(target_width))
                .collect::<ClipstackResult<Vec<_>>>()?;
            let layout = StackLayout::of_rows(&scaled)?;
            let settings = GifSettings {
                fps: candidate.fps,
                max_colors: candidate.color_depth,
            };

            let byte_size = encoder.encode_stack(&scaled, &settings, out_path)?;
            tracing::debug!(
                scale = candidate.width_scale,
                colors = candidate.color_depth,
                byte_size,
                "candidate encoded"
            );

            if byte_size <= self.ceiling_bytes {
                tracing::info!(
                    scale = candidate.width_scale,
                    colors = candidate.color_depth,
                    byte_size,
                    "size-fit candidate accepted"
                );
                return Ok(ArtifactResult {
                    path: out_path.to_path_buf(),
                    byte_size,
                    width: layout.width,
                    height: layout.height,
                    candidate: Some(candidate),
                });
            }
            last = Some((byte_size, layout));
        }

        // Grid exhausted; the smallest attempt stays on disk.
        let (byte_size, layout) = last.ok_or_else(|| {
            ClipstackError::invalid_input("candidate grid produced no candidates")
        })?;
        tracing::warn!(
            byte_size,
            ceiling = self.ceiling_bytes,
            "no candidate met the size ceiling; keeping the smallest attempt"
        );
        Ok(ArtifactResult {
            path: out_path.to_path_buf(),
            byte_size,
            width: layout.width,
            height: layout.height,
            candidate: None,
        })
    }
}
