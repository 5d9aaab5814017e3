use std::path::{Path, PathBuf};

use crate::{
    encode::{
        fit::{ArtifactResult, SizeFitSearch},
        gif::StackEncoder,
    },
    error::{ClipstackError, ClipstackResult},
    transform::RenderedSegment,
};

/// Index of the first segment of the second half. The first half takes the
/// extra segment when the count is odd.
pub fn split_point(count: usize) -> usize {
    count.div_ceil(2)
}

/// Derive the two artifact paths from a template by inserting `1` / `2`
/// before the extension: `out/session.gif` -> `out/session1.gif`,
/// `out/session2.gif`.
pub fn half_output_paths(template: &Path) -> ClipstackResult<(PathBuf, PathBuf)> {
    let stem = template
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ClipstackError::invalid_input(format!(
                "artifact template '{}' has no file name",
                template.display()
            ))
        })?;
    let ext = template.extension().and_then(|e| e.to_str());
    let named = |n: u32| {
        let name = match ext {
            Some(ext) => format!("{stem}{n}.{ext}"),
            None => format!("{stem}{n}"),
        };
        template.with_file_name(name)
    };
    Ok((named(1), named(2)))
}

/// Drive one size-fit search per half of the segment sequence.
///
/// The halves are contiguous, disjoint, and concatenate back to the input
/// order. Fewer than two segments means there is nothing to split — that is
/// an `InsufficientContent` condition and no artifact is produced.
pub fn encode_split(
    rows: &[RenderedSegment],
    template: &Path,
    search: &SizeFitSearch,
    encoder: &mut dyn StackEncoder,
) -> ClipstackResult<(ArtifactResult, ArtifactResult)> {
    if rows.len() < 2 {
        return Err(ClipstackError::insufficient_content(format!(
            "need at least 2 segments to split, got {}",
            rows.len()
        )));
    }

    let half = split_point(rows.len());
    let (first, second) = rows.split_at(half);
    let (path1, path2) = half_output_paths(template)?;

    tracing::info!(
        total = rows.len(),
        first = first.len(),
        second = second.len(),
        "encoding split halves"
    );

    let a = search.run(first, &path1, encoder)?;
    let b = search.run(second, &path2, encoder)?;
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encode::fit::CandidateGrid,
        encode::gif::GifSettings,
        media::FrameRgba,
        transform::RenderedSegment,
    };

    fn segment(frames: usize) -> RenderedSegment {
        RenderedSegment {
            width: 4,
            height: 2,
            frames: (0..frames)
                .map(|_| FrameRgba {
                    width: 4,
                    height: 2,
                    data: vec![0; FrameRgba::byte_len(4, 2)],
                })
                .collect(),
        }
    }

    struct CountingEncoder {
        row_counts: Vec<usize>,
        paths: Vec<PathBuf>,
    }

    impl StackEncoder for CountingEncoder {
        fn encode_stack(
            &mut self,
            rows: &[RenderedSegment],
            _settings: &GifSettings,
            out_path: &Path,
        ) -> ClipstackResult<u64> {
            self.row_counts.push(rows.len());
            self.paths.push(out_path.to_path_buf());
            Ok(1)
        }
    }

    #[test]
    fn split_point_gives_first_half_the_extra_segment() {
        for n in 2..=9usize {
            let half = split_point(n);
            assert_eq!(half, n.div_ceil(2));
            assert_eq!(half + (n - half), n);
            // First half is never smaller than the second.
            assert!(half >= n - half);
            assert!(half - (n - half) <= 1);
        }
        assert_eq!(split_point(3), 2);
        assert_eq!(split_point(2), 1);
    }

    #[test]
    fn derived_paths_insert_index_before_extension() {
        let (a, b) = half_output_paths(Path::new("out/session.gif")).unwrap();
        assert_eq!(a, PathBuf::from("out/session1.gif"));
        assert_eq!(b, PathBuf::from("out/session2.gif"));

        let (a, b) = half_output_paths(Path::new("bare")).unwrap();
        assert_eq!(a, PathBuf::from("bare1"));
        assert_eq!(b, PathBuf::from("bare2"));

        assert!(half_output_paths(Path::new("")).is_err());
    }

    #[test]
    fn three_segments_split_two_then_one() {
        let rows = vec![segment(3), segment(3), segment(2)];
        let search = SizeFitSearch::new(CandidateGrid::default(), 1_000_000).unwrap();
        let mut enc = CountingEncoder {
            row_counts: Vec::new(),
            paths: Vec::new(),
        };

        let (a, b) = encode_split(&rows, Path::new("out/w.gif"), &search, &mut enc).unwrap();

        assert_eq!(enc.row_counts, vec![2, 1]);
        assert_eq!(a.path, PathBuf::from("out/w1.gif"));
        assert_eq!(b.path, PathBuf::from("out/w2.gif"));
        assert!(a.meets_ceiling() && b.meets_ceiling());
    }

    #[test]
    fn halves_reconstruct_the_original_order() {
        for n in 2..=7usize {
            let rows: Vec<RenderedSegment> = (0..n).map(|i| segment(i + 1)).collect();
            let half = split_point(n);
            let (first, second) = rows.split_at(half);
            let rebuilt: Vec<usize> = first
                .iter()
                .chain(second.iter())
                .map(|r| r.frames.len())
                .collect();
            let original: Vec<usize> = rows.iter().map(|r| r.frames.len()).collect();
            assert_eq!(rebuilt, original);
        }
    }

    #[test]
    fn fewer_than_two_segments_is_insufficient_content() {
        let search = SizeFitSearch::new(CandidateGrid::default(), 1_000_000).unwrap();
        let mut enc = CountingEncoder {
            row_counts: Vec::new(),
            paths: Vec::new(),
        };
        let err = encode_split(&[segment(2)], Path::new("out/w.gif"), &search, &mut enc)
            .unwrap_err();
        assert!(matches!(err, ClipstackError::InsufficientContent(_)));
        assert!(enc.row_counts.is_empty());
    }
}
