use std::{
    io::Read as _,
    path::Path,
    time::{Duration, Instant},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll until `path` exists and reads to EOF without error, or the timeout
/// elapses.
///
/// This is the handoff protocol for files written by another process with no
/// completion signal: a successful open-and-read is a liveness heuristic, not
/// a consistency barrier. A `false` return means "use your documented
/// fallback", never "the file can never appear" — errors stop at this
/// boundary.
pub fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    wait_for_file_with(path, timeout, DEFAULT_POLL_INTERVAL)
}

pub fn wait_for_file_with(path: &Path, timeout: Duration, poll_interval: Duration) -> bool {
    let started = Instant::now();
    loop {
        if is_fully_readable(path) {
            tracing::debug!(path = %path.display(), "file ready");
            return true;
        }
        if started.elapsed() >= timeout {
            tracing::warn!(
                path = %path.display(),
                timeout_sec = timeout.as_secs_f64(),
                "file never became readable before timeout"
            );
            return false;
        }
        std::thread::sleep(poll_interval.min(timeout.saturating_sub(started.elapsed())));
    }
}

fn is_fully_readable(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    let Ok(mut f) = std::fs::File::open(path) else {
        return false;
    };
    // Drain the whole file: a writer still flushing tends to fail or come up
    // short here, while a completed one reads clean. Bytes, not utf-8, so
    // binary artifacts qualify too.
    let mut sink = Vec::new();
    f.read_to_end(&mut sink).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn missing_path_times_out_after_at_least_the_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("never.txt");

        let started = Instant::now();
        let ready = wait_for_file_with(
            &path,
            Duration::from_secs(2),
            Duration::from_secs(1),
        );
        let elapsed = started.elapsed();

        assert!(!ready);
        // Two poll attempts minimum; no early return before the deadline.
        assert!(elapsed >= Duration::from_secs(2));
    }

    #[test]
    fn existing_file_is_ready_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("done.bin");
        std::fs::write(&path, [0u8, 159, 146, 150]).unwrap();

        let started = Instant::now();
        assert!(wait_for_file(&path, Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn file_appearing_mid_wait_is_picked_up() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("late.txt");

        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(250));
            let mut f = std::fs::File::create(&writer_path).unwrap();
            f.write_all(b"payload").unwrap();
        });

        let ready = wait_for_file_with(
            &path,
            Duration::from_secs(5),
            Duration::from_millis(50),
        );
        writer.join().unwrap();
        assert!(ready);
    }
}
