use std::path::{Path, PathBuf};

use tracing::info;

use crate::{canvas::Canvas, error::OutwardResult, plan::SquareKey};

/// Receives the evolving canvas after each painted square.
pub trait SnapshotSink {
    fn snapshot(&mut self, key: &SquareKey, canvas: &Canvas) -> OutwardResult<()>;
}

/// Sink that drops every snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSnapshots;

impl SnapshotSink for NullSnapshots {
    fn snapshot(&mut self, _key: &SquareKey, _canvas: &Canvas) -> OutwardResult<()> {
        Ok(())
    }
}

/// Sink writing timestamped PNGs next to the final output, one per
/// painted square.
#[derive(Clone, Debug)]
pub struct FsSnapshots {
    dir: PathBuf,
    stem: String,
    seq: u32,
}

impl FsSnapshots {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
            seq: 0,
        }
    }

    /// Snapshots land in the output file's directory, named after its stem.
    pub fn for_output(out_path: &Path) -> Self {
        let dir = out_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = out_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "outpaint".to_string());
        Self::new(dir, stem)
    }
}

impl SnapshotSink for FsSnapshots {
    fn snapshot(&mut self, key: &SquareKey, canvas: &Canvas) -> OutwardResult<()> {
        self.seq += 1;
        let name = format!("{}-{}-{:03}.png", self.stem, timestamp(), self.seq);
        let path = self.dir.join(name);
        info!(square = %key, path = %path.display(), "saving snapshot");
        canvas.save_png(&path)
    }
}

/// UTC wall-clock tag, `YYYYMMDD-HHMMSS`.
fn timestamp() -> String {
    let format = time::macros::format_description!("[year][month][day]-[hour][minute][second]");
    time::OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| "00000000-000000".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Leg;

    #[test]
    fn sequential_snapshots_get_distinct_names() {
        let dir = PathBuf::from("target").join("outward-snapshot-test");
        let _ = std::fs::remove_dir_all(&dir);

        let canvas = Canvas::new(8, 8).unwrap();
        let mut sink = FsSnapshots::new(&dir, "demo");
        sink.snapshot(&SquareKey::new(Leg::Init, 0), &canvas).unwrap();
        sink.snapshot(&SquareKey::new(Leg::Up, 0), &canvas).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(
            names
                .iter()
                .all(|n| n.starts_with("demo-") && n.ends_with(".png")),
            "got {names:?}"
        );
        assert!(names[0].ends_with("-001.png"), "got {names:?}");
        assert!(names[1].ends_with("-002.png"), "got {names:?}");
    }

    #[test]
    fn for_output_uses_the_stem_and_directory() {
        let sink = FsSnapshots::for_output(Path::new("renders/final_outpainted-1024x768.png"));
        assert_eq!(sink.dir, PathBuf::from("renders"));
        assert_eq!(sink.stem, "final_outpainted-1024x768");
    }

    #[test]
    fn timestamp_has_the_expected_shape() {
        let tag = timestamp();
        assert_eq!(tag.len(), 15);
        assert_eq!(tag.as_bytes()[8], b'-');
    }
}
