//! File-backed point stores.
//!
//! A [`PointStore`] owns the raw record bytes of a point file (or a window of
//! one) and decodes points on access. It never mutates its backing bytes, so
//! a store can be iterated any number of times and shared freely between
//! readers once constructed.

use crate::error::{FormatError, IndexError, StoreError};
use crate::record::{RECORD_SIZE, decode_record, encode_into};
use crate::types::Point;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::slice::ChunksExact;
use tracing::{debug, info, warn};

/// File extension used for binary point files.
pub const POINT_FILE_EXTENSION: &str = "xyzb";

/// Window positions are expressed as a percentage of this many batches.
const WINDOW_BATCHES: u64 = 100;

/// Check whether a path looks like a binary point file.
pub fn is_point_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(POINT_FILE_EXTENSION))
}

/// Selects a slice of a point file to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWindow {
    /// First record, as a percentage of the file.
    pub start_percent: u32,
    /// Number of records, as a percentage of the file. Zero reads to the end.
    pub length_percent: u32,
    /// Keep one record out of every `decimation`. Zero and one keep all.
    pub decimation: u32,
}

impl ReadWindow {
    /// The whole file, no decimation.
    pub fn full() -> Self {
        Self {
            start_percent: 0,
            length_percent: 0,
            decimation: 1,
        }
    }

    pub fn with_start(mut self, percent: u32) -> Self {
        self.start_percent = percent;
        self
    }

    pub fn with_length(mut self, percent: u32) -> Self {
        self.length_percent = percent;
        self
    }

    pub fn with_decimation(mut self, decimation: u32) -> Self {
        self.decimation = decimation;
        self
    }

    fn validate(&self) -> Result<(), StoreError> {
        if u64::from(self.start_percent) > WINDOW_BATCHES {
            return Err(StoreError::Window(format!(
                "start {}% exceeds 100%",
                self.start_percent
            )));
        }
        if u64::from(self.length_percent) > WINDOW_BATCHES {
            return Err(StoreError::Window(format!(
                "length {}% exceeds 100%",
                self.length_percent
            )));
        }
        Ok(())
    }

    /// Resolve the window against a record count.
    ///
    /// Returns `(start, length, stride)` in records.
    fn resolve(&self, records: u64) -> (u64, u64, u64) {
        let start = (records * u64::from(self.start_percent) / WINDOW_BATCHES).min(records);
        let mut length = records * u64::from(self.length_percent) / WINDOW_BATCHES;
        if length == 0 || start + length > records {
            length = records - start;
        }
        let stride = u64::from(self.decimation.max(1));
        (start, length, stride)
    }

    fn is_full(&self) -> bool {
        self.start_percent == 0 && self.length_percent == 0 && self.decimation <= 1
    }
}

impl Default for ReadWindow {
    fn default() -> Self {
        Self::full()
    }
}

/// Options applied when opening a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub window: ReadWindow,
}

impl StoreOptions {
    pub fn with_window(mut self, window: ReadWindow) -> Self {
        self.window = window;
        self
    }
}

/// An ordered, read-only sequence of points backed by encoded records.
#[derive(Debug, Clone, Default)]
pub struct PointStore {
    bytes: Vec<u8>,
}

impl PointStore {
    /// Open a point file and load every record.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with(path, &StoreOptions::default())
    }

    /// Open a point file, loading only the records selected by `options`.
    ///
    /// The whole file must be a whole number of records even when only a
    /// window of it is loaded.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_with<P: AsRef<Path>>(path: P, options: &StoreOptions) -> Result<Self, StoreError> {
        let window = options.window;
        window.validate()?;

        debug!("Loading point records");
        let bytes = std::fs::read(path.as_ref())?;
        let total = check_aligned(bytes.len() as u64)?;

        let store = if window.is_full() {
            Self { bytes }
        } else {
            let (start, length, stride) = window.resolve(total);
            if stride > 1 {
                warn!("Decimated read: keeping 1 of every {} records", stride);
            }
            let mut selected = Vec::with_capacity((length.div_ceil(stride) as usize) * RECORD_SIZE);
            let mut record = start;
            while record < start + length {
                let offset = record as usize * RECORD_SIZE;
                selected.extend_from_slice(&bytes[offset..offset + RECORD_SIZE]);
                record += stride;
            }
            debug!(
                "Window selected records {}..{} of {}",
                start,
                start + length,
                total
            );
            Self { bytes: selected }
        };

        info!("Loaded {} points ({} in file)", store.len(), total);
        Ok(store)
    }

    /// Build a store from already encoded records.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FormatError> {
        check_aligned(bytes.len() as u64)?;
        Ok(Self { bytes })
    }

    /// Build a store from in-memory points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut bytes = Vec::new();
        for p in points {
            encode_into(p, &mut bytes);
        }
        Self { bytes }
    }

    /// Number of points in the store.
    pub fn len(&self) -> usize {
        self.bytes.len() / RECORD_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the point at `index`.
    pub fn get(&self, index: usize) -> Result<Point, IndexError> {
        let len = self.len();
        if index >= len {
            return Err(IndexError { index, len });
        }
        let offset = index * RECORD_SIZE;
        Ok(decode_record(&self.bytes[offset..offset + RECORD_SIZE]))
    }

    /// Iterate over all points in store order.
    pub fn iter(&self) -> Points<'_> {
        Points {
            chunks: self.bytes.chunks_exact(RECORD_SIZE),
        }
    }

    /// The encoded records backing this store.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the store to a point file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PointStore {
    type Item = Point;
    type IntoIter = Points<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazily decoding iterator over a [`PointStore`].
#[derive(Debug, Clone)]
pub struct Points<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl Iterator for Points<'_> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        self.chunks.next().map(decode_record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Points<'_> {}

impl DoubleEndedIterator for Points<'_> {
    fn next_back(&mut self) -> Option<Point> {
        self.chunks.next_back().map(decode_record)
    }
}

/// Write points to a file in the binary record format.
///
/// Returns the number of points written.
pub fn write_points<'a, P: AsRef<Path>>(
    path: P,
    points: impl IntoIterator<Item = &'a Point>,
) -> Result<usize, StoreError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut buf = Vec::with_capacity(RECORD_SIZE);
    let mut count = 0;
    for p in points {
        buf.clear();
        encode_into(p, &mut buf);
        writer.write_all(&buf)?;
        count += 1;
    }
    writer.flush()?;
    debug!("Wrote {} points", count);
    Ok(count)
}

fn check_aligned(len: u64) -> Result<u64, FormatError> {
    if len % RECORD_SIZE as u64 != 0 {
        return Err(FormatError::Misaligned {
            len,
            record_size: RECORD_SIZE,
        });
    }
    Ok(len / RECORD_SIZE as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_UNIQUIFIER: AtomicUsize = AtomicUsize::new(0);

    fn test_path(name: &str) -> PathBuf {
        let serial = TEST_UNIQUIFIER.fetch_add(1, Ordering::Relaxed);
        let mut path = std::env::temp_dir();
        path.push(format!(
            "cloudlod-store-{name}-{}-{}.xyzb",
            std::process::id(),
            serial
        ));
        path
    }

    fn line(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point::white(DVec3::new(i as f64, 0.0, 0.0)))
            .collect()
    }

    #[test]
    fn test_open_rejects_partial_record() {
        let path = test_path("partial");
        std::fs::write(&path, [0u8; 55]).unwrap();
        let err = PointStore::open(&path).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Format(FormatError::Misaligned { len: 55, .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_two_records() {
        let path = test_path("two");
        std::fs::write(&path, [0u8; 112]).unwrap();
        let store = PointStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().position, DVec3::ZERO);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_missing_file() {
        let path = test_path("missing");
        assert!(matches!(PointStore::open(&path), Err(StoreError::Io(_))));
    }

    #[test]
    fn test_get_out_of_range() {
        let store = PointStore::from_points(&line(3));
        assert_eq!(store.get(2).unwrap().position.x, 2.0);
        assert_eq!(store.get(3).unwrap_err(), IndexError { index: 3, len: 3 });
    }

    #[test]
    fn test_iter_is_restartable() {
        let points = line(5);
        let store = PointStore::from_points(&points);
        let first: Vec<Point> = store.iter().collect();
        let second: Vec<Point> = store.iter().collect();
        assert_eq!(first, points);
        assert_eq!(second, points);
        assert_eq!(store.iter().len(), 5);
        assert_eq!(store.iter().rev().next().unwrap().position.x, 4.0);
    }

    #[test]
    fn test_write_then_open() {
        let path = test_path("write");
        let points = line(10);
        assert_eq!(write_points(&path, &points).unwrap(), 10);
        let store = PointStore::open(&path).unwrap();
        assert_eq!(store.iter().collect::<Vec<_>>(), points);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_window_start_and_length() {
        let path = test_path("window");
        write_points(&path, &line(200)).unwrap();

        let options = StoreOptions::default().with_window(ReadWindow::full().with_start(50).with_length(10));
        let store = PointStore::open_with(&path, &options).unwrap();
        assert_eq!(store.len(), 20);
        assert_eq!(store.get(0).unwrap().position.x, 100.0);
        assert_eq!(store.get(19).unwrap().position.x, 119.0);

        // Length running past the end is clamped to the end.
        let options = StoreOptions::default().with_window(ReadWindow::full().with_start(90).with_length(50));
        let store = PointStore::open_with(&path, &options).unwrap();
        assert_eq!(store.len(), 20);
        assert_eq!(store.get(0).unwrap().position.x, 180.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_window_decimation_is_deterministic() {
        let path = test_path("decimate");
        write_points(&path, &line(10)).unwrap();

        let options = StoreOptions::default().with_window(ReadWindow::full().with_decimation(3));
        let a = PointStore::open_with(&path, &options).unwrap();
        let b = PointStore::open_with(&path, &options).unwrap();
        let xs: Vec<f64> = a.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(a.as_bytes(), b.as_bytes());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_window_rejects_bad_percent() {
        let path = test_path("badwindow");
        write_points(&path, &line(4)).unwrap();
        let options = StoreOptions::default().with_window(ReadWindow::full().with_start(101));
        assert!(matches!(
            PointStore::open_with(&path, &options),
            Err(StoreError::Window(_))
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_window_still_validates_whole_file() {
        let path = test_path("window-misaligned");
        let mut bytes = PointStore::from_points(&line(4)).as_bytes().to_vec();
        bytes.push(0);
        std::fs::write(&path, bytes).unwrap();
        let options = StoreOptions::default().with_window(ReadWindow::full().with_length(50));
        assert!(matches!(
            PointStore::open_with(&path, &options),
            Err(StoreError::Format(_))
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_from_bytes_validates_length() {
        assert!(PointStore::from_bytes(vec![0u8; 57]).is_err());
        assert_eq!(PointStore::from_bytes(vec![0u8; 56]).unwrap().len(), 1);
        assert!(PointStore::from_bytes(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_is_point_file() {
        assert!(is_point_file("data.xyzb"));
        assert!(is_point_file("/tmp/Scan.XYZB"));
        assert!(!is_point_file("data.xyz"));
        assert!(!is_point_file("xyzb"));
    }
}
