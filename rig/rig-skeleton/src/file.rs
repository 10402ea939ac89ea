//! Skeleton files.
//!
//! A skeleton file is whitespace-delimited rows of
//! `name x y z parent_name_or_-1`, in parent-before-child order. Positions
//! in the file use the `[-0.5, 0.5]` convention of the persisted outputs and
//! are doubled on read to match the builder's `[-1, 1]` convention.

use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{SkeletonError, SkeletonResult};
use crate::skeleton::{Skeleton, SkeletonBuilder};

impl Skeleton {
    /// Read a skeleton from a file.
    ///
    /// Rows with fewer than five fields and `#` comment lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a coordinate fails to
    /// parse, or the joint graph is invalid (duplicate names, unknown
    /// parents, no root).
    pub fn from_file<P: AsRef<Path>>(path: P) -> SkeletonResult<Self> {
        let reader = BufReader::new(std::fs::File::open(path)?);
        Self::from_reader(reader)
    }

    /// Read a skeleton from any buffered reader; see [`Skeleton::from_file`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`Skeleton::from_file`].
    pub fn from_reader<R: BufRead>(reader: R) -> SkeletonResult<Self> {
        let mut builder = SkeletonBuilder::new();

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = line_index + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 || fields[0].starts_with('#') {
                continue;
            }

            let mut coords = [0.0f64; 3];
            for (slot, token) in coords.iter_mut().zip(&fields[1..4]) {
                *slot = token.parse().map_err(|_| SkeletonError::Parse {
                    line: line_num,
                    message: format!("bad coordinate `{token}`"),
                })?;
            }

            let parent = if fields[4] == "-1" {
                None
            } else {
                Some(fields[4])
            };

            // file positions are in [-0.5, 0.5]; the builder halves them back
            builder = builder.joint(
                fields[0],
                Point3::new(coords[0], coords[1], coords[2]) * 2.0,
                parent,
            );
        }

        builder.build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_rows_and_doubles_positions() {
        let src = "\
# name x y z parent
root 0 0.25 0 -1
mid 0 0 0 root
tip 0 -0.25 0 mid
";
        let s = Skeleton::from_reader(Cursor::new(src)).unwrap();
        assert_eq!(s.full_count(), 3);
        // 0.25 doubled, then halved on insert
        assert_eq!(s.full_positions()[0], Point3::new(0.0, 0.25, 0.0));
        assert_eq!(s.reduced_count(), 2);
    }

    #[test]
    fn short_rows_are_skipped() {
        let src = "root 0 0 0 -1\nnoise\ntip 0 1 0 root\n";
        let s = Skeleton::from_reader(Cursor::new(src)).unwrap();
        assert_eq!(s.full_count(), 2);
    }

    #[test]
    fn bad_coordinate_aborts() {
        let src = "root 0 zero 0 -1\n";
        assert!(matches!(
            Skeleton::from_reader(Cursor::new(src)),
            Err(SkeletonError::Parse { line: 1, .. })
        ));
    }
}
