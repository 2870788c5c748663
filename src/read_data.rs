use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::sample::{Sample, SampleSet, SampleTime};

const COLUMNS: [&str; 4] = ["time", "power", "azimuth", "elevation"];

/// Why a scan log could not be turned into a [`SampleSet`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: expected {} columns, found {found}", COLUMNS.len())]
    ColumnCount { line: u64, found: usize },

    #[error("line {line}: {column} value {value:?} is not a number")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: {column} value is not finite")]
    NonFinite { line: u64, column: &'static str },
}

/// Load a headerless `time,power,azimuth,elevation` CSV.
///
/// The time column is taken as written (number, timestamp or free text).
/// Power, azimuth and elevation must be finite numbers. Blank lines are
/// skipped; any other malformed row fails the whole load, so a half-written
/// trailing line shows up as an error until the writer finishes it.
pub fn load_samples(path: &Path) -> Result<SampleSet, LoadError> {
    let read_err = |source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_err)?;

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != COLUMNS.len() {
            return Err(LoadError::ColumnCount {
                line,
                found: record.len(),
            });
        }

        let mut values = [0.0f64; 3];
        for (slot, (field, column)) in values
            .iter_mut()
            .zip(record.iter().zip(COLUMNS).skip(1))
        {
            let v: f64 = field.parse().map_err(|_| LoadError::InvalidNumber {
                line,
                column,
                value: field.to_string(),
            })?;
            if !v.is_finite() {
                return Err(LoadError::NonFinite { line, column });
            }
            *slot = v;
        }
        let [power, azimuth, elevation] = values;
        let time = SampleTime::parse(&record[0]);
        out.push(Sample::new(time, power, azimuth, elevation));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_rows_in_file_order() {
        let file = csv_file("0,1.0,0,0\n1,2.0,10,0\n2,3.0,0,10\n3,4.0,10,10\n");
        let samples = load_samples(file.path()).unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], Sample::new(0.0, 1.0, 0.0, 0.0));
        assert_eq!(samples[3], Sample::new(3.0, 4.0, 10.0, 10.0));
    }

    #[test]
    fn tolerates_whitespace_and_blank_lines() {
        let file = csv_file(" 5 , -42.5 , 180.25 , 12\n\n6,-40,181,12.5\n");
        let samples = load_samples(file.path()).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].power, -42.5);
        assert_eq!(samples[1].position(), (181.0, 12.5));
    }

    #[test]
    fn single_row_loads() {
        let file = csv_file("0,1.0,0,0\n");
        assert_eq!(load_samples(file.path()).unwrap().len(), 1);
    }

    #[test]
    fn empty_file_is_an_empty_set() {
        let file = csv_file("");
        assert!(load_samples(file.path()).unwrap().is_empty());
    }

    #[test]
    fn non_numeric_column_fails_the_load() {
        let file = csv_file("0,1.0,0,0\n1,loud,10,0\n");
        let err = load_samples(file.path()).unwrap_err();

        match err {
            LoadError::InvalidNumber { line, column, value } => {
                assert_eq!(line, 2);
                assert_eq!(column, "power");
                assert_eq!(value, "loud");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_column_count_fails_the_load() {
        let file = csv_file("0,1.0,0,0\n1,2.0,10\n");
        assert!(matches!(
            load_samples(file.path()),
            Err(LoadError::ColumnCount { line: 2, found: 3 })
        ));
    }

    #[test]
    fn header_row_is_rejected() {
        let file = csv_file("time,power,azimuth,elevation\n0,1,0,0\n");
        assert!(matches!(
            load_samples(file.path()),
            Err(LoadError::InvalidNumber { line: 1, column: "power", .. })
        ));
    }

    #[test]
    fn timestamp_time_column_loads() {
        let file = csv_file("2024-01-01T00:00:00,1.0,0,0\n2024-01-01T00:00:01,2.0,10,0\n");
        let samples = load_samples(file.path()).unwrap();

        assert_eq!(samples.len(), 2);
        assert!(matches!(samples[0].time, SampleTime::Local(_)));
        assert_eq!(samples[1].power, 2.0);
        assert_eq!(samples[1].position(), (10.0, 0.0));
    }

    #[test]
    fn timestamp_rows_still_need_numeric_power() {
        let file = csv_file("2024-01-01T00:00:00,1.0,0,0\n0,loud,0,0\n");
        assert!(matches!(
            load_samples(file.path()),
            Err(LoadError::InvalidNumber { line: 2, column: "power", .. })
        ));
    }

    #[test]
    fn nan_is_rejected() {
        let file = csv_file("0,NaN,0,0\n");
        assert!(matches!(
            load_samples(file.path()),
            Err(LoadError::NonFinite { column: "power", .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_samples(&dir.path().join("absent.csv")).unwrap_err();

        assert!(matches!(err, LoadError::Read { .. }));
        assert!(err.to_string().contains("absent.csv"));
    }
}
