use chrono::{DateTime, FixedOffset, NaiveDateTime};

/// First column of a scan log row. Scanners write either a plain number
/// (seconds since start) or a wall-clock timestamp; neither takes part in
/// the interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleTime {
    Seconds(f64),
    Zoned(DateTime<FixedOffset>),
    Local(NaiveDateTime),
    /// Anything else, kept verbatim.
    Text(String),
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl SampleTime {
    pub fn parse(field: &str) -> Self {
        if let Ok(secs) = field.parse::<f64>() {
            return SampleTime::Seconds(secs);
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(field) {
            return SampleTime::Zoned(t);
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(field, fmt).ok())
            .map(SampleTime::Local)
            .unwrap_or_else(|| SampleTime::Text(field.to_string()))
    }
}

impl From<f64> for SampleTime {
    fn from(secs: f64) -> Self {
        SampleTime::Seconds(secs)
    }
}

/// One row of the scan log: `time, power, azimuth, elevation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: SampleTime, // Scanner clock, opaque to the plot
    pub power: f64,       // Measured RF power
    pub azimuth: f64,     // Degrees
    pub elevation: f64,   // Degrees
}

/// Samples in file order. Re-read from scratch on every refresh.
pub type SampleSet = Vec<Sample>;

impl Sample {
    pub fn new(time: impl Into<SampleTime>, power: f64, azimuth: f64, elevation: f64) -> Self {
        Self {
            time: time.into(),
            power,
            azimuth,
            elevation,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.azimuth, self.elevation)
    }
}
