//! Calibration of raw counts to physical values.
//!
//! Unidata composites carry a calibration block in the product description
//! block: an indicator byte, an 8-byte unit label, a record count and up to
//! 28 records of four big-endian `i32`s
//! `(min_brightness, max_brightness, min_data, max_data)`.
//! Brightness values are scaled by 10000; data values by a power of ten
//! recovered from the records themselves.

use bytes::Buf;
use serde::Serialize;
use tracing::warn;

use crate::header::PDB_LEN;
use crate::payload::SampleBuffer;
use crate::DecodeError;

/// Offset of the calibration indicator byte.
pub const CALIBRATION_INDICATOR_OFFSET: usize = 46;
/// Indicator value announcing a calibration block.
pub const CALIBRATION_PRESENT: u8 = 128;
/// Offset and length of the unit label.
pub const UNIT_LABEL_OFFSET: usize = 47;
pub const UNIT_LABEL_LEN: usize = 8;
/// Offset of the record count.
pub const RECORD_COUNT_OFFSET: usize = 55;
/// Offset of the first record and the size of each record.
pub const RECORDS_OFFSET: usize = 56;
pub const RECORD_LEN: usize = 16;

const BRIGHTNESS_SCALE: i32 = 10000;
const MAX_DIVISOR: i32 = 10000;

/// One linear segment of the calibration curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalibrationBreakpoint {
    pub raw_min: i32,
    pub raw_max: i32,
    pub phys_min: i32,
    pub phys_max: i32,
    pub scale_divisor: i32,
}

impl CalibrationBreakpoint {
    pub fn contains(&self, raw: i64) -> bool {
        raw >= self.raw_min as i64 && raw <= self.raw_max as i64
    }

    /// Linear interpolation inside this bracket.
    pub fn map(&self, raw: i64) -> f32 {
        let scale = self.scale_divisor as f64;
        if self.raw_min == self.raw_max {
            return (self.phys_min as f64 / scale) as f32;
        }
        // Widened first; wire values may span the whole i32 range
        let a = (self.phys_min as f64 - self.phys_max as f64)
            / (self.raw_min as f64 - self.raw_max as f64);
        let b = self.phys_min as f64 - a * self.raw_min as f64;
        ((a * raw as f64 + b) / scale) as f32
    }
}

/// Quantity named by the calibration unit label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationUnit {
    /// Precipitation in inches
    Rain,
    /// Reflectivity in dBZ
    Echo,
    /// Echo tops in kft
    Tops,
    /// Vertically integrated liquid
    Vil,
    Unspecified,
}

impl CalibrationUnit {
    pub fn from_label(label: &[u8]) -> Self {
        let label = String::from_utf8_lossy(label).to_ascii_uppercase();
        if label.contains("INCH") {
            CalibrationUnit::Rain
        } else if label.contains("DBZ") {
            CalibrationUnit::Echo
        } else if label.contains("KFT") {
            CalibrationUnit::Tops
        } else if label.contains("KG/M") {
            CalibrationUnit::Vil
        } else {
            CalibrationUnit::Unspecified
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            CalibrationUnit::Rain => "IN",
            CalibrationUnit::Echo => "dBz",
            CalibrationUnit::Tops => "KFT",
            CalibrationUnit::Vil => "mm",
            CalibrationUnit::Unspecified => "",
        }
    }
}

/// Ordered piecewise-linear calibration table. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationTable {
    breakpoints: Vec<CalibrationBreakpoint>,
    unit: CalibrationUnit,
}

impl CalibrationTable {
    /// Build a table; `None` if there are no breakpoints.
    pub fn new(breakpoints: Vec<CalibrationBreakpoint>, unit: CalibrationUnit) -> Option<Self> {
        if breakpoints.is_empty() {
            return None;
        }
        Some(Self { breakpoints, unit })
    }

    pub fn breakpoints(&self) -> &[CalibrationBreakpoint] {
        &self.breakpoints
    }

    pub fn unit(&self) -> CalibrationUnit {
        self.unit
    }

    /// Map one raw count to its physical value.
    ///
    /// When brackets overlap the last matching one wins. Counts outside
    /// every bracket map to 0.
    pub fn calibrate(&self, raw: u32) -> f32 {
        let raw = raw as i64;
        self.breakpoints
            .iter()
            .rev()
            .find(|bp| bp.contains(raw))
            .map_or(0.0, |bp| bp.map(raw))
    }
}

/// A calibration record as stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCalibrationRecord {
    pub min_brightness: i32,
    pub max_brightness: i32,
    pub min_data: i32,
    pub max_data: i32,
}

impl RawCalibrationRecord {
    fn raw_range(&self) -> (i32, i32) {
        (
            self.min_brightness / BRIGHTNESS_SCALE,
            self.max_brightness / BRIGHTNESS_SCALE,
        )
    }
}

/// Largest power of ten, at most 10000, dividing both values.
pub fn decimal_divisor(min_data: i32, max_data: i32) -> i32 {
    let mut divisor = 1;
    while divisor < MAX_DIVISOR && min_data % (divisor * 10) == 0 && max_data % (divisor * 10) == 0
    {
        divisor *= 10;
    }
    divisor
}

/// Fold the per-record divisors into the common `(divisor, scale)` pair.
///
/// `divisor` is what data values are divided by when stored, `scale` what
/// calibrated output is divided by. Precipitation keeps at least two
/// decimals.
pub fn fold_scale(records: &[RawCalibrationRecord], precipitation: bool) -> (i32, i32) {
    let mut divisor = records
        .iter()
        .map(|r| decimal_divisor(r.min_data, r.max_data))
        .fold(MAX_DIVISOR, i32::min);
    let mut scale = MAX_DIVISOR / divisor;

    if precipitation && scale < 100 {
        divisor /= 100 / scale;
        scale = 100;
    }
    (divisor, scale)
}

/// Parse the calibration block of a product description block.
///
/// Bad records are logged and skipped; `None` when the block is absent or
/// no record survives.
pub fn parse_calibration_block(
    pdb: &[u8; PDB_LEN],
    precipitation: bool,
) -> Option<CalibrationTable> {
    if pdb[CALIBRATION_INDICATOR_OFFSET] != CALIBRATION_PRESENT {
        return None;
    }

    let unit =
        CalibrationUnit::from_label(&pdb[UNIT_LABEL_OFFSET..UNIT_LABEL_OFFSET + UNIT_LABEL_LEN]);
    let count = pdb[RECORD_COUNT_OFFSET] as usize;

    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        match read_record(pdb, i) {
            Ok(record) => records.push(record),
            Err(e) => warn!(error = %e, "Skipping calibration record"),
        }
    }

    let (divisor, scale) = fold_scale(&records, precipitation);
    let breakpoints = records
        .iter()
        .map(|r| {
            let (raw_min, raw_max) = r.raw_range();
            CalibrationBreakpoint {
                raw_min,
                raw_max,
                phys_min: r.min_data / divisor,
                phys_max: r.max_data / divisor,
                scale_divisor: scale,
            }
        })
        .collect();

    CalibrationTable::new(breakpoints, unit)
}

fn read_record(pdb: &[u8; PDB_LEN], index: usize) -> Result<RawCalibrationRecord, DecodeError> {
    let start = RECORDS_OFFSET + index * RECORD_LEN;
    let Some(mut buf) = pdb.get(start..start + RECORD_LEN) else {
        return Err(DecodeError::CalibrationParse {
            record: index,
            reason: format!("extends past the {}-byte description block", PDB_LEN),
        });
    };

    let record = RawCalibrationRecord {
        min_brightness: buf.get_i32(),
        max_brightness: buf.get_i32(),
        min_data: buf.get_i32(),
        max_data: buf.get_i32(),
    };

    let (raw_min, raw_max) = record.raw_range();
    if raw_min > raw_max {
        return Err(DecodeError::CalibrationParse {
            record: index,
            reason: format!("raw range {}..{} is inverted", raw_min, raw_max),
        });
    }
    Ok(record)
}

/// Applies a calibration table to a whole sample buffer.
pub struct CalibrationMapper;

impl CalibrationMapper {
    pub fn apply(samples: &SampleBuffer, table: &CalibrationTable) -> Vec<f32> {
        samples.iter().map(|raw| table.calibrate(raw)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(min_b: i32, max_b: i32, min_d: i32, max_d: i32) -> RawCalibrationRecord {
        RawCalibrationRecord {
            min_brightness: min_b * 10000,
            max_brightness: max_b * 10000,
            min_data: min_d,
            max_data: max_d,
        }
    }

    #[test]
    fn test_decimal_divisor() {
        assert_eq!(decimal_divisor(0, 7500), 100);
        assert_eq!(decimal_divisor(123, 400), 1);
        assert_eq!(decimal_divisor(-300000, 700000), 10000);
        // Zero is divisible by everything; the cap stops the search
        assert_eq!(decimal_divisor(0, 0), 10000);
    }

    #[test]
    fn test_fold_scale_uses_smallest_divisor() {
        let records = [record(0, 100, 0, 75000), record(101, 255, 75000, 750)];
        assert_eq!(fold_scale(&records, false), (10, 1000));
    }

    #[test]
    fn test_fold_scale_precipitation_minimum() {
        let records = [record(0, 255, 0, 50000)];
        assert_eq!(fold_scale(&records, false), (10000, 1));
        assert_eq!(fold_scale(&records, true), (100, 100));
    }

    #[test]
    fn test_fold_is_order_independent() {
        let a = record(0, 100, 0, 75000);
        let b = record(101, 255, 75000, 750);
        assert_eq!(fold_scale(&[a, b], true), fold_scale(&[b, a], true));
    }

    #[test]
    fn test_breakpoint_interpolation() {
        let bp = CalibrationBreakpoint {
            raw_min: 0,
            raw_max: 100,
            phys_min: -300,
            phys_max: 700,
            scale_divisor: 10,
        };
        assert_eq!(bp.map(0), -30.0);
        assert_eq!(bp.map(100), 70.0);
        assert_eq!(bp.map(50), 20.0);
    }

    #[test]
    fn test_extreme_data_range() {
        let bp = CalibrationBreakpoint {
            raw_min: 0,
            raw_max: 255,
            phys_min: -2_000_000_001,
            phys_max: 2_000_000_001,
            scale_divisor: 1,
        };
        assert!((bp.map(0) - (-2.0e9)).abs() < 1e3);
        assert!((bp.map(255) - 2.0e9).abs() < 1e3);
        let mid = bp.map(10);
        assert!(mid.is_finite() && mid > bp.map(0) && mid < bp.map(255));

        let inverted = CalibrationBreakpoint {
            raw_min: i32::MIN,
            raw_max: i32::MAX,
            phys_min: i32::MAX,
            phys_max: i32::MIN,
            scale_divisor: 1,
        };
        assert!(inverted.map(0).is_finite());
    }

    #[test]
    fn test_degenerate_bracket() {
        let bp = CalibrationBreakpoint {
            raw_min: 5,
            raw_max: 5,
            phys_min: 250,
            phys_max: 900,
            scale_divisor: 100,
        };
        assert_eq!(bp.map(5), 2.5);
    }

    #[test]
    fn test_last_matching_bracket_wins() {
        let low = CalibrationBreakpoint {
            raw_min: 0,
            raw_max: 100,
            phys_min: 0,
            phys_max: 100,
            scale_divisor: 1,
        };
        let high = CalibrationBreakpoint {
            raw_min: 100,
            raw_max: 200,
            phys_min: 1000,
            phys_max: 2000,
            scale_divisor: 1,
        };
        let table = CalibrationTable::new(vec![low, high], CalibrationUnit::Unspecified).unwrap();
        assert_eq!(table.calibrate(50), 50.0);
        assert_eq!(table.calibrate(100), 1000.0);
        assert_eq!(table.calibrate(250), 0.0);
    }

    #[test]
    fn test_unit_labels() {
        assert_eq!(CalibrationUnit::from_label(b"INCHES  "), CalibrationUnit::Rain);
        assert_eq!(CalibrationUnit::from_label(b"dBz     "), CalibrationUnit::Echo);
        assert_eq!(CalibrationUnit::from_label(b"KFT     "), CalibrationUnit::Tops);
        assert_eq!(CalibrationUnit::from_label(b"KG/M**2 "), CalibrationUnit::Vil);
        assert_eq!(CalibrationUnit::from_label(&[0; 8]), CalibrationUnit::Unspecified);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(CalibrationTable::new(Vec::new(), CalibrationUnit::Unspecified).is_none());
    }

    #[test]
    fn test_parse_block_skips_inverted_record() {
        let mut pdb = [0u8; PDB_LEN];
        pdb[CALIBRATION_INDICATOR_OFFSET] = CALIBRATION_PRESENT;
        pdb[UNIT_LABEL_OFFSET..UNIT_LABEL_OFFSET + 3].copy_from_slice(b"DBZ");
        pdb[RECORD_COUNT_OFFSET] = 2;

        let mut put = |i: usize, vals: [i32; 4]| {
            let start = RECORDS_OFFSET + i * RECORD_LEN;
            for (j, v) in vals.iter().enumerate() {
                pdb[start + j * 4..start + j * 4 + 4].copy_from_slice(&v.to_be_bytes());
            }
        };
        put(0, [2_000_000, 1_000_000, 0, 10]);
        put(1, [0, 2_550_000, -300, 750]);

        let table = parse_calibration_block(&pdb, false).unwrap();
        assert_eq!(table.unit(), CalibrationUnit::Echo);
        assert_eq!(
            table.breakpoints(),
            &[CalibrationBreakpoint {
                raw_min: 0,
                raw_max: 255,
                phys_min: -30,
                phys_max: 75,
                scale_divisor: 1000,
            }]
        );
        assert!((table.calibrate(0) - (-0.03)).abs() < 1e-6);
        assert!((table.calibrate(255) - 0.075).abs() < 1e-6);
    }

    #[test]
    fn test_parse_block_absent() {
        let pdb = [0u8; PDB_LEN];
        assert!(parse_calibration_block(&pdb, false).is_none());
    }
}
