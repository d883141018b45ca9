//! Test utilities for format round-trip testing
//!
//! Shared helpers over [`AlFormat`] so format test modules don't repeat the
//! parse/build/compare dance.

use crate::{AlFormat, Error, Result};
use std::fmt::Debug;

/// Build a value, parse the bytes back and compare
pub fn test_round_trip<T>(original: &T) -> Result<()>
where
    T: AlFormat + PartialEq + Debug,
{
    let data = original.build()?;
    let parsed = T::parse(&data)?;

    if original != &parsed {
        return Err(Error::Corrupt(format!(
            "round trip changed the value:\noriginal: {original:?}\nparsed: {parsed:?}"
        )));
    }
    Ok(())
}

/// Parse bytes, rebuild them and require identical output
///
/// Stricter than a value comparison: every preserved byte must come back.
pub fn test_round_trip_with_data<T>(data: &[u8]) -> Result<()>
where
    T: AlFormat + PartialEq + Debug,
{
    T::verify_round_trip(data)?;

    let parsed = T::parse(data)?;
    let reparsed = T::parse(&parsed.build()?)?;
    if parsed != reparsed {
        return Err(Error::Corrupt(format!(
            "reparse differs:\nparsed: {parsed:?}\nreparsed: {reparsed:?}"
        )));
    }
    Ok(())
}

/// Require that parsing `invalid_data` fails
pub fn test_invalid_data_rejected<T>(invalid_data: &[u8]) -> Result<()>
where
    T: AlFormat + Debug,
{
    match T::parse(invalid_data) {
        Ok(parsed) => Err(Error::Corrupt(format!(
            "expected parsing to fail, got {parsed:?}"
        ))),
        Err(_) => Ok(()),
    }
}

/// Helper to assert round-trip works for a value
#[macro_export]
macro_rules! assert_round_trip {
    ($value:expr) => {
        $crate::test_utils::test_round_trip(&$value).expect("Round-trip should succeed")
    };
}

/// Helper to assert byte-exact round-trip works with data
#[macro_export]
macro_rules! assert_round_trip_data {
    ($type:ty, $data:expr) => {
        $crate::test_utils::test_round_trip_with_data::<$type>($data)
            .expect("Round-trip with data should succeed")
    };
}

/// Helper to assert invalid data is rejected
#[macro_export]
macro_rules! assert_invalid_data_rejected {
    ($type:ty, $data:expr) => {
        $crate::test_utils::test_invalid_data_rejected::<$type>($data)
            .expect("Invalid data should be rejected")
    };
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cursor::{ByteReader, ByteWriter};

    // Simple format to verify the utilities themselves
    #[derive(Debug, PartialEq)]
    struct Word {
        value: u32,
    }

    impl Word {
        fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
            Ok(Self {
                value: reader.read_u32()?,
            })
        }

        fn write(&self, writer: &mut ByteWriter) -> Result<()> {
            writer.write_u32(self.value);
            Ok(())
        }
    }

    crate::impl_al_format!(Word, reader => Word::parse(reader));

    #[test]
    fn test_round_trip_utility() {
        test_round_trip(&Word { value: 42 }).expect("Round-trip should succeed");
    }

    #[test]
    fn test_round_trip_with_data_utility() {
        test_round_trip_with_data::<Word>(&42u32.to_le_bytes())
            .expect("Round-trip with data should succeed");
    }

    #[test]
    fn test_trailing_bytes_detected() {
        let err = test_round_trip_with_data::<Word>(&[1, 0, 0, 0, 9]).unwrap_err();
        assert!(matches!(err, Error::RoundTripMismatch { offset: 4, .. }));
    }

    #[test]
    fn test_invalid_data_rejected_utility() {
        test_invalid_data_rejected::<Word>(&[1, 2]).expect("Should reject invalid data");
    }
}
