/* Copyright 2025 The ModelarDB Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Implementation of helper functions to convert between the literals used in conditions and
//! [`Timestamps`](Timestamp).

use arrow::compute::kernels::cast_utils::string_to_timestamp_nanos;
use datafusion::scalar::ScalarValue;

use crate::error::{ModelarDbTypesError, Result};
use crate::types::{MICROSECONDS_PER_SECOND, Timestamp};

/// Convert `value` to a [`Timestamp`]. All Apache Arrow timestamp types, [`ScalarValue::Int64`]
/// containing microseconds, and RFC 3339 strings are supported. If `value` cannot be converted,
/// [`ModelarDbTypesError`] is returned.
pub fn timestamp_from_scalar(value: &ScalarValue) -> Result<Timestamp> {
    let maybe_timestamp = match value {
        ScalarValue::TimestampSecond(Some(seconds), _) => {
            seconds.checked_mul(MICROSECONDS_PER_SECOND)
        }
        ScalarValue::TimestampMillisecond(Some(milliseconds), _) => milliseconds.checked_mul(1000),
        ScalarValue::TimestampMicrosecond(Some(microseconds), _) => Some(*microseconds),
        ScalarValue::TimestampNanosecond(Some(nanoseconds), _) => {
            Some(nanoseconds.div_euclid(1000))
        }
        ScalarValue::Int64(Some(microseconds)) => Some(*microseconds),
        ScalarValue::Utf8(Some(string))
        | ScalarValue::LargeUtf8(Some(string))
        | ScalarValue::Utf8View(Some(string)) => {
            Some(string_to_timestamp_nanos(string)?.div_euclid(1000))
        }
        _ => {
            return Err(ModelarDbTypesError::InvalidArgument(format!(
                "{value} is not a timestamp."
            )));
        }
    };

    maybe_timestamp.ok_or_else(|| {
        ModelarDbTypesError::InvalidArgument(format!("{value} cannot be represented in microseconds."))
    })
}

/// Convert `timestamp` to a [`ScalarValue`] that can be used as the literal of a condition.
pub fn timestamp_to_scalar(timestamp: Timestamp) -> ScalarValue {
    ScalarValue::TimestampMicrosecond(Some(timestamp), None)
}

/// Align `timestamp` down to the closest multiple of `alignment_in_seconds`. If
/// `alignment_in_seconds` is not positive or the aligned timestamp cannot be represented,
/// [`ModelarDbTypesError`] is returned.
pub fn align_timestamp(timestamp: Timestamp, alignment_in_seconds: i64) -> Result<Timestamp> {
    let alignment = alignment_in_seconds
        .checked_mul(MICROSECONDS_PER_SECOND)
        .filter(|alignment| *alignment > 0)
        .ok_or_else(|| {
            ModelarDbTypesError::InvalidArgument(format!(
                "An alignment of {alignment_in_seconds} seconds is not supported."
            ))
        })?;

    timestamp
        .checked_sub(timestamp.rem_euclid(alignment))
        .ok_or_else(|| {
            ModelarDbTypesError::InvalidArgument(format!(
                "{timestamp} cannot be aligned to {alignment_in_seconds} seconds."
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests for timestamp_from_scalar().
    #[test]
    fn test_timestamp_from_timestamp_second() {
        let value = ScalarValue::TimestampSecond(Some(60), None);
        assert_eq!(timestamp_from_scalar(&value).unwrap(), 60_000_000);
    }

    #[test]
    fn test_timestamp_from_timestamp_millisecond() {
        let value = ScalarValue::TimestampMillisecond(Some(1500), None);
        assert_eq!(timestamp_from_scalar(&value).unwrap(), 1_500_000);
    }

    #[test]
    fn test_timestamp_from_negative_timestamp_nanosecond() {
        let value = ScalarValue::TimestampNanosecond(Some(-1), None);
        assert_eq!(timestamp_from_scalar(&value).unwrap(), -1);
    }

    #[test]
    fn test_timestamp_from_rfc3339_string() {
        let value = ScalarValue::Utf8(Some("1970-01-01T00:01:00Z".to_owned()));
        assert_eq!(timestamp_from_scalar(&value).unwrap(), 60_000_000);
    }

    #[test]
    fn test_timestamp_from_overflowing_timestamp_second() {
        let value = ScalarValue::TimestampSecond(Some(i64::MAX), None);
        assert!(timestamp_from_scalar(&value).is_err());
    }

    #[test]
    fn test_timestamp_from_null() {
        let value = ScalarValue::TimestampMicrosecond(None, None);
        assert!(timestamp_from_scalar(&value).is_err());
    }

    #[test]
    fn test_timestamp_from_boolean() {
        let value = ScalarValue::Boolean(Some(true));
        assert!(timestamp_from_scalar(&value).is_err());
    }

    // Tests for align_timestamp().
    #[test]
    fn test_align_timestamp_to_one_second() {
        assert_eq!(align_timestamp(1_999_999, 1).unwrap(), 1_000_000);
    }

    #[test]
    fn test_align_timestamp_to_one_minute() {
        assert_eq!(align_timestamp(119_000_000, 60).unwrap(), 60_000_000);
    }

    #[test]
    fn test_align_negative_timestamp() {
        assert_eq!(align_timestamp(-1, 1).unwrap(), -1_000_000);
    }

    #[test]
    fn test_align_timestamp_with_zero_alignment() {
        assert!(align_timestamp(1, 0).is_err());
    }

    #[test]
    fn test_align_unrepresentable_timestamp() {
        assert!(align_timestamp(i64::MIN, 1).is_err());
    }

    #[test]
    fn test_timestamp_from_sub_second_rfc3339_string() {
        let value = ScalarValue::Utf8(Some("1970-01-01T00:01:59.5Z".to_owned()));
        assert_eq!(timestamp_from_scalar(&value).unwrap(), 119_500_000);
    }
}
