//! Typed decoders for trimmed pseudo-file and command-output text.

use crate::error::DecodeError;
use std::str::FromStr;

/// Values dmidecode prints in place of a number when a slot is empty or unknown.
const DMI_SENTINELS: &[&str] = &["", "Unknown", "0", "Not Specified"];

/// Parse base-10 integer text.
pub fn as_int<T: FromStr>(text: &str) -> Result<T, DecodeError> {
    text.trim().parse::<T>().map_err(|_| DecodeError::Parse {
        value: text.to_string(),
        expected: "integer",
    })
}

pub fn as_float(text: &str) -> Result<f64, DecodeError> {
    text.trim().parse::<f64>().map_err(|_| DecodeError::Parse {
        value: text.to_string(),
        expected: "number",
    })
}

/// Accepts `1/true/yes` and `0/false/no`, case-insensitive.
pub fn as_bool(text: &str) -> Result<bool, DecodeError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(DecodeError::Parse {
            value: text.to_string(),
            expected: "boolean",
        }),
    }
}

/// Empty text means the attribute carries no value.
pub fn as_optional_string(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Decode a cache-style size (`"48K"`, `"2M"`, `"1048576"`) into bytes.
/// A bare number is already bytes; `K`, `M` and `G` are powers of 1024.
pub fn size_with_unit(text: &str) -> Result<u64, DecodeError> {
    let text = text.trim();
    let Some(last) = text.chars().last() else {
        return Err(DecodeError::Parse {
            value: text.to_string(),
            expected: "size",
        });
    };

    if last.is_ascii_digit() {
        return as_int(text);
    }

    let shift = match last.to_ascii_uppercase() {
        'K' => 10,
        'M' => 20,
        'G' => 30,
        unit => {
            return Err(DecodeError::Unit {
                value: text.to_string(),
                unit,
            });
        }
    };

    let digits = &text[..text.len() - last.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::Parse {
            value: text.to_string(),
            expected: "size",
        });
    }
    let value: u64 = as_int(digits)?;
    value.checked_mul(1 << shift).ok_or(DecodeError::Invalid {
        what: "size (overflow)",
        value: text.to_string(),
    })
}

/// Pull a number out of a labelled line such as `"Size: 16 GB"`.
///
/// Returns `None` when the line has a different label, or when the value is a
/// sentinel (`Unknown`, `No Module Installed`, `0`, empty) or not a number.
/// `None` means "field absent", never zero.
pub fn strip_suffix_and_scale(
    line: &str,
    prefix: &str,
    suffixes: &[&str],
    multiplier: u64,
) -> Option<u64> {
    let mut value = line.trim().strip_prefix(prefix)?.trim();
    for suffix in suffixes {
        if let Some(stripped) = value.strip_suffix(suffix) {
            value = stripped.trim_end();
        }
    }

    if DMI_SENTINELS.contains(&value) || value.contains("No Module") {
        return None;
    }

    let number: u64 = value.parse().ok()?;
    number.checked_mul(multiplier)
}

/// Pull a string out of a labelled line; empty values are absent.
pub fn strip_label(line: &str, prefix: &str) -> Option<String> {
    as_optional_string(line.trim().strip_prefix(prefix)?)
}

/// sysfs frequencies are in kHz.
pub fn mhz_from_khz(khz: u64) -> f64 {
    khz as f64 / 1000.0
}
