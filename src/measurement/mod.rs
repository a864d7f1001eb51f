//! Parsing of the measurement lines printed by the instrumentation application.
//!
//! A measurement line has three `|`-separated segments:
//!
//! ```text
//! A0: corrente-bateria-bombordo | ADC:  7581 | Value:    -0.29 A
//! ```
//!
//! Anything else (status messages, log output, partial lines) is not a
//! measurement and yields `None`.

pub mod data;

pub use data::{Measurement, MeasurementRow};

/// Parse one line of application output.
///
/// Returns `None` for any line that does not match the measurement grammar.
/// Nothing is allocated until every segment has been validated.
pub fn parse_measurement_line(line: &str) -> Option<Measurement> {
    let mut segments = line.split('|');
    let channel_segment = segments.next()?;
    let adc_segment = segments.next()?;
    let value_segment = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let (channel, field_name) = parse_channel_segment(channel_segment)?;
    let adc_code = parse_adc_segment(adc_segment)?;
    let (value, unit) = parse_value_segment(value_segment)?;

    Some(Measurement {
        channel,
        field_name: field_name.to_string(),
        adc_code,
        value,
        unit: unit.to_string(),
    })
}

/// `A<digit>: <field-name>`
fn parse_channel_segment(segment: &str) -> Option<(u8, &str)> {
    let (channel_part, name_part) = segment.split_once(':')?;
    let digits = channel_part.trim().strip_prefix('A')?;
    if digits.len() != 1 || !digits.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    let channel = digits.as_bytes()[0] - b'0';

    let field_name = name_part.trim();
    if field_name.is_empty() || field_name.contains(':') {
        return None;
    }
    Some((channel, field_name))
}

/// `ADC: <integer>`
fn parse_adc_segment(segment: &str) -> Option<i32> {
    let raw = labelled_value(segment, "ADC")?;
    raw.parse().ok()
}

/// `Value: <float> <unit>`
fn parse_value_segment(segment: &str) -> Option<(f64, &str)> {
    let raw = labelled_value(segment, "Value")?;
    let mut tokens = raw.split_whitespace();
    let number = tokens.next()?;
    let unit = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    Some((number.parse().ok()?, unit))
}

fn labelled_value<'a>(segment: &'a str, label: &str) -> Option<&'a str> {
    let (name, value) = segment.split_once(':')?;
    if name.trim() != label {
        return None;
    }
    Some(value.trim())
}
