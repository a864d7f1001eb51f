//! Effective resolution of an ADC measuring through a resistive divider.
//!
//! ```text
//! Vin ---- R1 ----+---- Vout (ADC input)
//!                 |
//!                 R2
//!                 |
//!                GND
//! ```

use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{info, warn};

pub const ADC_BITS: u32 = 15;
pub const FULL_SCALE_MV: f64 = 4096.0;
pub const NUM_CHANNELS: usize = 4;

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Resistor values cannot be negative")]
    NegativeResistance,

    #[error("The voltage divider ratio is zero (R1+R2=0)")]
    ZeroDivider,

    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ResolutionError>;

/// ADC characteristics and the pass threshold
#[derive(Debug, Clone, Copy)]
pub struct AdcParameters {
    pub bits: u32,
    pub full_scale_mv: f64,
    pub channels: usize,
    pub threshold_codes_per_mv: f64, // Minimum codes per mV at the divider input
}

impl Default for AdcParameters {
    fn default() -> Self {
        Self {
            bits: ADC_BITS,
            full_scale_mv: FULL_SCALE_MV,
            channels: NUM_CHANNELS,
            threshold_codes_per_mv: 1.0,
        }
    }
}

impl AdcParameters {
    pub fn step_mv(&self) -> f64 {
        calculate_step(self.bits, self.full_scale_mv)
    }
}

/// Result of evaluating one channel's divider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReport {
    pub channel: usize,
    pub ratio: f64,
    pub mv_per_code: f64,  // Effective step at the divider input
    pub codes_per_mv: f64, // Sensitivity at the divider input
    pub met: bool,
}

/// Intrinsic step size in mV per code.
pub fn calculate_step(bits: u32, full_scale_mv: f64) -> f64 {
    full_scale_mv / 2f64.powi(bits as i32)
}

/// Vout/Vin for the divider, `None` when R1 + R2 is zero.
pub fn divider_ratio(r1: f64, r2: f64) -> Option<f64> {
    let total = r1 + r2;
    if total == 0.0 {
        return None;
    }
    Some(r2 / total)
}

pub fn evaluate_channel(params: &AdcParameters, channel: usize, r1: f64, r2: f64) -> Result<ChannelReport> {
    if r1 < 0.0 || r2 < 0.0 {
        return Err(ResolutionError::NegativeResistance);
    }
    let ratio = match divider_ratio(r1, r2) {
        Some(ratio) if ratio > 0.0 => ratio,
        _ => return Err(ResolutionError::ZeroDivider),
    };

    let mv_per_code = params.step_mv() / ratio;
    let codes_per_mv = 1.0 / mv_per_code;

    Ok(ChannelReport {
        channel,
        ratio,
        mv_per_code,
        codes_per_mv,
        met: codes_per_mv >= params.threshold_codes_per_mv,
    })
}

/// Prompt for R1/R2 on every channel and print the verdicts.
///
/// Bad input skips the channel; end of input stops early.
pub fn run_calculator<R, W>(params: &AdcParameters, input: &mut R, out: &mut W) -> Result<Vec<ChannelReport>>
where
    R: BufRead,
    W: Write,
{
    writeln!(out, "--- ADC Resolution Calculator ---")?;
    writeln!(out, "ADC: {}-bit, Full-Scale Range: {}mV\n", params.bits, params.full_scale_mv)?;
    writeln!(
        out,
        "The ADC's intrinsic step size is: {:.4} mV per digital code.\n",
        params.step_mv()
    )?;

    let mut reports = Vec::new();
    for channel in 1..=params.channels {
        writeln!(out, "--- Channel {} ---", channel)?;

        let Some(r1) = prompt_resistor(input, out, "R1", channel)? else {
            break;
        };
        let r1 = match r1 {
            Ok(v) => v,
            Err(e) => {
                skip_channel(out, channel, &e)?;
                continue;
            }
        };
        let Some(r2) = prompt_resistor(input, out, "R2", channel)? else {
            break;
        };
        let r2 = match r2 {
            Ok(v) => v,
            Err(e) => {
                skip_channel(out, channel, &e)?;
                continue;
            }
        };

        match evaluate_channel(params, channel, r1, r2) {
            Ok(report) => {
                write_report(out, params, &report)?;
                reports.push(report);
            }
            Err(e) => skip_channel(out, channel, &e)?,
        }
    }

    info!("Evaluated {} of {} channels", reports.len(), params.channels);
    Ok(reports)
}

/// `Ok(None)` on end of input; the inner result carries a parse failure.
fn prompt_resistor<R, W>(
    input: &mut R,
    out: &mut W,
    name: &str,
    channel: usize,
) -> Result<Option<std::result::Result<f64, ResolutionError>>>
where
    R: BufRead,
    W: Write,
{
    write!(out, "Enter the value of {} for Channel {} (in Ohms): ", name, channel)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(out)?;
        info!("Input closed at channel {}", channel);
        return Ok(None);
    }
    Ok(Some(parse_resistance(&line)))
}

fn parse_resistance(raw: &str) -> std::result::Result<f64, ResolutionError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ResolutionError::InvalidNumber(trimmed.to_string())),
    }
}

fn skip_channel<W: Write>(out: &mut W, channel: usize, err: &ResolutionError) -> Result<()> {
    warn!("Skipping channel {}: {}", channel, err);
    let message = match err {
        ResolutionError::NegativeResistance => {
            "Resistor values cannot be negative. Please try again."
        }
        ResolutionError::ZeroDivider => {
            "The voltage divider ratio is zero (R1+R2=0). Cannot calculate effective resolution."
        }
        ResolutionError::InvalidNumber(_) => {
            "Invalid input. Please enter a numerical value for the resistors."
        }
        ResolutionError::Io(_) => "An error occurred while reading input.",
    };
    writeln!(out, "{}\n", message)?;
    Ok(())
}

fn write_report<W: Write>(out: &mut W, params: &AdcParameters, report: &ChannelReport) -> Result<()> {
    writeln!(out, "Voltage divider ratio for Channel {}: {:.4}", report.channel, report.ratio)?;
    writeln!(
        out,
        "Effective sensitivity for Channel {}: {:.4} digital codes per 1mV.",
        report.channel, report.codes_per_mv
    )?;
    if report.met {
        writeln!(
            out,
            "Condition MET: You get at least {} digital code change per 1mV.\n",
            params.threshold_codes_per_mv
        )?;
    } else {
        writeln!(
            out,
            "Condition NOT MET: You get less than {} digital code change per 1mV.\n",
            params.threshold_codes_per_mv
        )?;
    }
    Ok(())
}
