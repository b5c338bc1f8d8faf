//! Weight parsing and display formatting.
//!
//! Input cells carry either a bare number (`0.3`) or a percent string
//! (`60%`, `60 %`); both parse to a plain `f64` fraction. The `%` suffix is a
//! presentation convention resolved here and never retained afterward.

use anyhow::{Result, bail};

use crate::error::MixError;

/// Output transform applied to an averaged weight before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightFormat {
    /// Emit the fraction unchanged.
    #[default]
    Plain,
    /// Scale by 100 and append a literal `%`. Overrides any template.
    Percent,
    /// Scale by 100, no suffix.
    PercentNoSign,
}

pub fn parse_weight(raw: &str) -> Result<f64, MixError> {
    let trimmed = raw.trim();
    let parse = |text: &str| {
        text.parse::<f64>().map_err(|_| MixError::Parse {
            raw: raw.to_string(),
        })
    };
    match trimmed.strip_suffix('%') {
        Some(body) => Ok(parse(body.trim_end())? / 100.0),
        None => parse(trimmed),
    }
}

/// Renders `value` per the configured mode, then applies `template` (if any)
/// to the scaled number. `Percent` ignores the template entirely.
pub fn format_weight(value: f64, mode: WeightFormat, template: Option<&str>) -> Result<String> {
    match mode {
        WeightFormat::Percent => Ok(format!("{}%", display_number(value * 100.0))),
        WeightFormat::PercentNoSign => render(value * 100.0, template),
        WeightFormat::Plain => render(value, template),
    }
}

fn render(value: f64, template: Option<&str>) -> Result<String> {
    match template {
        Some(template) => apply_template(template, value),
        None => Ok(display_number(value)),
    }
}

/// Default float display: integral values print without a fractional part.
pub fn display_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Applies a printf-style template to `value`.
///
/// Supported conversions: `%[0][width][.precision]f` and the `%%` escape.
/// Anything else is rejected as a configuration error rather than guessed at.
fn apply_template(template: &str, value: f64) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let zero_pad = chars.peek() == Some(&'0');
        if zero_pad {
            chars.next();
        }
        let width = take_digits(&mut chars);
        let precision = if chars.peek() == Some(&'.') {
            chars.next();
            Some(take_digits(&mut chars).unwrap_or(0))
        } else {
            None
        };
        match chars.next() {
            Some('f') => out.push_str(&format_float(value, zero_pad, width, precision)),
            other => bail!(MixError::Config(format!(
                "unsupported conversion in format template '{template}': {}",
                other.map_or_else(|| "truncated '%'".to_string(), |c| format!("'%{c}'"))
            ))),
        }
    }
    Ok(out)
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(ch) = chars.peek()
        && ch.is_ascii_digit()
    {
        digits.push(*ch);
        chars.next();
    }
    digits.parse().ok()
}

fn format_float(value: f64, zero_pad: bool, width: Option<usize>, precision: Option<usize>) -> String {
    let precision = precision.unwrap_or(6);
    let rendered = format!("{value:.precision$}");
    match width {
        Some(width) if zero_pad => format!("{rendered:0>width$}"),
        Some(width) => format!("{rendered:>width$}"),
        None => rendered,
    }
}
