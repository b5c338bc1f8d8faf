use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "csv-mix",
    author,
    version,
    about = "Merge ingredient CSV files, averaging weights across all inputs",
    long_about = None
)]
pub struct MixArgs {
    /// One or more CSV files to mix ('-' reads from stdin)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// printf-style template applied to the numeric weight, e.g. '%.2f'
    #[arg(short = 'f', long = "format")]
    pub format: Option<String>,
    /// Emit weights as percentages with a trailing '%'
    #[arg(short = 'p', long = "percent", conflicts_with = "percent_nosign")]
    pub percent: bool,
    /// Emit weights scaled to percentages without the '%' sign
    #[arg(short = 'P', long = "percent-nosign")]
    pub percent_nosign: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_named_and_literal_forms() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("|").unwrap(), b'|');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }

    #[test]
    fn percent_flags_conflict_at_the_cli_layer() {
        let err = MixArgs::try_parse_from([
            "csv-mix", "-i", "a.csv", "--percent", "--percent-nosign",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn inputs_are_required_and_repeatable() {
        assert!(MixArgs::try_parse_from(["csv-mix"]).is_err());
        let args = MixArgs::try_parse_from(["csv-mix", "-i", "a.csv", "-i", "b.csv"]).unwrap();
        assert_eq!(args.inputs.len(), 2);
    }
}
