//! Extracts timing, score and alignment positions from the benchmarked
//! executable's stdout. Memory fields are filled in later by the sweep driver.

use std::fmt;

use crate::error::{HarnessError, Result};

pub const ENCRYPTION_PREFIX: &str = "Encryption time:";
pub const HOMOMORPHIC_PREFIX: &str = "Homomorphic computation time:";
pub const DECRYPTION_PREFIX: &str = "Decryption time:";
pub const SCORE_PREFIX: &str = "Score:";
pub const START_PREFIX: &str = "Starting pos:";
pub const END_PREFIX: &str = "Ending pos:";

/// A (row, column) cell reported by the aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: i64,
    pub col: i64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Everything measured for one run. `None` means the value was absent or unparsable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    pub encryption_time: Option<f64>,
    pub homomorphic_time: Option<f64>,
    pub decryption_time: Option<f64>,
    pub score: Option<i64>,
    pub start_pos: Option<Position>,
    pub end_pos: Option<Position>,
    pub mem_avg_mb: Option<f64>,
    pub mem_max_mb: Option<f64>,
}

/// One recognised line of child output.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricLine {
    EncryptionTime(f64),
    HomomorphicTime(f64),
    DecryptionTime(f64),
    Score(i64),
    StartPos(Position),
    EndPos(Position),
}

#[derive(Debug, Default)]
pub struct ParsedOutput {
    pub result: RunResult,
    /// Recognised lines whose value could not be extracted.
    pub errors: Vec<HarnessError>,
}

/// Parse a single line. `Ok(None)` for lines that carry no metric.
pub fn parse_line(line: &str) -> Result<Option<MetricLine>> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(ENCRYPTION_PREFIX) {
        return parse_seconds(rest, "encryption_time", line).map(|v| Some(MetricLine::EncryptionTime(v)));
    }
    if let Some(rest) = line.strip_prefix(HOMOMORPHIC_PREFIX) {
        return parse_seconds(rest, "homomorphic_time", line).map(|v| Some(MetricLine::HomomorphicTime(v)));
    }
    if let Some(rest) = line.strip_prefix(DECRYPTION_PREFIX) {
        return parse_seconds(rest, "decryption_time", line).map(|v| Some(MetricLine::DecryptionTime(v)));
    }
    if let Some(rest) = line.strip_prefix(SCORE_PREFIX) {
        return rest
            .trim()
            .parse::<i64>()
            .map(|v| Some(MetricLine::Score(v)))
            .map_err(|_| field_error("score", line));
    }
    if let Some(rest) = line.strip_prefix(START_PREFIX) {
        return parse_position(rest, "start_pos", line).map(|p| Some(MetricLine::StartPos(p)));
    }
    if let Some(rest) = line.strip_prefix(END_PREFIX) {
        return parse_position(rest, "end_pos", line).map(|p| Some(MetricLine::EndPos(p)));
    }

    Ok(None)
}

/// Parse the full stdout of one run.
///
/// Line order does not matter. If a prefix repeats, the last well-formed
/// occurrence wins; a malformed repeat leaves an earlier value in place.
pub fn parse_output(output: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();

    for line in output.lines() {
        match parse_line(line) {
            Ok(Some(metric)) => apply(&mut parsed.result, metric),
            Ok(None) => {}
            Err(e) => parsed.errors.push(e),
        }
    }

    parsed
}

fn apply(result: &mut RunResult, metric: MetricLine) {
    match metric {
        MetricLine::EncryptionTime(v) => result.encryption_time = Some(v),
        MetricLine::HomomorphicTime(v) => result.homomorphic_time = Some(v),
        MetricLine::DecryptionTime(v) => result.decryption_time = Some(v),
        MetricLine::Score(v) => result.score = Some(v),
        MetricLine::StartPos(p) => result.start_pos = Some(p),
        MetricLine::EndPos(p) => result.end_pos = Some(p),
    }
}

// "0.52s" -> 0.52; the unit suffix is optional
fn parse_seconds(rest: &str, field: &'static str, line: &str) -> Result<f64> {
    let value = rest.trim();
    let value = value.strip_suffix('s').unwrap_or(value).trim_end();
    value.parse::<f64>().map_err(|_| field_error(field, line))
}

fn parse_position(rest: &str, field: &'static str, line: &str) -> Result<Position> {
    let mut parts = rest.split_whitespace().map(str::parse::<i64>);
    match (parts.next(), parts.next()) {
        (Some(Ok(row)), Some(Ok(col))) => Ok(Position { row, col }),
        _ => Err(field_error(field, line)),
    }
}

fn field_error(field: &'static str, line: &str) -> HarnessError {
    HarnessError::ParseField { field, line: line.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_OUTPUT: &str = "\
Encryption time: 0.50s
Homomorphic computation time: 1.20s
Decryption time: 0.30s
Score: 7
Starting pos: 0 0
Ending pos: 4 4
";

    #[test]
    fn parses_all_six_fields() {
        let parsed = parse_output(FULL_OUTPUT);
        assert!(parsed.errors.is_empty());
        let r = parsed.result;
        assert_eq!(r.encryption_time, Some(0.50));
        assert_eq!(r.homomorphic_time, Some(1.20));
        assert_eq!(r.decryption_time, Some(0.30));
        assert_eq!(r.score, Some(7));
        assert_eq!(r.start_pos, Some(Position { row: 0, col: 0 }));
        assert_eq!(r.end_pos, Some(Position { row: 4, col: 4 }));
        assert_eq!(r.mem_avg_mb, None);
        assert_eq!(r.mem_max_mb, None);
    }

    #[test]
    fn order_and_noise_do_not_matter() {
        let shuffled = "\
Loading keys...
  Ending pos: 4 4
Score: 7
bootstrapping 12 gates
Decryption time: 0.30s
Starting pos: 0 0
Homomorphic computation time: 1.20s
Encryption time: 0.50s
done
";
        let parsed = parse_output(shuffled);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.result, parse_output(FULL_OUTPUT).result);
    }

    #[test]
    fn missing_lines_leave_only_those_fields_empty() {
        let parsed = parse_output("Encryption time: 0.5s\nScore: -3\n");
        let r = parsed.result;
        assert_eq!(r.encryption_time, Some(0.5));
        assert_eq!(r.score, Some(-3));
        assert_eq!(r.homomorphic_time, None);
        assert_eq!(r.decryption_time, None);
        assert_eq!(r.start_pos, None);
        assert_eq!(r.end_pos, None);
    }

    #[test]
    fn malformed_field_is_reported_and_others_survive() {
        let parsed = parse_output("Score: seven\nStarting pos: 3\nDecryption time: 0.1s\n");
        assert_eq!(parsed.result.score, None);
        assert_eq!(parsed.result.start_pos, None);
        assert_eq!(parsed.result.decryption_time, Some(0.1));

        let fields: Vec<&str> = parsed
            .errors
            .iter()
            .map(|e| match e {
                HarnessError::ParseField { field, .. } => *field,
                other => panic!("unexpected error {other:?}"),
            })
            .collect();
        assert_eq!(fields, vec!["score", "start_pos"]);
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        assert_eq!(parse_line("score: 7").unwrap(), None);
        assert_eq!(parse_line("Score 7").unwrap(), None);
        assert_eq!(parse_line("Score: 7").unwrap(), Some(MetricLine::Score(7)));
    }

    #[test]
    fn unit_suffix_is_optional() {
        assert_eq!(parse_line("Encryption time: 2").unwrap(), Some(MetricLine::EncryptionTime(2.0)));
        assert_eq!(parse_line("Encryption time: 2.5 s").unwrap(), Some(MetricLine::EncryptionTime(2.5)));
        assert!(parse_line("Encryption time: s").is_err());
    }

    #[test]
    fn last_good_occurrence_wins() {
        let parsed = parse_output("Score: 1\nScore: 2\nScore: oops\n");
        assert_eq!(parsed.result.score, Some(2));
        assert_eq!(parsed.errors.len(), 1);
    }

    #[test]
    fn position_display_matches_tuple_form() {
        assert_eq!(Position { row: 12, col: -1 }.to_string(), "(12, -1)");
    }
}
