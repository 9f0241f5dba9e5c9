/*
 *  forecast.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Score providers for ticker symbols
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::ForecastConfig;

/// Shown on line 2 when the service does not know the ticker.
pub const NOT_FOUND_TEXT: &str = "Not Found!";

/// Outcome of scoring one ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Forecast {
    /// Score in 0..=100
    Score(f64),
    NotFound,
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Forecast::Score(s) => f.write_str(&format_score(*s)),
            Forecast::NotFound => f.write_str(NOT_FOUND_TEXT),
        }
    }
}

/// Two decimals at most, trailing zeros dropped: 72.0 -> "72", 55.5 -> "55.5".
pub fn format_score(score: f64) -> String {
    let s = format!("{:.2}", score);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("score {0} outside 0..=100")]
    OutOfRange(f64),
    #[error("no forecast provider configured")]
    Unconfigured,
}

/// Gives a score for a ticker, or says it does not know it.
///
/// Called from the display thread; implementations may block.
pub trait ForecastService: Send {
    fn forecast(&mut self, ticker: &str) -> Result<Forecast, ForecastError>;
}

pub type BoxedForecast = Box<dyn ForecastService>;

fn checked(score: f64) -> Result<Forecast, ForecastError> {
    if score.is_finite() && (0.0..=100.0).contains(&score) {
        Ok(Forecast::Score(score))
    } else {
        Err(ForecastError::OutOfRange(score))
    }
}

/// Fixed table of scores; unknown tickers are not found.
#[derive(Debug, Clone, Default)]
pub struct FixtureForecast {
    scores: BTreeMap<String, f64>,
}

impl FixtureForecast {
    pub fn new(scores: BTreeMap<String, f64>) -> Self {
        // keys compared upper case, as tickers arrive
        let scores = scores.into_iter().map(|(k, v)| (k.to_uppercase(), v)).collect();
        Self { scores }
    }
}

impl ForecastService for FixtureForecast {
    fn forecast(&mut self, ticker: &str) -> Result<Forecast, ForecastError> {
        match self.scores.get(&ticker.to_uppercase()) {
            Some(&score) => checked(score),
            None => Ok(Forecast::NotFound),
        }
    }
}

/// Runs an external scorer with the ticker as its last argument.
///
/// A zero exit with a number on stdout is the score; a non-zero exit or
/// anything that does not parse means the ticker was not found.
#[derive(Debug, Clone)]
pub struct CommandForecast {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandForecast {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl ForecastService for CommandForecast {
    fn forecast(&mut self, ticker: &str) -> Result<Forecast, ForecastError> {
        debug!("Running {} for {}", self.program.display(), ticker);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(ticker)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| ForecastError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            info!("{} exited with {} for {}", self.program.display(), output.status, ticker);
            return Ok(Forecast::NotFound);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // first whitespace-separated token; sequence outputs keep their head
        match stdout.split_whitespace().next().map(str::parse::<f64>) {
            Some(Ok(score)) => checked(score),
            _ => {
                warn!("Unusable score output for {}: {:?}", ticker, stdout.trim());
                Ok(Forecast::NotFound)
            }
        }
    }
}

/// Service with nothing behind it; every request is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoForecast;

impl ForecastService for NoForecast {
    fn forecast(&mut self, _ticker: &str) -> Result<Forecast, ForecastError> {
        Err(ForecastError::Unconfigured)
    }
}

/// External program if configured, else the score table.
pub fn from_config(config: Option<&ForecastConfig>) -> BoxedForecast {
    match config {
        Some(ForecastConfig { program: Some(program), args, .. }) => {
            info!("Forecasts from {}", program.display());
            Box::new(CommandForecast::new(program.clone(), args.clone().unwrap_or_default()))
        }
        Some(ForecastConfig { scores: Some(scores), .. }) => {
            info!("Forecasts from a table of {} tickers", scores.len());
            Box::new(FixtureForecast::new(scores.clone()))
        }
        _ => {
            warn!("No forecast provider configured");
            Box::new(NoForecast)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FixtureForecast {
        FixtureForecast::new(BTreeMap::from([
            ("AAPL".to_string(), 72.0),
            ("goog".to_string(), 55.25),
            ("BAD".to_string(), 140.0),
        ]))
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(72.0), "72");
        assert_eq!(format_score(55.5), "55.5");
        assert_eq!(format_score(55.25), "55.25");
        assert_eq!(format_score(33.333), "33.33");
        assert_eq!(format_score(0.0), "0");
        assert_eq!(format_score(100.0), "100");
    }

    #[test]
    fn test_forecast_display() {
        assert_eq!(Forecast::Score(72.0).to_string(), "72");
        assert_eq!(Forecast::NotFound.to_string(), "Not Found!");
    }

    #[test]
    fn test_fixture_lookup() {
        let mut f = table();
        assert_eq!(f.forecast("AAPL").unwrap(), Forecast::Score(72.0));
        assert_eq!(f.forecast("GOOG").unwrap(), Forecast::Score(55.25));
        assert_eq!(f.forecast("ZZZZ").unwrap(), Forecast::NotFound);
        assert!(matches!(f.forecast("BAD"), Err(ForecastError::OutOfRange(_))));
    }

    #[test]
    fn test_no_provider() {
        let mut f = from_config(None);
        assert!(matches!(f.forecast("AAPL"), Err(ForecastError::Unconfigured)));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_score() {
        let mut f = CommandForecast::new(PathBuf::from("/bin/echo"), vec!["42.5".into()]);
        // echo prints "42.5 AAPL"; the first token is the score
        assert_eq!(f.forecast("AAPL").unwrap(), Forecast::Score(42.5));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_non_numeric_is_not_found() {
        let mut f = CommandForecast::new(PathBuf::from("/bin/echo"), vec![]);
        assert_eq!(f.forecast("AAPL").unwrap(), Forecast::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_failure_is_not_found() {
        let mut f = CommandForecast::new(PathBuf::from("/bin/sh"), vec!["-c".into(), "exit 3".into()]);
        assert_eq!(f.forecast("AAPL").unwrap(), Forecast::NotFound);
    }

    #[test]
    fn test_missing_program_is_error() {
        let mut f = CommandForecast::new(PathBuf::from("/nonexistent/scorer"), vec![]);
        assert!(matches!(f.forecast("AAPL"), Err(ForecastError::Spawn { .. })));
    }

    #[test]
    fn test_from_config_prefers_program() {
        let config = ForecastConfig {
            scores: Some(BTreeMap::from([("AAPL".to_string(), 1.0)])),
            program: Some(PathBuf::from("/nonexistent/scorer")),
            args: None,
        };
        let mut f = from_config(Some(&config));
        assert!(f.forecast("AAPL").is_err());
    }
}
