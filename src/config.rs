/*
 *  config.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration layered under command line overrides
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use lcdticker_driver_hd44780::address::DEFAULT_ADDRESS;
use lcdticker_driver_hd44780::{Glyph, GlyphSet, LineLayout};

/// Tickers cycled by next/prev when none are configured.
pub const DEFAULT_TICKERS: [&str; 5] = ["AAPL", "GOOG", "META", "TSLA", "MSFT"];

/// How long "Message Received" stays up before the forecast.
pub const DEFAULT_ACK_MS: u64 = 3000;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub display: Option<DisplayConfig>,
    /// next/prev carousel, in order
    pub tickers: Option<Vec<String>>,
    /// TCP address for the line-based message listener, e.g. "0.0.0.0:5005"
    pub listen: Option<String>,
    /// read messages from standard input as well
    pub stdin: Option<bool>,
    pub ack_ms: Option<u64>,
    pub forecast: Option<ForecastConfig>,
    pub gpio: Option<GpioConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    /// explicit device address, skips probing
    pub address: Option<u8>,
    /// used when probing finds nothing
    pub default_address: Option<u8>,
    /// I2C bus number; derived from the board revision when absent
    pub bus: Option<u8>,
    /// board revision override (1 selects bus 0)
    pub revision: Option<u32>,
    pub lines: Option<u8>,
    pub columns: Option<u8>,
    pub backlight: Option<bool>,
    /// software panel instead of /dev/i2c-N
    pub emulated: Option<bool>,
    /// scan the bus with i2cdetect when no explicit address is set
    pub probe: Option<bool>,
    pub probe_timeout_ms: Option<u64>,
    /// up to eight glyphs of eight "01010" rows each
    pub glyphs: Option<Vec<Vec<String>>>,
}

impl DisplayConfig {
    pub fn lines(&self) -> u8 {
        self.lines.unwrap_or(2)
    }

    pub fn columns(&self) -> u8 {
        self.columns.unwrap_or(16)
    }

    pub fn backlight(&self) -> bool {
        self.backlight.unwrap_or(true)
    }

    pub fn emulated(&self) -> bool {
        self.emulated.unwrap_or(false)
    }

    pub fn probe(&self) -> bool {
        self.probe.unwrap_or(true)
    }

    pub fn default_address(&self) -> u8 {
        self.default_address.unwrap_or(DEFAULT_ADDRESS)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.unwrap_or(2000))
    }

    /// Configured glyphs over the default outline set.
    pub fn glyph_set(&self) -> Result<GlyphSet, ConfigError> {
        let Some(patterns) = self.glyphs.as_ref() else {
            return Ok(GlyphSet::default());
        };
        let glyphs = patterns
            .iter()
            .map(|rows| Glyph::parse(rows.as_slice()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::Validation(format!("display glyphs: {}", e)))?;
        GlyphSet::from_glyphs(&glyphs)
            .map_err(|e| ConfigError::Validation(format!("display glyphs: {}", e)))
    }
}

/// Where scores come from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ForecastConfig {
    /// fixed ticker -> score table
    pub scores: Option<BTreeMap<String, f64>>,
    /// external scorer, run as `program args... TICKER`
    pub program: Option<PathBuf>,
    pub args: Option<Vec<String>>,
}

/// BCM pin numbers of the three push buttons.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GpioConfig {
    pub previous: Option<u8>,
    pub select: Option<u8>,
    pub next: Option<u8>,
    pub poll_ms: Option<u64>,
}

impl Config {
    pub fn display(&self) -> DisplayConfig {
        self.display.clone().unwrap_or_default()
    }

    pub fn tickers(&self) -> Vec<String> {
        self.tickers
            .clone()
            .unwrap_or_else(|| DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect())
    }

    pub fn ack(&self) -> Duration {
        Duration::from_millis(self.ack_ms.unwrap_or(DEFAULT_ACK_MS))
    }

    pub fn stdin(&self) -> bool {
        self.stdin.unwrap_or(true)
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "lcdticker", version, about = "Stock ticker forecasts on a character LCD")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    /// Display I2C address, e.g. 0x27
    #[arg(long, value_parser = parse_address)]
    pub address: Option<u8>,
    #[arg(long)]
    pub bus: Option<u8>,
    #[arg(long)]
    pub lines: Option<u8>,
    #[arg(long)]
    pub columns: Option<u8>,
    #[arg(long, action = ArgAction::Set)]
    pub backlight: Option<bool>,
    #[arg(long, action = ArgAction::Set)]
    pub emulated: Option<bool>,
    /// Comma separated carousel, e.g. AAPL,GOOG
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,
    #[arg(long)]
    pub listen: Option<String>,
    #[arg(long, action = ArgAction::Set)]
    pub stdin: Option<bool>,
    #[arg(long)]
    pub ack_ms: Option<u64>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Accepts `0x27`, `0X27` or plain decimal.
pub fn parse_address(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layer defaults, YAML and `cli`, then validate.
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lcdticker/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lcdticker/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lcdticker.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lcdticker.yaml", "config.yaml", "config/lcdticker.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    if src.tickers.is_some()   { dst.tickers = src.tickers; }
    if src.listen.is_some()    { dst.listen = src.listen; }
    if src.stdin.is_some()     { dst.stdin = src.stdin; }
    if src.ack_ms.is_some()    { dst.ack_ms = src.ack_ms; }
    if src.forecast.is_some()  { dst.forecast = src.forecast; }
    if src.gpio.is_some()      { dst.gpio = src.gpio; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.address.is_some()          { dst.address = src.address; }
    if src.default_address.is_some()  { dst.default_address = src.default_address; }
    if src.bus.is_some()              { dst.bus = src.bus; }
    if src.revision.is_some()         { dst.revision = src.revision; }
    if src.lines.is_some()            { dst.lines = src.lines; }
    if src.columns.is_some()          { dst.columns = src.columns; }
    if src.backlight.is_some()        { dst.backlight = src.backlight; }
    if src.emulated.is_some()         { dst.emulated = src.emulated; }
    if src.probe.is_some()            { dst.probe = src.probe; }
    if src.probe_timeout_ms.is_some() { dst.probe_timeout_ms = src.probe_timeout_ms; }
    if src.glyphs.is_some()           { dst.glyphs = src.glyphs; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.debug               { cfg.log_level = Some("debug".to_string()); }
    if cli.tickers.is_some()   { cfg.tickers = cli.tickers.clone(); }
    if cli.listen.is_some()    { cfg.listen = cli.listen.clone(); }
    if cli.stdin.is_some()     { cfg.stdin = cli.stdin; }
    if cli.ack_ms.is_some()    { cfg.ack_ms = cli.ack_ms; }

    let any_display = cli.address.is_some()
        || cli.bus.is_some()
        || cli.lines.is_some()
        || cli.columns.is_some()
        || cli.backlight.is_some()
        || cli.emulated.is_some();

    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.address.is_some()   { display.address = cli.address; }
        if cli.bus.is_some()       { display.bus = cli.bus; }
        if cli.lines.is_some()     { display.lines = cli.lines; }
        if cli.columns.is_some()   { display.columns = cli.columns; }
        if cli.backlight.is_some() { display.backlight = cli.backlight; }
        if cli.emulated.is_some()  { display.emulated = cli.emulated; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(display) = cfg.display.as_ref() {
        if !(1..=4).contains(&display.lines()) {
            return Err(ConfigError::Validation("display lines must be 1..=4".into()));
        }
        if !(8..=40).contains(&display.columns()) {
            return Err(ConfigError::Validation("display columns must be 8..=40".into()));
        }
        if !LineLayout::new(display.lines(), display.columns()).fits_ddram() {
            return Err(ConfigError::Validation(format!(
                "display {}x{} does not fit DDRAM; panels over 2 lines are at most 20 columns",
                display.columns(),
                display.lines()
            )));
        }
        for (name, addr) in [("address", display.address), ("default_address", display.default_address)] {
            if let Some(a) = addr {
                if a > 0x7F {
                    return Err(ConfigError::Validation(format!(
                        "display {} 0x{:02X} is not a 7-bit I2C address", name, a
                    )));
                }
            }
        }
        display.glyph_set()?;
    }

    if let Some(tickers) = cfg.tickers.as_ref() {
        if tickers.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::Validation("tickers must not be empty".into()));
        }
    }

    if let Some(forecast) = cfg.forecast.as_ref() {
        if let Some(scores) = forecast.scores.as_ref() {
            if let Some((t, s)) = scores.iter().find(|(_, s)| !(0.0..=100.0).contains(*s)) {
                return Err(ConfigError::Validation(format!(
                    "forecast score for {} is {}, must be 0..=100", t, s
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
log_level: debug
tickers: [AAPL, NVDA]
listen: "127.0.0.1:5005"
ack_ms: 500
display:
  address: 0x3F
  lines: 4
  columns: 20
  backlight: false
forecast:
  scores:
    AAPL: 72
    NVDA: 55.5
"#;

    #[test]
    fn test_parse_sample() {
        let cfg = parse_yaml(SAMPLE).unwrap();
        validate(&cfg).unwrap();
        let display = cfg.display();
        assert_eq!(display.address, Some(0x3F));
        assert_eq!(display.lines(), 4);
        assert_eq!(display.columns(), 20);
        assert!(!display.backlight());
        assert_eq!(cfg.tickers(), vec!["AAPL", "NVDA"]);
        assert_eq!(cfg.ack(), Duration::from_millis(500));
        assert_eq!(cfg.forecast.unwrap().scores.unwrap()["AAPL"], 72.0);
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        let display = cfg.display();
        assert_eq!(display.lines(), 2);
        assert_eq!(display.columns(), 16);
        assert_eq!(display.default_address(), 0x27);
        assert!(display.backlight());
        assert!(display.probe());
        assert_eq!(cfg.tickers(), DEFAULT_TICKERS.to_vec());
        assert_eq!(cfg.ack(), Duration::from_millis(DEFAULT_ACK_MS));
        assert!(cfg.stdin());
    }

    #[test]
    fn test_cli_overrides_yaml() {
        let mut cfg = parse_yaml(SAMPLE).unwrap();
        let cli = Cli {
            address: Some(0x27),
            columns: Some(16),
            tickers: Some(vec!["TSLA".into()]),
            debug: true,
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        let display = cfg.display();
        assert_eq!(display.address, Some(0x27));
        assert_eq!(display.columns(), 16);
        assert_eq!(display.lines(), 4);
        assert_eq!(cfg.tickers(), vec!["TSLA"]);
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut cfg = parse_yaml(SAMPLE).unwrap();
        let overlay = parse_yaml("display:\n  lines: 2\n").unwrap();
        merge(&mut cfg, overlay);
        let display = cfg.display();
        assert_eq!(display.lines(), 2);
        assert_eq!(display.address, Some(0x3F));
        assert_eq!(display.columns(), 20);
    }

    #[test]
    fn test_validation_rejects_bad_geometry() {
        let cfg = parse_yaml("display:\n  lines: 5\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
        let cfg = parse_yaml("display:\n  columns: 41\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
        let cfg = parse_yaml("display:\n  lines: 4\n  columns: 24\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
        let cfg = parse_yaml("display:\n  lines: 2\n  columns: 24\n").unwrap();
        validate(&cfg).unwrap();
    }

    #[test]
    fn test_validation_rejects_wide_address() {
        let cfg = parse_yaml("display:\n  address: 0x80\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_empty_tickers() {
        let cfg = parse_yaml("tickers: []\n").unwrap();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_glyphs_from_yaml() {
        let yaml = r#"
display:
  glyphs:
    - ["00000", "01010", "11111", "11111", "01110", "00100", "00000", "00000"]
"#;
        let cfg = parse_yaml(yaml).unwrap();
        validate(&cfg).unwrap();
        let set = cfg.display().glyph_set().unwrap();
        assert_eq!(set.get(0).unwrap().rows()[2], 0x1F);
        assert_eq!(set.get(1), Some(&Glyph::outline()));
    }

    #[test]
    fn test_bad_glyph_rejected() {
        let cfg = parse_yaml("display:\n  glyphs:\n    - [\"0000\"]\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x27"), Ok(0x27));
        assert_eq!(parse_address("0X3f"), Ok(0x3F));
        assert_eq!(parse_address("39"), Ok(39));
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/lcdticker.yaml")),
            ..Default::default()
        };
        assert!(matches!(load_with(&cli), Err(ConfigError::Validation(_))));
    }
}
