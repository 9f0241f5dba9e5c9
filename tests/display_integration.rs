/*
 *  tests/display_integration.rs
 *
 *  End-to-end tests: handler, session and protocol driver against the
 *  emulated HD44780 controller
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 */

use std::collections::BTreeMap;
use std::time::Duration;

use lcdticker::carousel::TickerCarousel;
use lcdticker::config::{self, Cli, DisplayConfig};
use lcdticker::display::drivers::emulated::EmulatedDriver;
use lcdticker::display::{CharacterDisplay, DisplayDriverFactory, DisplaySession};
use lcdticker::forecast::FixtureForecast;
use lcdticker::handler::{MessageHandler, Request};
use lcdticker::message::Message;
use lcdticker_driver_hd44780::emulated::EmulatedLcd;
use lcdticker_driver_hd44780::GlyphSet;
use tokio::sync::mpsc;

const TICKERS: [&str; 5] = ["AAPL", "GOOG", "META", "TSLA", "MSFT"];

fn padded(text: &str) -> String {
    format!("{:<16}", text)
}

fn emulated_handler(scores: &[(&str, f64)]) -> (MessageHandler, EmulatedLcd) {
    let driver = EmulatedDriver::new(0x27, 2, 16, true).unwrap();
    let panel = driver.panel().clone();
    let mut session = DisplaySession::new(Box::new(driver));
    session.start(&GlyphSet::default()).unwrap();

    let scores: BTreeMap<String, f64> = scores.iter().map(|(t, s)| (t.to_string(), *s)).collect();
    let handler = MessageHandler::new(
        session,
        TickerCarousel::new(TICKERS).unwrap(),
        Box::new(FixtureForecast::new(scores)),
        Duration::ZERO,
    );
    (handler, panel)
}

fn screen(panel: &EmulatedLcd) -> Vec<String> {
    let layout = lcdticker_driver_hd44780::LineLayout::new(2, 16);
    (1..=2).map(|l| panel.line_text(&layout, l)).collect()
}

#[test]
fn test_aapl_scores_72() {
    let (mut handler, panel) = emulated_handler(&[("AAPL", 72.0)]);
    panel.clear_log();
    handler.start().unwrap();

    assert_eq!(screen(&panel), vec![padded("AAPL"), padded("72")]);
    // backlight bit carried on every byte while on
    let writes = panel.port_writes();
    assert!(!writes.is_empty());
    assert!(writes.iter().all(|b| b & 0x08 != 0));
}

#[test]
fn test_unknown_ticker_not_found() {
    let (mut handler, panel) = emulated_handler(&[("AAPL", 72.0)]);
    handler.handle(Message::SetTicker("NVDA".into())).unwrap();
    assert_eq!(screen(&panel), vec![padded("NVDA"), padded("Not Found!")]);
}

#[test]
fn test_carousel_wraps_on_panel() {
    let (mut handler, panel) = emulated_handler(&[("MSFT", 61.25), ("AAPL", 72.0)]);
    handler.handle(Message::Previous).unwrap();
    assert_eq!(screen(&panel), vec![padded("MSFT"), padded("61.25")]);
    handler.handle(Message::Next).unwrap();
    assert_eq!(screen(&panel), vec![padded("AAPL"), padded("72")]);
}

#[test]
fn test_bus_error_mid_byte_recovers_on_next_message() {
    let (mut handler, panel) = emulated_handler(&[("GOOG", 40.0)]);
    // the clear's high nibble is latched, its low nibble never arrives
    panel.fail_after(2);
    assert!(handler.handle(Message::Next).is_err());
    panel.heal();

    handler.handle(Message::StartSelection).unwrap();
    assert_eq!(screen(&panel), vec![padded("GOOG"), padded("40")]);
    handler.handle(Message::Next).unwrap();
    assert_eq!(screen(&panel), vec![padded("META"), padded("Not Found!")]);
}

#[test]
fn test_restart_retried_while_bus_is_down() {
    let (mut handler, panel) = emulated_handler(&[("AAPL", 72.0)]);
    panel.fail_after(0);
    assert!(handler.handle(Message::Next).is_err());
    // restart fails, so the message is not applied
    assert!(handler.handle(Message::Previous).is_err());
    assert_eq!(handler.carousel().current(), "GOOG");
    panel.heal();

    handler.handle(Message::Previous).unwrap();
    assert_eq!(screen(&panel), vec![padded("AAPL"), padded("72")]);
}

#[test]
fn test_handler_channel_and_shutdown() {
    let (handler, panel) = emulated_handler(&[("GOOG", 40.0)]);
    let (tx, rx) = mpsc::channel(8);
    for token in ["next\r\n", "", "select"] {
        if let Some(m) = Message::decode(token) {
            tx.blocking_send(Request::Message(m)).unwrap();
        }
    }
    drop(tx);

    let session = handler.run(rx);
    assert!(!session.backlight());
    assert!(!panel.backlight());
    assert_eq!(screen(&panel), vec![padded(""), padded("")]);
}

#[test]
fn test_extended_escapes_reach_ddram() {
    let mut driver = EmulatedDriver::new(0x27, 2, 16, true).unwrap();
    let panel = driver.panel().clone();
    driver.init().unwrap();
    driver.load_glyphs(&GlyphSet::default()).unwrap();
    driver.clear().unwrap();
    driver.write_extended_line(2, "{0x00}{0XfF}x{0xZZ}").unwrap();

    let mut expected = vec![0x00, 0xFF, b'x'];
    expected.extend_from_slice(b"{0xZZ}");
    assert_eq!(panel.ddram(0x40, expected.len()), expected);
}

#[test]
fn test_four_line_panel_from_config() {
    let config = DisplayConfig {
        emulated: Some(true),
        lines: Some(4),
        columns: Some(20),
        ..Default::default()
    };
    let mut session = DisplaySession::new(DisplayDriverFactory::create_from_config(&config).unwrap());
    session.start(&GlyphSet::default()).unwrap();
    session.show(&["one", "two", "three", "four"]).unwrap();
    assert_eq!(session.capabilities().lines, 4);
    assert!(session.write_line(5, "five").is_err());
}

#[test]
fn test_cli_layers_over_defaults() {
    let cli = Cli {
        emulated: Some(true),
        tickers: Some(vec!["nvda".into(), "amd".into()]),
        ack_ms: Some(0),
        stdin: Some(false),
        ..Default::default()
    };
    let cfg = config::load_with(&cli).unwrap();
    assert!(cfg.display().emulated());
    assert_eq!(cfg.ack(), Duration::ZERO);
    assert!(!cfg.stdin());
    let carousel = TickerCarousel::new(cfg.tickers()).unwrap();
    assert_eq!(carousel.tickers(), ["NVDA", "AMD"]);
}
