/*
 *  main.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
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

use anyhow::{Context, anyhow};
use env_logger::Env;
use log::{error, info, warn};
use tokio::sync::mpsc;

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{SignalKind, signal};

use lcdticker::carousel::TickerCarousel;
use lcdticker::config;
use lcdticker::display::{DisplayDriverFactory, DisplaySession};
use lcdticker::forecast;
use lcdticker::handler::{MessageHandler, Request};
use lcdticker::listener;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

const CHANNEL_DEPTH: usize = 32;

#[cfg(unix)]
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}

#[tokio::main] // Requires the `tokio` runtime with `macros` and `rt-multi-thread` features
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;

    let log_level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    info!("{} v{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let display_cfg = cfg.display();
    let glyphs = display_cfg.glyph_set()?;
    let display = DisplayDriverFactory::create_from_config(&display_cfg)
        .context("creating display driver")?;
    let mut session = DisplaySession::new(display);
    session.start(&glyphs).context("starting display")?;

    let carousel = TickerCarousel::new(cfg.tickers())
        .ok_or_else(|| anyhow!("no tickers configured"))?;
    let forecaster = forecast::from_config(cfg.forecast.as_ref());
    let mut handler = MessageHandler::new(session, carousel, forecaster, cfg.ack());

    let (tx, rx) = mpsc::channel::<Request>(CHANNEL_DEPTH);

    // producers
    let mut tasks = Vec::new();
    if let Some(addr) = cfg.listen.as_deref() {
        tasks.push(listener::spawn_tcp_listener(addr, tx.clone()).await
            .with_context(|| format!("listening on {}", addr))?);
    }
    if cfg.stdin() {
        tasks.push(listener::spawn_stdin_reader(tx.clone()));
    }
    #[cfg(feature = "gpio")]
    if let Some(gpio) = cfg.gpio.as_ref() {
        if let Some(task) = lcdticker::input::gpio::spawn_buttons(gpio, tx.clone())
            .context("claiming button pins")?
        {
            tasks.push(task);
        }
    }
    #[cfg(not(feature = "gpio"))]
    if cfg.gpio.is_some() {
        warn!("gpio buttons configured but built without the `gpio` feature");
    }

    // the handler owns the display from here on
    let mut actor = tokio::task::spawn_blocking(move || {
        if let Err(e) = handler.start() {
            error!("Initial render failed: {}", e);
        }
        handler.run(rx);
    });

    tokio::select! {
        _ = signal_handler() => {
            if tx.send(Request::Shutdown).await.is_err() {
                warn!("Display handler already stopped");
            }
            if let Err(e) = (&mut actor).await {
                error!("Display handler panicked: {}", e);
            }
        }
        res = &mut actor => {
            if let Err(e) = res {
                error!("Display handler panicked: {}", e);
            }
        }
    }

    for task in tasks {
        task.abort();
    }
    info!("Shutdown complete.");
    // a blocked stdin read cannot be cancelled and would hold the runtime open
    std::process::exit(0);
}
