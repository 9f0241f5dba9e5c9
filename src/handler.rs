/*
 *  handler.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Single owner of the display; applies messages in arrival order
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

use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::Receiver;

use crate::carousel::TickerCarousel;
use crate::display::{DisplayError, DisplaySession};
use crate::forecast::BoxedForecast;
use crate::message::Message;

/// What producers put on the handler's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Message(Message),
    Shutdown,
}

impl From<Message> for Request {
    fn from(m: Message) -> Self {
        Request::Message(m)
    }
}

pub struct MessageHandler {
    session: DisplaySession,
    carousel: TickerCarousel,
    forecast: BoxedForecast,
    ack: Duration,
    /// set after a bus error; the panel is re-initialized before the next render
    reinit: bool,
}

impl MessageHandler {
    pub fn new(
        session: DisplaySession,
        carousel: TickerCarousel,
        forecast: BoxedForecast,
        ack: Duration,
    ) -> Self {
        Self { session, carousel, forecast, ack, reinit: false }
    }

    pub fn carousel(&self) -> &TickerCarousel {
        &self.carousel
    }

    /// Show the first ticker of the carousel.
    pub fn start(&mut self) -> Result<(), DisplayError> {
        let ticker = self.carousel.current().to_string();
        self.render(&ticker)
    }

    /// Apply one message.
    ///
    /// After a bus or initialization error the panel is restarted before the
    /// next message is shown; the restart is retried until it succeeds.
    pub fn handle(&mut self, message: Message) -> Result<(), DisplayError> {
        if self.reinit {
            self.session.restart()?;
            self.reinit = false;
        }
        let result = self.apply(message);
        if let Err(e) = &result {
            if e.needs_reinit() {
                warn!("Display will be re-initialized after: {}", e);
                self.reinit = true;
            }
        }
        result
    }

    fn apply(&mut self, message: Message) -> Result<(), DisplayError> {
        debug!("Handling {:?}", message);
        match message {
            Message::Next => {
                let ticker = self.carousel.next().to_string();
                self.render(&ticker)
            }
            Message::Previous => {
                let ticker = self.carousel.previous().to_string();
                self.render(&ticker)
            }
            Message::StartSelection => {
                let ticker = self.carousel.current().to_string();
                self.render(&ticker)
            }
            Message::SetTicker(ticker) => {
                self.session.acknowledge(&ticker)?;
                if !self.ack.is_zero() {
                    thread::sleep(self.ack);
                }
                self.session.clear()?;
                self.render(&ticker)
            }
        }
    }

    /// Forecast `ticker` and put the result on the panel.
    pub fn render(&mut self, ticker: &str) -> Result<(), DisplayError> {
        self.session.show_pending(ticker)?;
        let result = self.forecast.forecast(ticker);
        if let Ok(f) = &result {
            info!("{} -> {}", ticker, f);
        }
        self.session.show_forecast(ticker, &result)
    }

    /// Drain `rx` until it closes or a shutdown arrives, then darken the panel.
    ///
    /// Blocks the calling thread; run it under `spawn_blocking`.
    pub fn run(mut self, mut rx: Receiver<Request>) -> DisplaySession {
        while let Some(request) = rx.blocking_recv() {
            match request {
                Request::Message(message) => {
                    if let Err(e) = self.handle(message) {
                        error!("Display update failed: {}", e);
                    }
                }
                Request::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }
        if let Err(e) = self.session.shutdown() {
            error!("Display shutdown failed: {}", e);
        }
        self.session
    }
}
