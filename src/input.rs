/*
 *  input.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Push button input source
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

use std::time::Duration;

use embedded_hal::digital::InputPin;
use log::{debug, warn};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time;

use crate::handler::Request;
use crate::message::Message;

pub const DEFAULT_POLL_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Previous,
    Select,
    Next,
}

impl Button {
    pub fn message(self) -> Message {
        match self {
            Button::Previous => Message::Previous,
            Button::Select => Message::StartSelection,
            Button::Next => Message::Next,
        }
    }
}

struct Watched<P> {
    button: Button,
    pin: P,
    pressed: bool,
}

/// Samples active-low buttons and reports each press once.
pub struct ButtonPoller<P: InputPin> {
    buttons: Vec<Watched<P>>,
}

impl<P: InputPin> Default for ButtonPoller<P> {
    fn default() -> Self {
        Self { buttons: Vec::new() }
    }
}

impl<P: InputPin> ButtonPoller<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, button: Button, pin: P) {
        self.buttons.push(Watched { button, pin, pressed: false });
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// Buttons that went down since the previous call.
    ///
    /// A pin that cannot be read keeps its last state.
    pub fn poll(&mut self) -> Vec<Button> {
        let mut pressed = Vec::new();
        for w in &mut self.buttons {
            let down = match w.pin.is_low() {
                Ok(low) => low,
                Err(e) => {
                    warn!("{:?} button unreadable: {:?}", w.button, e);
                    continue;
                }
            };
            if down && !w.pressed {
                pressed.push(w.button);
            }
            w.pressed = down;
        }
        pressed
    }
}

/// Poll `poller` every `period` and forward presses as messages.
///
/// Ends when the handler side of the channel is dropped.
pub fn spawn_poller<P>(mut poller: ButtonPoller<P>, period: Duration, tx: Sender<Request>) -> JoinHandle<()>
where
    P: InputPin + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            for button in poller.poll() {
                debug!("{:?} pressed", button);
                if tx.send(Request::Message(button.message())).await.is_err() {
                    return;
                }
            }
        }
    })
}

#[cfg(feature = "gpio")]
pub mod gpio {
    //! Raspberry Pi header pins through rppal.

    use std::convert::Infallible;

    use embedded_hal::digital::{ErrorType, InputPin};
    use log::info;
    use rppal::gpio::Gpio;
    use tokio::sync::mpsc::Sender;
    use tokio::task::JoinHandle;

    use super::{spawn_poller, Button, ButtonPoller, DEFAULT_POLL_MS};
    use crate::config::GpioConfig;
    use crate::handler::Request;

    /// Header pin with the internal pull-up enabled.
    pub struct HeaderPin(rppal::gpio::InputPin);

    impl ErrorType for HeaderPin {
        type Error = Infallible;
    }

    impl InputPin for HeaderPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0.is_high())
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0.is_low())
        }
    }

    /// Claim the configured BCM pins and start polling them.
    ///
    /// `Ok(None)` when no button is configured.
    pub fn spawn_buttons(
        config: &GpioConfig,
        tx: Sender<Request>,
    ) -> Result<Option<JoinHandle<()>>, rppal::gpio::Error> {
        let gpio = Gpio::new()?;
        let mut poller = ButtonPoller::new();
        for (button, pin) in [
            (Button::Previous, config.previous),
            (Button::Select, config.select),
            (Button::Next, config.next),
        ] {
            if let Some(pin) = pin {
                info!("{:?} button on BCM {}", button, pin);
                poller.add(button, HeaderPin(gpio.get(pin)?.into_input_pullup()));
            }
        }
        if poller.is_empty() {
            return Ok(None);
        }
        let period = std::time::Duration::from_millis(config.poll_ms.unwrap_or(DEFAULT_POLL_MS));
        Ok(Some(spawn_poller(poller, period, tx)))
    }
}
