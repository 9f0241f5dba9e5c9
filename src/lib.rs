/*
 *  lib.rs
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

//! Ticker forecasts on an HD44780 panel behind a PCF8574 I2C backpack.
//!
//! Messages arrive over TCP, standard input or push buttons, are decoded
//! into [`message::Message`] and applied one at a time by the
//! [`handler::MessageHandler`], the only owner of the display.

pub mod config;
pub mod display;
pub mod message;
pub mod carousel;
pub mod forecast;
pub mod handler;
pub mod listener;
pub mod input;
