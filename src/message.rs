/*
 *  message.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Control messages from the transport and buttons
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

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Next,
    Previous,
    /// forecast the ticker currently selected
    StartSelection,
    SetTicker(String),
}

impl Message {
    /// Decode one transport token.
    ///
    /// Surrounding whitespace (CR/LF included) is dropped; an empty token
    /// yields `None`. Keywords are lower case and matched exactly, anything
    /// else is taken as a ticker symbol and upper-cased.
    pub fn decode(token: &str) -> Option<Message> {
        let token = token.trim();
        match token {
            "" => None,
            "next" => Some(Message::Next),
            "prev" | "previous" => Some(Message::Previous),
            "select" => Some(Message::StartSelection),
            ticker => Some(Message::SetTicker(ticker.to_uppercase())),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Next => f.write_str("next"),
            Message::Previous => f.write_str("prev"),
            Message::StartSelection => f.write_str("select"),
            Message::SetTicker(t) => f.write_str(t),
        }
    }
}
