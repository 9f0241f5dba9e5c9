/*
 *  carousel.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Cyclic selection over the configured tickers
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

/// Ordered ticker list with a current position that wraps both ways.
#[derive(Debug, Clone)]
pub struct TickerCarousel {
    tickers: Vec<String>,
    index: usize,
}

impl TickerCarousel {
    /// Blank entries are dropped; `None` if nothing remains.
    pub fn new<I, S>(tickers: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tickers: Vec<String> = tickers
            .into_iter()
            .map(|t| t.as_ref().trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        if tickers.is_empty() {
            return None;
        }
        Some(Self { tickers, index: 0 })
    }

    pub fn current(&self) -> &str {
        &self.tickers[self.index]
    }

    pub fn next(&mut self) -> &str {
        self.index = (self.index + 1) % self.tickers.len();
        self.current()
    }

    pub fn previous(&mut self) -> &str {
        self.index = (self.index + self.tickers.len() - 1) % self.tickers.len();
        self.current()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    /// Never true; kept alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }
}
