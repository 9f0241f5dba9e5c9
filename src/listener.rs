/*
 *  listener.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Line-based message transports: TCP and standard input
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

use std::io;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use crate::handler::Request;
use crate::message::Message;

/// Pause after a failed accept before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Decode every line of `reader` onto `tx` until EOF.
///
/// Blank lines are skipped. Returns the number of messages forwarded, or
/// early with that count when the handler has gone away.
pub async fn forward_lines<R>(reader: R, tx: &Sender<Request>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await? {
        let Some(message) = Message::decode(&line) else {
            continue;
        };
        debug!("Received {:?}", message);
        if tx.send(Request::Message(message)).await.is_err() {
            debug!("Handler closed; dropping input");
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}

/// Accept TCP clients on `addr`; each sends newline-terminated tokens.
///
/// The socket is bound before returning so address errors surface here.
pub async fn spawn_tcp_listener(addr: &str, tx: Sender<Request>) -> io::Result<JoinHandle<()>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening for messages on {}", listener.local_addr()?);

    Ok(tokio::spawn(async move {
        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    back_off(&e).await;
                    continue;
                }
            };
            debug!("Client {} connected", peer);
            let tx = tx.clone();
            tokio::spawn(async move {
                match forward_lines(BufReader::new(socket), &tx).await {
                    Ok(n) => debug!("Client {} done after {} messages", peer, n),
                    Err(e) => warn!("Client {}: {e}", peer),
                }
            });
        }
    }))
}

async fn back_off(err: &io::Error) {
    warn!("accept failed: {err}; retrying in {:?}", ACCEPT_BACKOFF);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// Read tokens from standard input until EOF.
pub fn spawn_stdin_reader(tx: Sender<Request>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match forward_lines(BufReader::new(tokio::io::stdin()), &tx).await {
            Ok(n) => info!("Standard input closed after {} messages", n),
            Err(e) => warn!("Standard input: {e}"),
        }
    })
}
