//! TCP connection handler
//!
//! Drives one client connection: frames the socket into lines, forwards
//! each line through the session's `Messenger`, and writes the session's
//! responses back to the socket.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::{CommandCodec, Line};
use crate::error::{AppError, CommandError};
use crate::messenger::{Messenger, Responses};
use crate::types::SessionId;

/// Longest accepted command line
const MAX_LINE_LENGTH: usize = 1024;

type LineSink = SplitSink<Framed<TcpStream, CommandCodec>, String>;
type LineStream = SplitStream<Framed<TcpStream, CommandCodec>>;

/// Socket timeouts of a connection
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Idle time after which the client is considered gone
    pub read: Duration,
    /// Time allowed for writing one response
    pub write: Duration,
}

/// Why the read loop stopped
#[derive(Debug)]
enum ReadEnd {
    Eof,
    Idle,
    Closed,
    KeeperGone,
    Failed(AppError),
}

/// Handle a new TCP connection
///
/// Returns once the client is gone or `close` is cancelled, after the
/// session has disconnected from the keeper and every queued response
/// has been written.
pub async fn handle_connection(
    stream: TcpStream,
    mut messenger: Messenger,
    close: CancellationToken,
    timeouts: Timeouts,
) -> Result<(), AppError> {
    let session_id = messenger.session_id();
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!("Session {} connected from {}", session_id, peer_addr);

    let Some(responses) = messenger.read_responses() else {
        messenger.disconnect().await;
        return Err(AppError::ChannelSend);
    };

    let framed = Framed::new(stream, CommandCodec::new(MAX_LINE_LENGTH));
    let (sink, mut lines) = framed.split();

    // Spawn write task (Responses -> socket)
    let write_task = tokio::spawn(write_responses(sink, responses, timeouts.write, session_id));

    let end = AssertUnwindSafe(read_commands(&mut lines, &messenger, &close, timeouts.read))
        .catch_unwind()
        .await;
    match end {
        Ok(ReadEnd::Failed(e)) => warn!("Read error for {}: {}", session_id, e),
        Ok(end) => debug!("Read loop for {} ended: {:?}", session_id, end),
        Err(_) => error!("Read loop for {} panicked", session_id),
    }

    // The response stream ends once the keeper has forgotten this session.
    messenger.disconnect().await;
    if let Err(e) = write_task.await {
        error!("Write task for {} failed: {}", session_id, e);
    }

    info!("Session {} disconnected", session_id);
    Ok(())
}

/// Forward lines to the keeper until the client goes away
async fn read_commands(
    lines: &mut LineStream,
    messenger: &Messenger,
    close: &CancellationToken,
    idle: Duration,
) -> ReadEnd {
    loop {
        let line = tokio::select! {
            _ = close.cancelled() => return ReadEnd::Closed,
            next = timeout(idle, lines.next()) => match next {
                Err(_) => return ReadEnd::Idle,
                Ok(None) => return ReadEnd::Eof,
                Ok(Some(Err(e))) => return ReadEnd::Failed(e.into()),
                Ok(Some(Ok(line))) => line,
            },
        };

        let sent = match line {
            Line::Text(text) => messenger.send_message(text.trim()).await,
            Line::TooLong => {
                debug!("Dropped over-long line from {}", messenger.session_id());
                messenger
                    .reject(CommandError::LineTooLong(MAX_LINE_LENGTH))
                    .await
            }
        };
        if sent.is_err() {
            return ReadEnd::KeeperGone;
        }
    }
}

/// Write responses to the socket until the session's stream ends
///
/// A failed or slow write is logged and the next response is still
/// consumed, so the keeper never waits on a dead socket for long.
async fn write_responses(
    mut sink: LineSink,
    mut responses: Responses,
    write_timeout: Duration,
    session_id: SessionId,
) {
    while let Some(resp) = responses.next().await {
        match timeout(write_timeout, sink.send(resp.to_string())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Write to {} failed: {}", session_id, e),
            Err(_) => warn!("Write to {} timed out", session_id),
        }
    }
    debug!("Write task ended for {}", session_id);

    let _ = sink.close().await;
}
