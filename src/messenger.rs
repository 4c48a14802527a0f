//! Session bridge between a connection and the `GameKeeper`
//!
//! A `Messenger` forwards raw command lines into the keeper's inbound
//! queue and hands out the stream of responses addressed to its session.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{CommandError, SendError};
use crate::message::Response;
use crate::types::SessionId;

/// Buffer size of a session's outbound response queue
const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Messages sent from sessions to the `GameKeeper`
#[derive(Debug)]
pub enum Inbound {
    /// Raw command line from a session
    Message {
        session_id: SessionId,
        text: String,
        reply: mpsc::Sender<Response>,
    },
    /// Line the connection could not turn into text
    Rejected {
        session_id: SessionId,
        error: CommandError,
        reply: mpsc::Sender<Response>,
    },
    /// Session went away
    Disconnect { session_id: SessionId },
}

/// Per-session handle onto the `GameKeeper`
///
/// `disconnect` consumes the messenger, so a session can only leave once.
#[derive(Debug)]
pub struct Messenger {
    session_id: SessionId,
    inbound: mpsc::Sender<Inbound>,
    outbound: mpsc::Sender<Response>,
    responses: Option<mpsc::Receiver<Response>>,
}

impl Messenger {
    pub fn new(session_id: SessionId, inbound: mpsc::Sender<Inbound>) -> Self {
        let (outbound, responses) = mpsc::channel(OUTBOUND_BUFFER_SIZE);
        Self {
            session_id,
            inbound,
            outbound,
            responses: Some(responses),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Queue a command line for the keeper
    ///
    /// Waits while the keeper's queue is full. Lines from one messenger
    /// reach the keeper in the order they were sent.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.inbound
            .send(Inbound::Message {
                session_id: self.session_id,
                text: text.into(),
                reply: self.outbound.clone(),
            })
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Report a line that never made it to text
    ///
    /// Goes through the keeper like any other line, so the error reaches the
    /// client in order with the replies to earlier lines.
    pub async fn reject(&self, error: CommandError) -> Result<(), SendError> {
        self.inbound
            .send(Inbound::Rejected {
                session_id: self.session_id,
                error,
                reply: self.outbound.clone(),
            })
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Take the response stream for this session
    ///
    /// Only the first call returns the stream. It ends once the session has
    /// disconnected and the keeper has dropped every handle to it.
    pub fn read_responses(&mut self) -> Option<Responses> {
        self.responses.take().map(|rx| Responses { rx })
    }

    /// Leave the server
    ///
    /// Tells the keeper to forget this session and drops the messenger's own
    /// handle on the response stream.
    pub async fn disconnect(self) {
        let session_id = self.session_id;
        if self
            .inbound
            .send(Inbound::Disconnect { session_id })
            .await
            .is_err()
        {
            debug!("Keeper closed before disconnect of {}", session_id);
        }
    }
}

/// Responses addressed to one session
#[derive(Debug)]
pub struct Responses {
    rx: mpsc::Receiver<Response>,
}

impl Stream for Responses {
    type Item = Response;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_send_message_preserves_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let messenger = Messenger::new(SessionId::new(), tx);

        messenger.send_message("JOINSERVER alice").await.unwrap();
        messenger.send_message("JOINGAME arena").await.unwrap();

        for expected in ["JOINSERVER alice", "JOINGAME arena"] {
            match rx.recv().await {
                Some(Inbound::Message {
                    session_id, text, ..
                }) => {
                    assert_eq!(session_id, messenger.session_id());
                    assert_eq!(text, expected);
                }
                other => panic!("Unexpected inbound: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_reply_reaches_response_stream() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut messenger = Messenger::new(SessionId::new(), tx);
        let mut responses = messenger.read_responses().unwrap();

        messenger.send_message("SHOOT 1 1").await.unwrap();
        let Some(Inbound::Message { reply, .. }) = rx.recv().await else {
            panic!("Expected a message");
        };
        reply.send(Response::Finish { won: true }).await.unwrap();

        assert_eq!(responses.next().await, Some(Response::Finish { won: true }));
    }

    #[tokio::test]
    async fn test_read_responses_only_once() {
        let (tx, _rx) = mpsc::channel(16);
        let mut messenger = Messenger::new(SessionId::new(), tx);

        assert!(messenger.read_responses().is_some());
        assert!(messenger.read_responses().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_ends_response_stream() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut messenger = Messenger::new(SessionId::new(), tx);
        let session_id = messenger.session_id();
        let mut responses = messenger.read_responses().unwrap();

        messenger.disconnect().await;

        match rx.recv().await {
            Some(Inbound::Disconnect { session_id: id }) => assert_eq!(id, session_id),
            other => panic!("Unexpected inbound: {:?}", other),
        }
        assert_eq!(responses.next().await, None);
    }

    #[tokio::test]
    async fn test_reject_queued_after_earlier_lines() {
        let (tx, mut rx) = mpsc::channel(16);
        let messenger = Messenger::new(SessionId::new(), tx);

        messenger.send_message("JOINSERVER alice").await.unwrap();
        messenger.reject(CommandError::LineTooLong(1024)).await.unwrap();

        assert!(matches!(rx.recv().await, Some(Inbound::Message { .. })));
        match rx.recv().await {
            Some(Inbound::Rejected { error, .. }) => {
                assert_eq!(error, CommandError::LineTooLong(1024))
            }
            other => panic!("Unexpected inbound: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_after_keeper_stopped() {
        let (tx, rx) = mpsc::channel(16);
        let messenger = Messenger::new(SessionId::new(), tx);
        drop(rx);

        assert!(messenger.send_message("JOINSERVER alice").await.is_err());
    }
}
