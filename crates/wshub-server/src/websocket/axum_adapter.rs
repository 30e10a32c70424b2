//! [`SocketHandle`] over an axum [`WebSocket`].

use std::sync::Arc;
use std::task::Poll;

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::stream::{self, BoxStream, SplitSink};
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use wshub_core::{AtomicSocketState, InboundFrame, SocketError, SocketHandle, SocketState};

/// Outbound half of an upgraded axum socket.
///
/// Writes go through an async mutex around the sink, so frames on one
/// socket leave in call order. Closing or releasing the handle also ends
/// the paired inbound stream.
pub struct AxumSocketHandle {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    state: AtomicSocketState,
    closed: CancellationToken,
}

impl std::fmt::Debug for AxumSocketHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxumSocketHandle")
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

/// Split an upgraded socket into a handle and its inbound frame stream.
pub fn split(
    socket: WebSocket,
) -> (
    Arc<AxumSocketHandle>,
    BoxStream<'static, Result<InboundFrame, SocketError>>,
) {
    let (sink, stream) = socket.split();
    let state = AtomicSocketState::new(SocketState::Open);
    let closed = CancellationToken::new();

    let frames = inbound_frames(stream, state.clone())
        .take_until(closed.clone().cancelled_owned())
        .boxed();

    let handle = Arc::new(AxumSocketHandle {
        sink: Mutex::new(sink),
        state,
        closed,
    });
    (handle, frames)
}

/// Map raw messages to frames, keeping `state` in step with what the peer
/// did: a close frame starts closing, and a read error or the end of the
/// stream leaves the socket Closed.
fn inbound_frames<S>(
    raw: S,
    state: AtomicSocketState,
) -> impl Stream<Item = Result<InboundFrame, SocketError>> + Send + 'static
where
    S: Stream<Item = Result<Message, axum::Error>> + Send + 'static,
{
    let reader_state = state.clone();
    raw
        .map(move |msg| match msg {
            Ok(msg) => {
                let frame = into_frame(msg);
                if matches!(frame, InboundFrame::Close(_)) {
                    reader_state.begin_close();
                }
                Ok(frame)
            }
            Err(e) => {
                reader_state.set(SocketState::Closed);
                Err(SocketError::Transport(e.to_string()))
            }
        })
        .chain(stream::poll_fn(move |_| {
            state.set(SocketState::Closed);
            Poll::Ready(None)
        }))
}

fn into_frame(msg: Message) -> InboundFrame {
    match msg {
        Message::Text(text) => InboundFrame::Text(text.to_string()),
        Message::Binary(data) => InboundFrame::Binary(data.to_vec()),
        Message::Ping(_) => InboundFrame::Ping,
        Message::Pong(_) => InboundFrame::Pong,
        Message::Close(frame) => InboundFrame::Close(frame.map(|f| f.reason.to_string())),
    }
}

impl AxumSocketHandle {
    fn fail(&self, e: &axum::Error) -> SocketError {
        self.state.set(SocketState::Closed);
        self.closed.cancel();
        SocketError::Transport(e.to_string())
    }
}

#[async_trait]
impl SocketHandle for AxumSocketHandle {
    fn state(&self) -> SocketState {
        self.state.get()
    }

    async fn send_text(&self, text: &str) -> Result<(), SocketError> {
        let state = self.state.get();
        if state != SocketState::Open {
            return Err(SocketError::NotOpen(state));
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| self.fail(&e))
    }

    async fn close(&self, reason: &str) -> Result<(), SocketError> {
        let state = self.state.get();
        if state == SocketState::Closed {
            return Err(SocketError::NotOpen(state));
        }
        self.state.begin_close();
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: reason.to_owned().into(),
        };
        let result = {
            let mut sink = self.sink.lock().await;
            sink.send(Message::Close(Some(frame))).await
        };
        self.state.set(SocketState::Closed);
        self.closed.cancel();
        result.map_err(|e| SocketError::Transport(e.to_string()))
    }

    fn release(&self) {
        self.state.set(SocketState::Closed);
        self.closed.cancel();
    }
}
