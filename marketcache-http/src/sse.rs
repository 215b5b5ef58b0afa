//! Encodes stream frames as server-sent events: `data: <json>\n\n` for data
//! and error frames, `: keep-alive\n\n` comments for keep-alives (§6).
//!
//! Each SSE stream holds onto whatever keeps its backing push loop alive
//! (a `watch::Sender` for payload streams) for as long as the stream
//! itself lives — when the transport disconnects, axum drops the stream,
//! which drops that guard, which is what tells the loop to stop (§4.8).

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use futures_util::stream::{Stream, StreamExt};
use marketcache_stream::StreamFrame;
use serde_json::json;
use tokio::sync::mpsc;

use crate::quote_stream::QuoteFrame;

pub fn payload_events<G: Send + 'static>(
    rx: mpsc::Receiver<StreamFrame>,
    guard: G,
) -> impl Stream<Item = Event> {
    futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv().await.map(|frame| (payload_frame_to_event(frame), (rx, guard)))
    })
}

pub fn quote_events(rx: mpsc::Receiver<QuoteFrame>) -> impl Stream<Item = Event> {
    futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|frame| (quote_frame_to_event(frame), rx))
    })
}

pub fn to_sse<S>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = Event> + Send + 'static,
{
    Sse::new(stream.map(Ok))
}

fn payload_frame_to_event(frame: StreamFrame) -> Event {
    match frame {
        StreamFrame::Data(delta) => {
            Event::default().data(serde_json::to_string(&delta).unwrap_or_else(|_| "{}".into()))
        }
        StreamFrame::Error { symbol, timeframe, ext, message } => Event::default().data(
            json!({ "error": message, "symbol": symbol, "timeframe": timeframe, "ext": ext })
                .to_string(),
        ),
        StreamFrame::KeepAlive => Event::default().comment("keep-alive"),
    }
}

fn quote_frame_to_event(frame: QuoteFrame) -> Event {
    match frame {
        QuoteFrame::Data(result) => Event::default().data(
            json!({ "quotes": result.quotes, "stale": result.stale }).to_string(),
        ),
        QuoteFrame::KeepAlive => Event::default().comment("keep-alive"),
    }
}
