//! Events emitted by the parser and the sink that receives them.

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

use crate::types::{MessageMetadata, serialize_lossy};

/// One parsing event. Byte payloads borrow either the caller's chunk (body
/// data) or the parser's own token buffers; both are only valid for the
/// duration of the [`EventSink::on_event`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    MessageBegin,
    Url(&'a [u8]),
    Status { code: u16, reason: &'a [u8] },
    HeaderField(&'a [u8]),
    HeaderValue(&'a [u8]),
    HeadersComplete(&'a MessageMetadata),
    Body(&'a [u8]),
    MessageComplete,
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageBegin => EventKind::MessageBegin,
            Self::Url(_) => EventKind::Url,
            Self::Status { .. } => EventKind::Status,
            Self::HeaderField(_) => EventKind::HeaderField,
            Self::HeaderValue(_) => EventKind::HeaderValue,
            Self::HeadersComplete(_) => EventKind::HeadersComplete,
            Self::Body(_) => EventKind::Body,
            Self::MessageComplete => EventKind::MessageComplete,
        }
    }

    /// Detach the event from the buffers it borrows.
    pub fn to_owned_event(&self) -> OwnedEvent {
        match *self {
            Self::MessageBegin => OwnedEvent::MessageBegin,
            Self::Url(url) => OwnedEvent::Url(Bytes::copy_from_slice(url)),
            Self::Status { code, reason } => OwnedEvent::Status {
                code,
                reason: Bytes::copy_from_slice(reason),
            },
            Self::HeaderField(f) => OwnedEvent::HeaderField(Bytes::copy_from_slice(f)),
            Self::HeaderValue(v) => OwnedEvent::HeaderValue(Bytes::copy_from_slice(v)),
            Self::HeadersComplete(meta) => OwnedEvent::HeadersComplete(Box::new(meta.clone())),
            Self::Body(data) => OwnedEvent::Body(Bytes::copy_from_slice(data)),
            Self::MessageComplete => OwnedEvent::MessageComplete,
        }
    }
}

/// An [`Event`] that owns its payload, suitable for queueing or
/// serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OwnedEvent {
    MessageBegin,
    Url(#[serde(serialize_with = "serialize_lossy")] Bytes),
    Status {
        code: u16,
        #[serde(serialize_with = "serialize_lossy")]
        reason: Bytes,
    },
    HeaderField(#[serde(serialize_with = "serialize_lossy")] Bytes),
    HeaderValue(#[serde(serialize_with = "serialize_lossy")] Bytes),
    HeadersComplete(Box<MessageMetadata>),
    Body(#[serde(serialize_with = "serialize_lossy")] Bytes),
    MessageComplete,
}

impl OwnedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageBegin => EventKind::MessageBegin,
            Self::Url(_) => EventKind::Url,
            Self::Status { .. } => EventKind::Status,
            Self::HeaderField(_) => EventKind::HeaderField,
            Self::HeaderValue(_) => EventKind::HeaderValue,
            Self::HeadersComplete(_) => EventKind::HeadersComplete,
            Self::Body(_) => EventKind::Body,
            Self::MessageComplete => EventKind::MessageComplete,
        }
    }
}

/// Payload-free event tag, e.g. for subscriber tables keyed by event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MessageBegin,
    Url,
    Status,
    HeaderField,
    HeaderValue,
    HeadersComplete,
    Body,
    MessageComplete,
}

impl EventKind {
    /// Every event, in the order they can occur within one message.
    pub const ALL: [EventKind; 8] = [
        Self::MessageBegin,
        Self::Url,
        Self::Status,
        Self::HeaderField,
        Self::HeaderValue,
        Self::HeadersComplete,
        Self::Body,
        Self::MessageComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageBegin => "message_begin",
            Self::Url => "url",
            Self::Status => "status",
            Self::HeaderField => "header_field",
            Self::HeaderValue => "header_value",
            Self::HeadersComplete => "headers_complete",
            Self::Body => "body",
            Self::MessageComplete => "message_complete",
        }
    }

    /// Look an event up by its name; `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the parser should do after delivering an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    /// Stop right after the byte that produced this event, as if
    /// [`Parser::pause`](crate::Parser::pause) had been called.
    Pause,
}

impl Flow {
    #[inline]
    pub(crate) fn is_pause(self) -> bool {
        self == Flow::Pause
    }
}

/// Receiver of parser events. Owned by the caller and passed to every
/// [`Parser::feed`](crate::Parser::feed) / [`Parser::finish`](crate::Parser::finish).
pub trait EventSink {
    fn on_event(&mut self, event: Event<'_>) -> Flow;
}

/// Discards every event.
impl EventSink for () {
    fn on_event(&mut self, _event: Event<'_>) -> Flow {
        Flow::Continue
    }
}

/// Records every event.
impl EventSink for Vec<OwnedEvent> {
    fn on_event(&mut self, event: Event<'_>) -> Flow {
        self.push(event.to_owned_event());
        Flow::Continue
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_event(&mut self, event: Event<'_>) -> Flow {
        (**self).on_event(event)
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: FnMut(Event<'_>) -> Flow,
{
    fn on_event(&mut self, event: Event<'_>) -> Flow {
        (self.0)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_name("headers"), None);
    }

    #[test]
    fn owned_event_keeps_kind_and_payload() {
        let borrowed = Event::Status {
            code: 404,
            reason: b"Not Found",
        };
        let owned = borrowed.to_owned_event();
        assert_eq!(owned.kind(), EventKind::Status);
        assert_eq!(
            owned,
            OwnedEvent::Status {
                code: 404,
                reason: Bytes::from_static(b"Not Found"),
            }
        );
    }

    #[test]
    fn vec_sink_records_in_order() {
        let mut events: Vec<OwnedEvent> = Vec::new();
        events.on_event(Event::MessageBegin);
        events.on_event(Event::Url(b"/"));
        events.on_event(Event::MessageComplete);
        let kinds: Vec<_> = events.iter().map(OwnedEvent::kind).collect();
        assert_eq!(
            kinds,
            [EventKind::MessageBegin, EventKind::Url, EventKind::MessageComplete]
        );
    }

    #[test]
    fn fn_sink_forwards_flow() {
        let mut seen = 0;
        let mut sink = FnSink(|event: Event<'_>| {
            seen += 1;
            if event.kind() == EventKind::Url {
                Flow::Pause
            } else {
                Flow::Continue
            }
        });
        assert_eq!(sink.on_event(Event::MessageBegin), Flow::Continue);
        assert_eq!(sink.on_event(Event::Url(b"/x")), Flow::Pause);
        drop(sink);
        assert_eq!(seen, 2);
    }

    #[test]
    fn owned_events_serialize_with_tags() {
        let json = serde_json::to_string(&OwnedEvent::Body(Bytes::from_static(b"hi"))).unwrap();
        assert_eq!(json, r#"{"event":"body","data":"hi"}"#);
        let json = serde_json::to_string(&OwnedEvent::MessageComplete).unwrap();
        assert_eq!(json, r#"{"event":"message_complete"}"#);
    }
}
