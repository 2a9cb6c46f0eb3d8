//! Length-prefixed JSON-RPC over byte streams.
//!
//! This crate provides the pieces needed to talk JSON-RPC 2.0 over a pair of
//! pipes framed with `Content-Length` headers:
//! * [`FrameDecoder`] / [`encode_frame`]: incremental frame reassembly and encoding
//! * [`Message`]: classification of decoded JSON into requests, responses and notifications
//! * [`Router`]: method-name dispatch for inbound requests and notifications
//! * [`MainLoop`]: a tokio-driven pump that owns the stream pair
//! * [`PeerSocket`]: a cloneable handle for sending requests and notifications through the loop

#![warn(missing_docs)]

mod codec;
mod error;
mod mainloop;
mod message;
mod router;
mod socket;
mod types;


pub use codec::{DEFAULT_BUFFER_SIZE, FrameDecoder, encode_frame, write_frame};
pub use error::{Error, Result};
pub use mainloop::MainLoop;
pub use message::Message;
pub use router::Router;
pub use serde_json::Value as JsonValue;
pub use socket::{MainLoopEvent, PeerSocket};
pub use types::{AnyNotification, AnyRequest, AnyResponse, ErrorCode, RequestId, ResponseError};
