//! Shared protobuf message schema for the R10's request/response/alert
//! bodies (spec.md §4.5/§4.6/§6 — "the protobuf body").
//!
//! The outer framing (length prefix, CRC16, COBS, counter, acknowledgement)
//! lives in `r10-core::frame` and `r10-core::session`. This crate owns only
//! the protobuf-encoded payload carried inside a `B413`/`B313` frame.

include!(concat!(env!("OUT_DIR"), "/r10.rs"));
