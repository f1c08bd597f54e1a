//! Event schema registry and log decoding.
//!
//! Decoding is schema-agnostic: a log is tried against each known schema in
//! a fixed order and the first structural match wins. A log that matches
//! nothing is the normal way other event types on the same contract are
//! filtered out, so it yields `None` rather than an error.

pub mod registry;
pub mod schema;

pub use registry::{schemas, EventRegistry};
pub use schema::{
    encode_log_parts, DecodedEvent, EventArg, EventName, EventParam, EventSchema, NoMatch,
};
