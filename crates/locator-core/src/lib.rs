//! locator-core — GPS locator reply plugin, no transport.
//!
//! Resolves the device position through a [`geolocation::GeolocationSource`],
//! turns it into a street address with a [`geocoding::ReverseGeocoder`] and
//! answers with a templated text envelope. Every failure along the way folds
//! into the block's error templates, so a conversation turn always gets a reply.

pub mod config;
pub mod error;
pub mod events;
pub mod geocoding;
pub mod geolocation;
pub mod plugin;
pub mod resolver;
pub mod template;
pub mod types;

pub use error::LocateError;
pub use plugin::GpsPlugin;
pub use resolver::LocationReplyResolver;
pub use types::{Block, Context, Coordinate, OutgoingTextEnvelope, ReplyTemplateSet, Settings};
