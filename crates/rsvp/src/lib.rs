//! # Reactrack RSVP
//!
//! Sign-up sheets driven by reactions: users react with the sign-up marker
//! to join, and the sheet lists them in the order they reacted.
//!
//! Lines of the body that start with an emoji or a custom marker make that
//! marker "special": reacting with it adds it next to your name.

mod commands;
mod config;
mod error;
mod handler;
mod parse;
mod sheet;

pub use commands::{Rsvp, CONSUMER_ID};
pub use config::RsvpConfig;
pub use error::{Result, RsvpError};
pub use handler::RsvpHandler;
pub use parse::special_markers;
pub use sheet::{format_expiry, render_sheet, signups, RsvpPost, Signup};
