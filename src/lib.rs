//! feedr - a personalized AI news client.
//!
//! Talks to the news backend through a single gateway client that owns
//! session credentials and transparent reauthentication; everything else
//! is data transforms and CLI presentation.

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod news;
pub mod session;
