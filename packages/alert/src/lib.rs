#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geofence alerts: summarizing violations into a message and delivering
//! it to recipients.

pub mod notify;
pub mod summary;

pub use notify::{Notifier, NotifyError, TextbeltNotifier, notify_all};
pub use summary::{SummarizeError, summarize};
