//! # Letterbox Core
//!
//! Core library for the Letterbox newsletter client.
//!
//! This crate provides:
//! - The weekly schedule codec, mapping a local weekday/hour selection to a
//!   UTC-anchored `cron(0 H ? * D *)` token and back
//! - An in-memory credential store
//! - A single-flight refresh coordinator for authenticated operations
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use letterbox_core::schedule::{FixedClock, FixedTimezone, ScheduleCodec};
//! use letterbox_core::{Period, Weekday};
//!
//! let codec = ScheduleCodec::new(
//!     FixedClock(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()),
//!     FixedTimezone::parse("Asia/Tokyo").unwrap(),
//! );
//!
//! let token = codec.encode("SUN", 1, Period::Am).unwrap();
//! assert_eq!(token.as_str(), "cron(0 16 ? * 7 *)");
//!
//! let decoded = codec.decode(token.as_str()).unwrap();
//! assert_eq!(decoded.weekday, Weekday::Sun);
//! ```

pub mod error;
pub mod model;
pub mod refresh;
pub mod schedule;
pub mod store;
pub mod token;

// Re-export commonly used types at crate root
pub use model::{
    Period,
    ScheduleSelection,
    ScheduleToken,
    Weekday,
};

pub use schedule::{
    DecodedSchedule,
    ScheduleCodec,
    ScheduleError,
};

pub use store::{
    CredentialStore,
    MemoryCredentialStore,
    Secret,
};

pub use token::{
    Credential,
    RefreshError,
    Refresher,
};

pub use refresh::{
    AuthFailure,
    RefreshCoordinator,
    DEFAULT_REFRESH_INTERVAL,
};

pub use error::LetterboxError;
