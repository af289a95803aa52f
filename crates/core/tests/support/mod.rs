//! Shared test helpers for `actionarc-core` integration tests.
//!
//! In-memory implementations of the ports so agent tests can focus on
//! behaviour instead of HTTP plumbing.

#![allow(dead_code)]

pub mod calendar;
pub mod email;
pub mod music;

use std::sync::Arc;

use actionarc_core::Clock;
use chrono::{DateTime, TimeZone, Utc};

/// Fixed clock at the given UTC instant.
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}
