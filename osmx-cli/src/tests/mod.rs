//! Shared test harness modules for the osmx CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod convert_unit;
mod dupes_unit;
mod extract_unit;
mod helpers;
