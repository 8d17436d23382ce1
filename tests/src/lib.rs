//! # PriceNet Test Suite
//!
//! Unified test crate for cross-subsystem flows.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Cross-subsystem choreography
//!     ├── end_to_end.rs       # mine → commit → grade → seed next height
//!     └── grading_consensus.rs # independent nodes agree on reward sets
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pricenet-tests
//!
//! # By category
//! cargo test -p pricenet-tests integration::
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
