// SPDX-License-Identifier: BUSL-1.1
//! Axum middleware for the wager API.

pub mod metrics;
