// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cfgsync: propagates one configuration document from a controller to a
//! fleet of workers through per-worker relay agents.

pub mod agent;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod net;
pub mod test_support;
pub mod transport;
pub mod worker;
