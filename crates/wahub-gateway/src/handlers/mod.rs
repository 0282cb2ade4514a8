// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the control API.

pub mod instances;
pub mod messages;
pub mod plugins;
pub mod webhooks;
