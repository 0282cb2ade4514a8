// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.

pub mod history;
pub mod instances;
pub mod logs;
pub mod messages;
pub mod webhooks;
