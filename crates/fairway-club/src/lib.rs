// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Club tee-sheet collaborator: the HTTP [`ClubExecutor`].

mod client;
mod parse;

pub use client::ClubExecutor;
