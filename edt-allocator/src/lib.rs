/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Academic timetable session generation and assignment.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── model       – days, slots, subjects, teachers, rooms, sessions
//! ├── config/     – YAML catalog loading and validation
//! ├── entity      – subject → ordered session requests
//! ├── grid/       – placed sessions + teacher/room/cohort occupancy indices
//! ├── volume/     – VHT / teacher volume / VHM, load table
//! └── scheduler/  – SessionAllocator, issues, allocation report
//! ```

pub mod config;
pub mod entity;
pub mod grid;
pub mod model;
pub mod scheduler;
pub mod volume;
