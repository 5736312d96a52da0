//! Equipment loan tracking over a hosted record/object-storage backend.
//!
//! The interesting parts live in [`dates`] (timezone-safe calendar-date
//! round-tripping for loan dates) and [`evidence`] (upload and display-URL
//! resolution for FI-1557 form photos, public link preferred with a signed
//! fallback). [`loans`] composes them over the [`store`] and [`storage`]
//! collaborators; [`web`] exposes a small read-only JSON API.

pub mod config;
pub mod dates;
pub mod evidence;
pub mod loans;
pub mod model;
pub mod overdue_poller;
pub mod probe;
pub mod reports;
pub mod storage;
pub mod store;
pub mod web;
