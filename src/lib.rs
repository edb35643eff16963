// Library root
// -----------
// This crate exposes the pieces of the course tool as a library; the
// binary (`main.rs`) wires them together behind the interactive prompts.
//
// Module responsibilities:
// - `api`: the HTTP transport seam and its reqwest-backed implementation.
// - `auth`: the portal login handshake, yielding a session token.
// - `courses`: the course listing call and the `CourseRecord` type.
// - `schedule`: decoding of compact day/time slot codes.
// - `proxy`: proxy list parsing and first-live-proxy selection.
// - `report`: summary totals, the console table and the PDF export.
// - `ui`: console messages, spinners and the prompt abstraction.
// - `app`: the stage-by-stage interactive run.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod courses;
pub mod error;
pub mod proxy;
pub mod report;
pub mod schedule;
pub mod ui;
