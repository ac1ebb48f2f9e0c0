// Library root
// -----------
// The binary (`main.rs`) parses arguments, builds an `AppContext` and hands
// the chosen command to `commands::execute`.
//
// Module responsibilities:
// - `config`: backend URL and registry location.
// - `registry`: the local JSON list of uploaded image IDs.
// - `api`: HTTP calls to the image backend (JSON, form and multipart).
// - `commands`: one handler per CLI command, returning a `Report` or a
//   `CommandError` instead of printing.
// - `cli`: clap argument definitions and the categorized help.
// - `ui`: spinner and printing of results.
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod registry;
pub mod ui;
