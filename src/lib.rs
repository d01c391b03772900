/*
 * Core of a small folder-based launcher: a strict reader for the user-edited
 * folders file and the filtered directory listings built from it. Front ends
 * (the bundled command line, or a GUI) call into `core` and receive validated
 * data or located errors back.
 */
pub mod app_logic;
pub mod core;
