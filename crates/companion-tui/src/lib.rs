// Terminal front end for the OpenClaw Companion.

pub mod tui;
