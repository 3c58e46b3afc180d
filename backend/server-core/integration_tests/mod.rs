// Integration tests for the local server over real Unix domain sockets.
// Named pipes are covered by the same code paths through `transport`.
#![cfg(unix)]

mod broadcast;
mod commands;
mod helpers;
mod lifecycle;
