//! Integration tests: the realtime engine driven by real players, and the
//! HTTP/WebSocket surface served in-process.

mod helpers;
mod listen_along_test;
mod presence_test;
mod ws_test;
