//! Console output for client notices.

use cotune_player::Notice;

/// Print a notice as a single human-readable line.
pub fn print_notice(notice: &Notice) {
    match notice {
        Notice::ListenerJoined(who) => print_success(&format!("{who} is listening along")),
        Notice::ListenerLeft(who) => println!("- {who} stopped listening along"),
        Notice::HostDisconnected(host) => print_warning(&format!("{host} has disconnected")),
        Notice::ListenAlongRejected { message, .. } => print_warning(message),
        Notice::DirectMessage(message) => {
            println!("[{}] {}", message.sender_id, message.content)
        }
        Notice::ServerError { code, message } => print_warning(&format!("{code}: {message}")),
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error to stderr
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}
