// transcript.rs
use crate::map::MapView;
use crate::message::{Message, Role};
use colored::*;

/// Formats one message for a plain terminal, without the TUI.
pub fn format_message(message: &Message) -> String {
    let label = match message.role {
        Role::User => message.role.to_string().bright_white().bold(),
        Role::Bot => message.role.to_string().bright_cyan().bold(),
    };
    let time = message
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M")
        .to_string();

    format!(
        "[{}] {}: {}",
        time.bright_black(),
        label,
        message.display_text().trim_end()
    )
}

/// Formats where the map ended up after a query.
pub fn format_map(map: &MapView) -> String {
    match (map.focus(), map.last_request(), map.is_unresolved()) {
        (_, Some(request), true) => format!("{} no coordinates for '{}'", "[MAP]".yellow(), request),
        (Some(place), _, false) => format!(
            "{} {} ({:.2}, {:.2})",
            "[MAP]".green(),
            place.name,
            place.lat,
            place.lon
        ),
        _ => format!("{} no location detected", "[MAP]".bright_black()),
    }
}

/// Prints every message, then the map state.
pub fn print_transcript(messages: &[Message], map: &MapView) {
    for message in messages {
        println!("{}", format_message(message));
    }
    println!("{}", format_map(map));
}
