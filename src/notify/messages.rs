//! Markdown texts sent to the chat.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

use crate::event::RoomRecord;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn room_url(code: &str) -> String {
    format!("https://gartic.io/{}", code)
}

pub fn startup(target_room: &str) -> String {
    format!(
        "✅ *Gartic monitor started!*\n\n🔍 Looking for room {}...",
        target_room
    )
}

pub fn room_found(code: &str) -> String {
    format!(
        "🎉 *Room {} found!*\n\nStarting continuous monitoring...",
        code
    )
}

pub fn room_inactive(code: &str) -> String {
    format!(
        "🛑 *Room {} is no longer active*\n\nScreenshots paused.",
        code
    )
}

pub fn farewell() -> String {
    "👋 Gartic monitor stopped".to_string()
}

pub fn failure(error: &anyhow::Error) -> String {
    format!("❌ Monitor error:\n```{:#}```", error)
}

/// Caption for screenshot number `sequence`.
pub fn photo_caption<Tz>(room: &RoomRecord, at: &DateTime<Tz>, sequence: u64) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "🎮 *Room {code} is active*\n\n\
         👥 *Players:* {players}\n\
         🕐 *Time:* {time}\n\
         📸 *Screenshot #:* {sequence}\n\n\
         🔗 [Join the room]({url})\n",
        code = room.code,
        players = room.occupancy(),
        time = at.format(TIME_FORMAT),
        sequence = sequence,
        url = room_url(&room.code),
    )
}
