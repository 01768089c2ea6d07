//! Test fixtures and helpers.
//!
//! Settings presets and participant builders for consistent testing.

use prison_core::filters::FilterLists;
use prison_core::participant::{Participant, ParticipantId};
use prison_core::settings::Settings;

/// Build a participant.
#[must_use]
pub fn participant(id: &str, nick: &str, clan: &str) -> Participant {
    Participant::new(id, nick, clan)
}

/// Build a participant id.
#[must_use]
pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

/// Default settings with every policy that disconnects switched off, so a
/// test only sees the attack loop.
#[must_use]
pub fn steady_settings() -> Settings {
    Settings {
        user_part: false,
        disconnect_action: false,
        prison_and_off: false,
        ..Settings::default()
    }
}

/// [`steady_settings`] with counter-attacks enabled.
#[must_use]
pub fn defensive_settings() -> Settings {
    Settings {
        stand_on_enemy: true,
        ..steady_settings()
    }
}

/// Filters only: nothing is targeted unless listed.
#[must_use]
pub fn filtered_settings() -> Settings {
    Settings {
        prison_all: false,
        ..steady_settings()
    }
}

/// `black_nick = ["Evil"]`, `white_clan = ["Allies"]`.
#[must_use]
pub fn evil_allies_filters() -> FilterLists {
    FilterLists::from_blocks("", "Evil", "Allies", "")
}
