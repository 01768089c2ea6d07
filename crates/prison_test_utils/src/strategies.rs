//! Proptest strategies.
//!
//! Names and clans are drawn from small pools so generated filter lists
//! actually hit generated participants.

use proptest::prelude::*;

use prison_core::filters::FilterLists;
use prison_core::participant::{Participant, ParticipantId};
use prison_core::settings::Settings;
use prison_core::timing::Millis;

use crate::harness::Step;

const NICKS: &[&str] = &["Alice", "Bob", "Carol", "Dave", "Evil", "Frank", "Grace"];
const CLANS: &[&str] = &["", "", "Allies", "Pirates", "Reds"];
const BARE_COMMANDS: &[&str] = &["PING", "999", "900", "451", "452"];
const ID_COMMANDS: &[&str] = &["PART", "SLEEP", "PRISONED"];

/// Numeric participant id.
pub fn arb_participant_id() -> impl Strategy<Value = ParticipantId> {
    (1u32..40).prop_map(|n| ParticipantId::new((100 + n).to_string()))
}

/// Nick from the pool.
pub fn arb_nick() -> impl Strategy<Value = String> {
    proptest::sample::select(NICKS).prop_map(String::from)
}

/// Clan from the pool, often empty.
pub fn arb_clan() -> impl Strategy<Value = String> {
    proptest::sample::select(CLANS).prop_map(String::from)
}

/// Participant with pooled nick and clan.
pub fn arb_participant() -> impl Strategy<Value = Participant> {
    (arb_participant_id(), arb_nick(), arb_clan())
        .prop_map(|(id, nick, clan)| Participant::new(id, nick, clan))
}

fn arb_list(pool: &'static [&'static str]) -> impl Strategy<Value = Vec<String>> {
    proptest::sample::subsequence(pool, 0..=2).prop_map(|names| {
        names
            .into_iter()
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect()
    })
}

/// Four filter lists over the name pools.
pub fn arb_filter_lists() -> impl Strategy<Value = FilterLists> {
    (arb_list(CLANS), arb_list(NICKS), arb_list(CLANS), arb_list(NICKS)).prop_map(
        |(black_clan, black_nick, white_clan, white_nick)| FilterLists {
            black_clan,
            black_nick,
            white_clan,
            white_nick,
        },
    )
}

/// Interval bound text, occasionally garbage.
pub fn arb_interval_text() -> impl Strategy<Value = String> {
    prop_oneof![
        8 => (0u32..4000).prop_map(|n| n.to_string()),
        1 => Just(String::new()),
        1 => "[a-z]{1,4}",
    ]
}

/// Settings with random flags and bounds. Policies that disconnect are left
/// to the caller.
pub fn arb_settings() -> impl Strategy<Value = Settings> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        (arb_interval_text(), arb_interval_text(), arb_interval_text()),
        (arb_interval_text(), arb_interval_text(), arb_interval_text()),
    )
        .prop_map(
            |(prison_all, stand_on_enemy, pm_tm_a, pm_tm_z, attack, defense)| Settings {
                prison_all,
                stand_on_enemy,
                pm_tm_a,
                pm_tm_z,
                user_part: false,
                disconnect_action: false,
                prison_and_off: false,
                attack_min: attack.0,
                attack_max: attack.1,
                attack_plus_minus: attack.2,
                defense_min: defense.0,
                defense_max: defense.1,
                defense_plus_minus: defense.2,
                ..Settings::default()
            },
        )
}

/// One scripted step.
pub fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => arb_participant().prop_map(Step::Join),
        2 => arb_participant_id().prop_map(Step::Part),
        4 => arb_participant_id().prop_map(Step::Enemy),
        1 => Just(Step::Start),
        1 => Just(Step::Stop),
    ]
}

/// Timed script: `(delay before step, step)`.
pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<(Millis, Step)>> {
    proptest::collection::vec((0u64..4000, arb_step()), 1..max_len)
}

/// Inbound text: well-formed protocol lines mixed with noise.
pub fn arb_inbound_line() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(BARE_COMMANDS).prop_map(String::from),
        "[a-z0-9]{0,12}".prop_map(|seed| format!("HAAAPSI {seed}")),
        (1u32..999, "[a-z]{1,5}", "[a-z]{1,5}")
            .prop_map(|(id, a, b)| format!("REGISTER {id} {a} {b}")),
        (arb_nick(), 100u32..140).prop_map(|(nick, id)| format!("JOIN {nick} {id}")),
        (arb_nick(), 100u32..140, arb_clan())
            .prop_map(|(nick, id, clan)| format!("JOIN - {nick} {id} 1 [{clan}]")),
        proptest::collection::vec((arb_nick(), 100u32..140), 0..5).prop_map(|pairs| {
            let body: Vec<String> = pairs.iter().map(|(n, i)| format!("{n} {i}")).collect();
            format!("353 planet :{}", body.join(" "))
        }),
        (proptest::sample::select(ID_COMMANDS), 100u32..140)
            .prop_map(|(command, id)| format!("{command} {id}")),
        (0u32..5, 100u32..140).prop_map(|(kind, id)| format!("ACTION {kind} {id}")),
        "\\PC{0,40}",
    ]
}
