//! Property tests for the inbound grammar and the client state machine.

use prison_client::client::Link;
use prison_client::protocol::{Inbound, Outbound};
use prison_client::ProtocolClient;
use prison_core::event::SessionEvent;
use prison_test_utils::proptest::prelude::*;
use prison_test_utils::strategies::arb_inbound_line;

fn authenticated() -> ProtocolClient {
    let mut client = ProtocolClient::default();
    client.connect("123456");
    client.transport_opened();
    client.receive("HAAAPSI abc\r\nREGISTER 42 guest x\r\n999\r\n");
    client.drain_outbound();
    client.drain_events();
    client
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn parse_is_total_and_stable(line in arb_inbound_line()) {
        let first = Inbound::parse(&line);
        prop_assert_eq!(first, Inbound::parse(&line));
    }

    #[test]
    fn never_reports_self_as_participant(
        lines in proptest::collection::vec(arb_inbound_line(), 0..30),
    ) {
        let mut client = authenticated();
        for line in &lines {
            client.receive(&format!("{line}\r\n"));
        }
        for event in client.drain_events() {
            match event {
                SessionEvent::UserJoin(participant) => {
                    prop_assert_ne!(participant.id.as_str(), "42");
                }
                SessionEvent::EnemyAction(id) => prop_assert_ne!(id.as_str(), "42"),
                _ => {}
            }
        }
    }

    #[test]
    fn chunking_does_not_change_events(
        lines in proptest::collection::vec(arb_inbound_line(), 1..20),
        split in any::<prop::sample::Index>(),
    ) {
        let text: String = lines.iter().map(|l| format!("{l}\r\n")).collect();
        let mut whole = authenticated();
        whole.receive(&text);

        // Split on a line boundary.
        let boundaries: Vec<usize> = text.match_indices('\n').map(|(i, _)| i + 1).collect();
        let at = boundaries[split.index(boundaries.len())];
        let mut chunked = authenticated();
        chunked.receive(&text[..at]);
        chunked.receive(&text[at..]);

        prop_assert_eq!(whole.drain_events(), chunked.drain_events());
        prop_assert_eq!(whole.drain_outbound(), chunked.drain_outbound());
    }
}

#[test]
fn fatal_code_drops_link_and_ignores_the_rest() {
    let mut client = authenticated();
    client.receive("452\r\nJOIN Bob 7\r\n");
    assert_eq!(client.link(), Link::Closed);
    assert!(client.take_close_request());
    assert_eq!(client.drain_outbound(), vec![Outbound::Quit]);
    assert!(!client
        .drain_events()
        .iter()
        .any(|e| matches!(e, SessionEvent::UserJoin(_))));
}
