use pirc_network::prelude::*;

/// A small mixed batch of events with distinct timestamps, in time order
pub fn sample_events() -> Vec<EventRecord> {
    let server = ServerName::convert("server1").unwrap();
    let channel = ChannelName::convert("#test").unwrap();

    let details = vec![
        EventDetails::ServerConnect,
        EventDetails::Welcome {
            text: "Welcome to the test network".to_string(),
        },
        EventDetails::ChannelJoin {
            target: channel,
            user: "pirc_test_user1!~pirc@localhost".to_string(),
            this_user: true,
        },
        EventDetails::Pubmsg {
            source: "other!~o@example".to_string(),
            target: "#test".to_string(),
            text: "hello".to_string(),
        },
        EventDetails::ChannelLeave {
            target: channel,
            text: "bye".to_string(),
        },
        EventDetails::ServerDisconnect {
            text: "bye".to_string(),
        },
    ];

    details
        .into_iter()
        .enumerate()
        .map(|(i, details)| EventRecord {
            time: 100.0 + i as f64,
            server: Some(server),
            details,
        })
        .collect()
}
