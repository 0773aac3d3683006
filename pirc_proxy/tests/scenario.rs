mod utils;
use utils::*;

use pirc_network::{event::clock, rpc::fault_code::*};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

async fn connect(coordinator: &mut pirc_proxy::coordinator::ProxyCoordinator, fake: &mut FakeIrcServer, name: &str, nick: &str) {
    let result = call(coordinator, "server_connect", vec![json!(name), json!(nick), json!("127.0.0.1"), json!(fake.port())]).await;
    assert_eq!(result, Ok(json!(true)));
    fake.expect_line(&format!("USER {}", nick)).await;
}

fn events_of<'a>(events: &'a Value, kind: &str) -> Vec<&'a Value> {
    events
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["type"] == kind)
        .collect()
}

#[tokio::test]
async fn connect_join_message_leave_disconnect() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();

    connect(&mut coordinator, &mut fake, "server1", "nick1").await;
    assert_eq!(call(&mut coordinator, "server_list", vec![]).await, Ok(json!(["server1"])));

    assert_eq!(call(&mut coordinator, "channel_join", vec![json!("server1"), json!("#test")]).await, Ok(json!(true)));
    assert_eq!(fake.expect_line("JOIN").await, "JOIN #test");

    assert_eq!(
        call(&mut coordinator, "channel_message", vec![json!("server1"), json!("#test"), json!("hi")]).await,
        Ok(json!(true))
    );
    assert_eq!(fake.expect_line("PRIVMSG").await, "PRIVMSG #test hi");

    settle(&mut coordinator).await;

    let events = call(&mut coordinator, "get_events_since", vec![json!(0)]).await.unwrap();
    assert!(
        in_order(&kinds(&events), &["server_connect", "channel_join", "privmsg"]),
        "unexpected order: {:?}",
        kinds(&events)
    );

    let times: Vec<f64> = events.as_array().unwrap().iter().map(|e| e["time"].as_f64().unwrap()).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));

    let welcome = events_of(&events, "welcome");
    assert_eq!(welcome.len(), 1);
    assert_eq!(welcome[0]["server"], "server1");

    let privmsg = events_of(&events, "privmsg");
    assert_eq!(privmsg[0]["text"], "hi");

    assert_eq!(call(&mut coordinator, "channel_list", vec![json!("server1")]).await, Ok(json!(["#test"])));
    assert_eq!(call(&mut coordinator, "channel_leave", vec![json!("server1"), json!("#test")]).await, Ok(json!(true)));
    assert_eq!(fake.expect_line("PART").await, "PART #test");
    assert_eq!(call(&mut coordinator, "channel_list", vec![json!("server1")]).await, Ok(json!([])));

    assert_eq!(call(&mut coordinator, "server_disconnect", vec![json!("server1")]).await, Ok(json!(true)));
    fake.expect_line("QUIT").await;

    assert_eq!(call(&mut coordinator, "server_list", vec![]).await, Ok(json!([])));
}

#[tokio::test]
async fn own_messages_are_echoed() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();

    connect(&mut coordinator, &mut fake, "server1", "nick1").await;
    call(&mut coordinator, "channel_join", vec![json!("server1"), json!("#test")]).await.unwrap();
    settle(&mut coordinator).await;

    let before = clock::now();
    call(&mut coordinator, "channel_message", vec![json!("server1"), json!("#test"), json!("hello")])
        .await
        .unwrap();

    let events = call(&mut coordinator, "get_events_since", vec![json!(before)]).await.unwrap();
    let privmsg = events_of(&events, "privmsg");
    assert_eq!(privmsg.len(), 1);
    assert_eq!(privmsg[0]["text"], "hello");
    assert_eq!(privmsg[0]["source"], "nick1");
    assert_eq!(privmsg[0]["target"], "#test");
    assert_eq!(privmsg[0]["server"], "server1");

    // The echo belongs to the channel's own history too
    let channel_events = call(
        &mut coordinator,
        "channel_get_events_since",
        vec![json!("server1"), json!("#test"), json!(before)],
    )
    .await
    .unwrap();
    assert_eq!(kinds(&channel_events), vec!["privmsg"]);
}

#[tokio::test]
async fn server_names_are_unique() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();

    connect(&mut coordinator, &mut fake, "server1", "nick1").await;
    connect(&mut coordinator, &mut fake, "server2", "nick2").await;

    let again = call(&mut coordinator, "server_connect", vec![json!("server1"), json!("nick3"), json!("127.0.0.1"), json!(fake.port())]).await;
    assert_eq!(fault_code(again), DUPLICATE);

    assert_eq!(call(&mut coordinator, "server_list", vec![]).await, Ok(json!(["server1", "server2"])));
    assert_eq!(call(&mut coordinator, "server_nick_name", vec![json!("server1")]).await, Ok(json!("nick1")));

    // The original connection still works
    assert_eq!(call(&mut coordinator, "channel_join", vec![json!("server1"), json!("#still")]).await, Ok(json!(true)));
    assert_eq!(fake.expect_line("JOIN").await, "JOIN #still");
}

#[tokio::test]
async fn invalid_channel_names() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();
    connect(&mut coordinator, &mut fake, "server1", "nick1").await;

    for bad in ["noprefix", "#a", "#with space", "#with,comma", "#bell\u{7}"] {
        let result = call(&mut coordinator, "channel_join", vec![json!("server1"), json!(bad)]).await;
        assert_eq!(fault_code(result), INVALID_NAME, "{:?}", bad);
    }

    let events = call(&mut coordinator, "get_events_since", vec![json!(0)]).await.unwrap();
    assert!(events_of(&events, "channel_join").is_empty());
    assert_eq!(call(&mut coordinator, "channel_list", vec![json!("server1")]).await, Ok(json!([])));
}

#[tokio::test]
async fn channel_names_are_case_normalised() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();
    connect(&mut coordinator, &mut fake, "server1", "nick1").await;

    call(&mut coordinator, "channel_join", vec![json!("server1"), json!("#PiRC")]).await.unwrap();
    assert_eq!(fake.expect_line("JOIN").await, "JOIN #pirc");

    let again = call(&mut coordinator, "channel_join", vec![json!("server1"), json!("#pirc")]).await;
    assert_eq!(fault_code(again), DUPLICATE);

    assert_eq!(call(&mut coordinator, "channel_list", vec![json!("server1")]).await, Ok(json!(["#pirc"])));
}

#[tokio::test]
async fn disconnect_leaves_every_channel() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();
    connect(&mut coordinator, &mut fake, "server1", "nick1").await;

    for channel in ["#a1", "#b2", "&c3"] {
        call(&mut coordinator, "channel_join", vec![json!("server1"), json!(channel)]).await.unwrap();
    }
    settle(&mut coordinator).await;

    let before = clock::now();
    assert_eq!(
        call(&mut coordinator, "server_disconnect", vec![json!("server1"), json!("bye")]).await,
        Ok(json!(true))
    );

    // Every PART reaches the server ahead of the QUIT
    let mut parted = Vec::new();
    loop {
        let line = fake.expect_line("").await;
        if line.starts_with("QUIT") {
            assert_eq!(line, "QUIT bye");
            break;
        }
        if let Some(part) = line.strip_prefix("PART ") {
            parted.push(part.to_string());
        }
    }
    parted.sort();
    assert_eq!(parted, vec!["#a1 bye", "#b2 bye", "&c3 bye"]);
    settle(&mut coordinator).await;

    let events = call(&mut coordinator, "get_events_since", vec![json!(before)]).await.unwrap();
    assert_eq!(events_of(&events, "server_disconnect").len(), 1);

    let leaves = events_of(&events, "channel_leave");
    assert_eq!(leaves.len(), 3);
    assert!(leaves.iter().all(|e| e["text"] == "bye"));

    assert_eq!(fault_code(call(&mut coordinator, "channel_list", vec![json!("server1")]).await), NOT_FOUND);
    assert_eq!(call(&mut coordinator, "server_list", vec![]).await, Ok(json!([])));
}

#[tokio::test]
async fn unreachable_server() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut coordinator = coordinator();

    let result = call(&mut coordinator, "server_connect", vec![json!("server1"), json!("nick1"), json!("127.0.0.1"), json!(port)]).await;
    assert_eq!(fault_code(result), CONNECTION);

    assert_eq!(call(&mut coordinator, "server_list", vec![]).await, Ok(json!([])));
    let events = call(&mut coordinator, "get_events_since", vec![json!(0)]).await.unwrap();
    assert!(events_of(&events, "server_connect").is_empty());
}

#[tokio::test]
async fn inbound_events_are_routed() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();
    connect(&mut coordinator, &mut fake, "server1", "nick1").await;
    call(&mut coordinator, "channel_join", vec![json!("server1"), json!("#test")]).await.unwrap();
    settle(&mut coordinator).await;

    fake.broadcast(":other!o@example PRIVMSG #test :hello there");
    fake.broadcast(":other!o@example PRIVMSG nick1 :psst");
    fake.broadcast(":other!o@example JOIN #test");
    fake.broadcast(":other!o@example PRIVMSG #elsewhere :not joined");
    settle(&mut coordinator).await;

    let channel = call(&mut coordinator, "channel_get_events_since", vec![json!("server1"), json!("#test"), json!(0)])
        .await
        .unwrap();
    let pubmsg = events_of(&channel, "pubmsg");
    assert_eq!(pubmsg.len(), 1);
    assert_eq!(pubmsg[0]["text"], "hello there");
    assert_eq!(pubmsg[0]["source"], "other!o@example");

    let joins = events_of(&channel, "channel_join");
    assert_eq!(joins.len(), 2);
    assert_eq!(joins[0]["this_user"], true);
    assert_eq!(joins[1]["this_user"], false);

    let server = call(&mut coordinator, "server_get_events_since", vec![json!("server1"), json!(0)])
        .await
        .unwrap();
    let texts: Vec<&str> = events_of(&server, "privmsg")
        .iter()
        .chain(events_of(&server, "pubmsg").iter())
        .map(|e| e["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["psst", "not joined"]);
    assert_eq!(events_of(&server, "motd").len(), 1);

    let slice = call(&mut coordinator, "channel_get_event_slice", vec![json!("server1"), json!("#test"), json!(0), json!(1)])
        .await
        .unwrap();
    assert_eq!(kinds(&slice), vec!["channel_join"]);
}

#[tokio::test]
async fn pings_are_answered() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();
    connect(&mut coordinator, &mut fake, "server1", "nick1").await;

    fake.broadcast("PING :fake.irc");
    assert_eq!(fake.expect_line("PONG").await, "PONG fake.irc");
}

#[tokio::test]
async fn lost_connection_is_recorded() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();
    connect(&mut coordinator, &mut fake, "server1", "nick1").await;
    call(&mut coordinator, "channel_join", vec![json!("server1"), json!("#test")]).await.unwrap();

    fake.close_all();
    settle(&mut coordinator).await;

    assert_eq!(call(&mut coordinator, "server_list", vec![]).await, Ok(json!([])));

    let events = call(&mut coordinator, "get_events_since", vec![json!(0)]).await.unwrap();
    let disconnects = events_of(&events, "server_disconnect");
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0]["server"], "server1");
    assert_eq!(disconnects[0]["text"], "connection closed");
}

#[tokio::test]
async fn private_messages_to_users() {
    let mut fake = FakeIrcServer::start().await;
    let mut coordinator = coordinator();
    connect(&mut coordinator, &mut fake, "server1", "nick1").await;

    let result = call(&mut coordinator, "server_privmsg", vec![json!("server1"), json!("friend"), json!("how are you?")]).await;
    assert_eq!(result, Ok(json!(true)));
    assert_eq!(fake.expect_line("PRIVMSG").await, "PRIVMSG friend :how are you?");

    let events = call(&mut coordinator, "server_get_event_slice", vec![json!("server1"), json!(0), json!(1)])
        .await
        .unwrap();
    assert_eq!(kinds(&events), vec!["privmsg"]);
    assert_eq!(events[0]["target"], "friend");
}
