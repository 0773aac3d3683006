//! Maps flat RPC method names onto the coordinator, its servers, and their
//! channels.
//!
//! A name is resolved, in order, as:
//!
//! 1. a coordinator method of exactly that name;
//! 2. `server_<method>`: a server method, on the server named by the first
//!    parameter;
//! 3. `channel_<method>`: a server method named `channel_<method>` if there
//!    is one, otherwise a channel method on the channel named by the second
//!    parameter.
//!
//! Each hop consults a [`MethodTable`], so a private or underscore-prefixed
//! method is unreachable from a remote caller at every level.

use crate::coordinator::ProxyCoordinator;
use crate::errors::ProxyError;
use crate::irc::IrcConnectionParams;
use pirc_network::prelude::*;

use serde_json::{json, Map, Value};

mod argument;
pub use argument::*;

mod table;
pub use table::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    ServerConnect,
    ServerDisconnect,
    ServerList,
    GetEventsSince,
    GetEventSlice,
    AppendEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMethod {
    ChannelJoin,
    ChannelList,
    GetEventsSince,
    GetEventSlice,
    Privmsg,
    NickName,
    LeaveAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMethod {
    Leave,
    Message,
    GetEventsSince,
    GetEventSlice,
    Record,
}

pub const PROXY_METHODS: MethodTable<ProxyMethod> = MethodTable::new(&[
    ("server_connect", Visibility::Public, ProxyMethod::ServerConnect),
    ("server_disconnect", Visibility::Public, ProxyMethod::ServerDisconnect),
    ("server_list", Visibility::Public, ProxyMethod::ServerList),
    ("get_events_since", Visibility::Public, ProxyMethod::GetEventsSince),
    ("get_event_slice", Visibility::Public, ProxyMethod::GetEventSlice),
    ("_append_event", Visibility::Private, ProxyMethod::AppendEvent),
]);

pub const SERVER_METHODS: MethodTable<ServerMethod> = MethodTable::new(&[
    ("channel_join", Visibility::Public, ServerMethod::ChannelJoin),
    ("channel_list", Visibility::Public, ServerMethod::ChannelList),
    ("get_events_since", Visibility::Public, ServerMethod::GetEventsSince),
    ("get_event_slice", Visibility::Public, ServerMethod::GetEventSlice),
    ("privmsg", Visibility::Public, ServerMethod::Privmsg),
    ("nick_name", Visibility::Public, ServerMethod::NickName),
    ("_leave_all", Visibility::Private, ServerMethod::LeaveAll),
]);

pub const CHANNEL_METHODS: MethodTable<ChannelMethod> = MethodTable::new(&[
    ("leave", Visibility::Public, ChannelMethod::Leave),
    ("message", Visibility::Public, ChannelMethod::Message),
    ("get_events_since", Visibility::Public, ChannelMethod::GetEventsSince),
    ("get_event_slice", Visibility::Public, ChannelMethod::GetEventSlice),
    ("_record", Visibility::Private, ChannelMethod::Record),
]);

/// Resolve and invoke one method
pub async fn dispatch(
    coordinator: &mut ProxyCoordinator,
    caller: Caller,
    method: &str,
    params: &[Value],
) -> Result<Value, ProxyError> {
    if let Some(m) = PROXY_METHODS.lookup(method, caller) {
        return call_proxy_method(coordinator, m, ArgList::new(params)).await;
    }

    if let Some(rest) = method.strip_prefix("server_") {
        if let Some(m) = SERVER_METHODS.lookup(rest, caller) {
            return call_server_method(coordinator, m, ArgList::new(params));
        }
    }

    if let Some(rest) = method.strip_prefix("channel_") {
        if let Some(m) = SERVER_METHODS.lookup(method, caller) {
            return call_server_method(coordinator, m, ArgList::new(params));
        }
        if let Some(m) = CHANNEL_METHODS.lookup(rest, caller) {
            return call_channel_method(coordinator, m, ArgList::new(params));
        }
    }

    Err(ProxyError::MethodNotFound(method.to_string()))
}

fn start_time(args: &mut ArgList) -> Result<f64, ProxyError> {
    let start_time: f64 = args.next()?;
    if start_time < 0.0 || !start_time.is_finite() {
        return Err(ProxyError::InvalidArgument(format!(
            "start_time must be a non-negative number, not {}",
            start_time
        )));
    }
    Ok(start_time)
}

fn events(events: Vec<EventRecord>) -> Result<Value, ProxyError> {
    Ok(serde_json::to_value(events)?)
}

async fn call_proxy_method(
    coordinator: &mut ProxyCoordinator,
    method: ProxyMethod,
    mut args: ArgList<'_>,
) -> Result<Value, ProxyError> {
    match method {
        ProxyMethod::ServerConnect => {
            let name: ServerName = args.next::<String>()?.parse()?;
            let nick: Nickname = args.next::<String>()?.parse()?;
            let host: String = args.next()?;
            let port = args.next_or(6667)?;
            let password = args.next_or(String::new())?;
            let ssl = args.next_or(false)?;
            let ipv6 = args.next_or(false)?;
            args.finish()?;

            let params = IrcConnectionParams {
                host,
                port,
                nick,
                password: Some(password).filter(|p| !p.is_empty()),
                ssl,
                ipv6,
            };
            coordinator.server_connect(name, params).await?;
            Ok(json!(true))
        }
        ProxyMethod::ServerDisconnect => {
            let name: String = args.next()?;
            let message = args.next_or(String::new())?;
            args.finish()?;

            coordinator.server_disconnect(&name, &message)?;
            Ok(json!(true))
        }
        ProxyMethod::ServerList => {
            args.finish()?;
            Ok(json!(coordinator.server_list()))
        }
        ProxyMethod::GetEventsSince => {
            let start_time = start_time(&mut args)?;
            args.finish()?;
            events(coordinator.get_events_since(start_time))
        }
        ProxyMethod::GetEventSlice => {
            let start = args.next()?;
            let end = args.next()?;
            args.finish()?;
            events(coordinator.get_event_slice(start, end))
        }
        ProxyMethod::AppendEvent => {
            let fields: Map<String, Value> = args.next()?;
            args.finish()?;
            Ok(serde_json::to_value(coordinator.append_event(fields)?)?)
        }
    }
}

fn call_server_method(
    coordinator: &mut ProxyCoordinator,
    method: ServerMethod,
    mut args: ArgList<'_>,
) -> Result<Value, ProxyError> {
    let server_name: String = args.next()?;
    let (server, lifecycle) = coordinator.server_and_store(&server_name)?;

    match method {
        ServerMethod::ChannelJoin => {
            let channel: ChannelName = args.next::<String>()?.parse()?;
            args.finish()?;
            server.channel_join(channel, lifecycle)?;
            Ok(json!(true))
        }
        ServerMethod::ChannelList => {
            args.finish()?;
            Ok(json!(server.channel_list()))
        }
        ServerMethod::GetEventsSince => {
            let start_time = start_time(&mut args)?;
            args.finish()?;
            events(server.get_events_since(start_time))
        }
        ServerMethod::GetEventSlice => {
            let start = args.next()?;
            let end = args.next()?;
            args.finish()?;
            events(server.get_event_slice(start, end))
        }
        ServerMethod::Privmsg => {
            let target: String = args.next()?;
            let text: String = args.next()?;
            args.finish()?;
            server.privmsg(&target, &text)?;
            Ok(json!(true))
        }
        ServerMethod::NickName => {
            args.finish()?;
            Ok(json!(server.nick_name()))
        }
        ServerMethod::LeaveAll => {
            let message = args.next_or(String::new())?;
            args.finish()?;
            server.leave_all(&message, lifecycle);
            Ok(json!(true))
        }
    }
}

fn call_channel_method(
    coordinator: &mut ProxyCoordinator,
    method: ChannelMethod,
    mut args: ArgList<'_>,
) -> Result<Value, ProxyError> {
    let server_name: String = args.next()?;
    let (server, lifecycle) = coordinator.server_and_store(&server_name)?;
    let channel_name: ChannelName = args.next::<String>()?.parse()?;

    match method {
        ChannelMethod::Leave => {
            let message = args.next_or(String::new())?;
            args.finish()?;
            server.channel_leave(&channel_name, &message, lifecycle)?;
            Ok(json!(true))
        }
        ChannelMethod::Message => {
            let text: String = args.next()?;
            args.finish()?;
            server.channel_mut(&channel_name)?.message(&text)?;
            Ok(json!(true))
        }
        ChannelMethod::GetEventsSince => {
            let start_time = start_time(&mut args)?;
            args.finish()?;
            events(server.channel(&channel_name)?.get_events_since(start_time))
        }
        ChannelMethod::GetEventSlice => {
            let start = args.next()?;
            let end = args.next()?;
            args.finish()?;
            events(server.channel(&channel_name)?.get_event_slice(start, end))
        }
        ChannelMethod::Record => {
            let fields: Map<String, Value> = args.next()?;
            args.finish()?;
            let record = server.channel_mut(&channel_name)?.record_fields(fields)?;
            Ok(serde_json::to_value(record)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_entries_are_underscored() {
        let local: Vec<&str> = PROXY_METHODS
            .names(Caller::Local)
            .chain(SERVER_METHODS.names(Caller::Local))
            .chain(CHANNEL_METHODS.names(Caller::Local))
            .collect();
        let remote: Vec<&str> = PROXY_METHODS
            .names(Caller::Remote)
            .chain(SERVER_METHODS.names(Caller::Remote))
            .chain(CHANNEL_METHODS.names(Caller::Remote))
            .collect();

        for name in local {
            assert_eq!(name.starts_with('_'), !remote.contains(&name), "{}", name);
        }
    }

    #[test]
    fn server_level_channel_methods() {
        assert_eq!(SERVER_METHODS.lookup("channel_join", Caller::Remote), Some(ServerMethod::ChannelJoin));
        assert_eq!(CHANNEL_METHODS.lookup("join", Caller::Remote), None);
        assert_eq!(CHANNEL_METHODS.lookup("leave", Caller::Remote), Some(ChannelMethod::Leave));
    }
}
