use crate::validated::CHANNEL_PREFIXES;

/// Whether `s` has the shape of a channel name. This only checks the prefix;
/// use `ChannelName` for full validation.
pub fn is_channel_name(s: &str) -> bool {
    s.starts_with(|c: char| CHANNEL_PREFIXES.contains(c))
}

/// Extract the nickname from a `nick!user@host` source string.
pub fn nick_of(source: &str) -> &str {
    source.split('!').next().unwrap_or(source)
}
