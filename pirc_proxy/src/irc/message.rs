/// A tokenised line received from an IRC server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    /// The message source, without the leading colon
    pub prefix: Option<String>,
    /// The command or three-digit numeric
    pub command: String,
    /// The list of arguments
    pub args: Vec<String>,
}

impl ServerMessage {
    /// Tokenise a received line. Message tags, if any, are skipped.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut args = Vec::new();
        let mut prefix = None;

        let mut raw = raw.trim_start().trim_end_matches(['\r', '\n']);
        if raw.is_empty() {
            return None;
        }

        if raw.starts_with('@') {
            let space_offset = raw.find(' ')?;
            raw = raw[space_offset..].trim_start();
        }

        if let Some(rest) = raw.strip_prefix(':') {
            let space_offset = rest.find(' ')?;
            prefix = Some(rest[..space_offset].to_string());
            raw = rest[space_offset..].trim_start();
        }

        if raw.is_empty() {
            return None;
        }

        let offset = match raw.find(' ') {
            Some(offset) => offset,
            None => {
                return Some(Self {
                    prefix,
                    command: raw.to_string(),
                    args: Vec::new(),
                });
            }
        };

        let command = &raw[0..offset];
        let mut rest = &raw[offset + 1..];

        loop {
            if let Some(arg) = rest.strip_prefix(':') {
                args.push(arg.to_string());
                break;
            }

            match rest.find(' ') {
                Some(offset) => {
                    let arg = &rest[0..offset];

                    if !arg.is_empty() {
                        args.push(arg.to_string());
                    }

                    rest = &rest[offset + 1..];
                }
                None => {
                    if !rest.is_empty() {
                        args.push(rest.to_string());
                    }
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_string(),
            args,
        })
    }

    /// The numeric code, if this is a numeric reply
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }
}

/// Build an outgoing line, without the terminating CRLF. The final argument
/// is sent as a trailing parameter when it needs to be.
pub fn format_line(command: &str, args: &[&str]) -> String {
    let mut line = command.to_string();

    if let Some((last, init)) = args.split_last() {
        for arg in init {
            line.push(' ');
            line.push_str(arg);
        }
        line.push(' ');
        if last.is_empty() || last.contains(' ') || last.starts_with(':') {
            line.push(':');
        }
        line.push_str(last);
    }

    line
}
