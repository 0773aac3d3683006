/// Numeric replies that have a name of their own. Anything else is reported
/// by number.
const NUMERIC_NAMES: &[(u16, &str)] = &[
    (1, "welcome"),
    (2, "yourhost"),
    (3, "created"),
    (4, "myinfo"),
    (5, "featurelist"),
    (221, "umode"),
    (250, "luserconns"),
    (251, "luserclient"),
    (252, "luserop"),
    (253, "luserunknown"),
    (254, "luserchannels"),
    (255, "luserme"),
    (265, "n_local"),
    (266, "n_global"),
    (331, "notopic"),
    (332, "topic"),
    (333, "topicinfo"),
    (353, "namreply"),
    (366, "endofnames"),
    (372, "motd"),
    (375, "motdstart"),
    (376, "endofmotd"),
];

pub fn numeric_name(code: u16) -> Option<&'static str> {
    NUMERIC_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}
