/// Log tags identify the subsystem a message comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Connection,
    Topic,
    Codec,
    Transport,
    Channel,
    Config,
    System,
}

impl LogTag {
    /// Key used by --debug-<key> and --verbose-<key> flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::Connection => "connection",
            LogTag::Topic => "topic",
            LogTag::Codec => "codec",
            LogTag::Transport => "transport",
            LogTag::Channel => "channel",
            LogTag::Config => "config",
            LogTag::System => "system",
        }.to_string()
    }

    /// Uncolored label for plain output
    pub fn to_plain_string(&self) -> String {
        self.to_debug_key().to_uppercase()
    }

    pub fn all() -> &'static [LogTag] {
        &[
            LogTag::Connection,
            LogTag::Topic,
            LogTag::Codec,
            LogTag::Transport,
            LogTag::Channel,
            LogTag::Config,
            LogTag::System,
        ]
    }
}
