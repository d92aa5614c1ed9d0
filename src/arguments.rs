/// Centralized argument handling for topichub
///
/// Command-line arguments are captured once into CMD_ARGS so that the logger,
/// the CLI and tests read the same view. Tests and embedding binaries may
/// override them with `set_cmd_args`.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args()
        .iter()
        .any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Connection state machine debug mode
pub fn is_debug_connection_enabled() -> bool {
    has_arg("--debug-connection")
}

/// Topic dispatch debug mode
pub fn is_debug_topic_enabled() -> bool {
    has_arg("--debug-topic")
}

/// Envelope codec debug mode (logs raw frames)
pub fn is_debug_codec_enabled() -> bool {
    has_arg("--debug-codec")
}

/// Socket transport debug mode
pub fn is_debug_transport_enabled() -> bool {
    has_arg("--debug-transport")
}

/// Event-channel bridge debug mode
pub fn is_debug_channel_enabled() -> bool {
    has_arg("--debug-channel")
}

/// Help requested via --help or -h
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Displays the help menu with all available flags and their descriptions
pub fn print_help() {
    println!("topichub - real-time topic client");
    println!();
    println!("USAGE:");
    println!("    topichub --token <TOKEN> --topic <NAME> [FLAGS]");
    println!();
    println!("CORE FLAGS:");
    println!("    --url <URL>               WebSocket endpoint (default: connection.url from config)");
    println!("    --token <TOKEN>           Credential sent with the identify handshake");
    println!("    --topic <NAME>            Topic to subscribe to (repeatable)");
    println!("    --invitation <TOKEN>      Invitation token supplied on every subscribe");
    println!("    --duration <SECS>         Stop after this many seconds (default: run until Ctrl-C)");
    println!("    --config <PATH>           Configuration file (default: data/topichub.toml)");
    println!("    --help, -h                Show this help message");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-connection        Connection state machine debug mode");
    println!("    --debug-topic             Topic dispatch debug mode");
    println!("    --debug-codec             Log raw inbound and outbound frames");
    println!("    --debug-transport         Socket transport debug mode");
    println!("    --debug-channel           Event-channel bridge debug mode");
    println!("    --verbose                 Show verbose output for every tag");
    println!("    --quiet                   Only show warnings and errors");
    println!();
    println!("EXAMPLES:");
    println!("    topichub --token T --topic discussions/discussion/42");
    println!("    topichub --token T --topic discussions/discussion/42 --debug-connection");
}

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Gets every value following a repeatable flag
pub fn get_arg_values(flag: &str) -> Vec<String> {
    let args = get_cmd_args();
    args.windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].clone())
        .collect()
}

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_connection_enabled() {
        modes.push("connection");
    }
    if is_debug_topic_enabled() {
        modes.push("topic");
    }
    if is_debug_codec_enabled() {
        modes.push("codec");
    }
    if is_debug_transport_enabled() {
        modes.push("transport");
    }
    if is_debug_channel_enabled() {
        modes.push("channel");
    }

    modes
}
