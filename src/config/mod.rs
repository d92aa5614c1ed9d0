/// Configuration system
///
/// - `macros`: `config_struct!` for single-source struct + defaults
/// - `schemas`: every configuration section
/// - `utils`: loading and global access
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{ Config, ConnectionConfig, HeartbeatConfig, ReconnectConfig };
pub use utils::{
    get_config_clone,
    load_config,
    load_config_from_path,
    parse_config,
    read_config_file,
    with_config,
    CONFIG_FILE_PATH,
};
