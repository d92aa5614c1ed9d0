/// Configuration macros for zero-repetition config definitions

/// Define a configuration struct with embedded defaults
///
/// Each field is declared with its type and default value in one place; the
/// macro generates the struct (public fields), its `Default` impl, and serde
/// support with `#[serde(default)]` so a partial TOML file fills the gaps
/// from the defaults.
///
/// # Example
/// ```
/// topichub::config_struct! {
///     pub struct ExampleConfig {
///         url: String = "ws://localhost:4000/socket".to_string(),
///         ack_timeout_ms: u64 = 5000,
///     }
/// }
///
/// let cfg = ExampleConfig::default();
/// assert_eq!(cfg.ack_timeout_ms, 5000);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
