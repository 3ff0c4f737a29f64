/// Declares one config section with its defaults inline.
///
/// Every section in `schemas` (`RpcConfig`, `SwapConfig`, `FeedConfig`,
/// `MarketEntry`, ...) goes through this macro, so a TOML file only needs
/// the keys it changes: missing keys fall back to the defaults written here.
///
/// ```ignore
/// config_struct! {
///     pub struct SwapConfig {
///         freshness_band: f64 = 0.05,
///         confirmation_timeout_secs: u64 = 90,
///     }
/// }
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
        #[derive(Debug, Clone, serde::Deserialize)]
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
