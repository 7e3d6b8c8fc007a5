//! env_logger setup shared by binaries and tests

use log::LevelFilter;

/// Install the global logger. `RUST_LOG` wins over the default `info`.
/// Safe to call more than once; later calls are no-ops.
pub fn init()
{   init_with_level(LevelFilter::Info);
}

pub fn init_with_level(level: LevelFilter)
{   let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG")
    {   builder.parse_filters(&filters);
    }
    let _ = builder.format_timestamp_millis().try_init();
}
