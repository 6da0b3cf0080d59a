pub mod util;

pub use util::{format_clock, save_dir, simulation_epoch_ms, split_csv};
