pub mod options;

pub use options::{Mode, OnExists, Options, OptionsBuilder, StorageTuning};
