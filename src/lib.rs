pub mod error;
pub mod data_structures;
pub mod utils;
pub mod sampler;
pub mod anomaly;
pub mod pipeline;
pub mod config;
pub mod data_loader;
pub mod evaluation;
pub mod plotting;

pub use error::*;
pub use data_structures::*;
pub use utils::*;
pub use sampler::*;
pub use anomaly::*;
pub use pipeline::*;
pub use config::*;
pub use data_loader::*;
pub use evaluation::*;
pub use plotting::*;
