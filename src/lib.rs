#![forbid(unsafe_code)]

pub mod board;
pub mod config;
pub mod driver;
pub mod error;
pub mod font;
pub mod mask;
pub mod render;
pub mod rng;
pub mod silhouette;
pub mod source;
pub mod stream;

pub use board::{Board, FlipView, Tile};
pub use config::{BoardConfig, Palette, Rgb};
pub use driver::{BoardController, Refresher};
pub use error::{FlapError, FlapResult};
pub use mask::{MaskGrid, MaskImage};
pub use render::{render_frame, Frame};
pub use source::{EtherscanSource, HashSource, PseudoHashSource};
pub use stream::HashStream;
