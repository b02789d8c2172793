//! # framegate
//!
//! Decode compressed video chunks through a pluggable engine into
//! caller-owned YUV planes.
//!
//! `framegate` sits between a caller and a video decoding engine. It feeds
//! the engine one bitstream unit at a time, pulls the decoded picture, and
//! copies its planes into a [`DecodeResult`] that owns everything it points
//! to. The default engine is libavcodec's `libxevd` EVC decoder, reached
//! through [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) and
//! [`ffmpeg-sys-next`](https://crates.io/crates/ffmpeg-sys-next).
//!
//! ## Quick Start
//!
//! ### Decode one chunk
//!
//! ```no_run
//! use framegate::Decoder;
//!
//! let mut decoder = Decoder::create(4).unwrap();
//! let result = decoder.decode(&[0x02, 0x01, 0x00]).unwrap();
//! match &result.frame {
//!     Some(frame) => println!("{}x{} {}-bit", frame.width, frame.height, frame.bit_depth),
//!     None => println!("no frame yet: {:?}", result.unavailable_reason),
//! }
//! ```
//!
//! ### Decode a length-prefixed stream
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use framegate::{Decoder, StreamOptions};
//!
//! let mut decoder = Decoder::create(4).unwrap();
//! let reader = BufReader::new(File::open("input.evc").unwrap());
//! decoder
//!     .decode_stream(reader, &StreamOptions::new(), |result| {
//!         println!("Frame:{} Slice:{}", result.nalu_type, result.slice_type);
//!         Ok(())
//!     })
//!     .unwrap();
//! ```
//!
//! ## Features
//!
//! - **Owned results**: plane bytes are copied out of the engine; a result
//!   carries either all three planes or none
//! - **8-bit and high bit depth**: sizes and strides follow the sample width
//! - **Pluggable engines**: anything implementing [`DecodeEngine`], including
//!   the [`ScriptedEngine`] test double with its resource ledger
//! - **C ABI**: create, destroy, decode and free through [`ffi`]
//! - **Progress & cancellation** for stream decoding
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | `FrameStream` for async stream decoding via Tokio |
//! | `rayon` | decode independent streams across rayon threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries built with `libxevd` are needed for the
//! default engine.

#[cfg(feature = "async")]
pub mod async_stream;
pub mod bitstream;
pub mod configuration;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ffi;
pub mod progress;
#[cfg(feature = "rayon")]
pub mod rayon;
pub mod result;
pub mod status;
pub mod stream;

#[cfg(feature = "async")]
pub use async_stream::{FrameStream, frame_stream, frame_stream_with};
pub use bitstream::{ColorFormat, ColorSpace, NalHeader, NalUnitType, SliceType};
pub use configuration::{DecoderOptions, StreamOptions};
pub use decoder::{Decoder, DecoderStats};
pub use engine::ffmpeg::{FfmpegEngine, LogLevel, set_engine_log_level};
pub use engine::scripted::{
    EngineLedger, PullScript, ScriptedEngine, ScriptedPicture, ScriptedPlane, SubmitScript,
};
pub use engine::{CropWindow, DecodeEngine, Picture, PlaneView, PullError, SubmitStat};
pub use error::FramegateError;
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
#[cfg(feature = "rayon")]
pub use crate::rayon::{decode_files_parallel, decode_streams_parallel};
pub use result::{DecodeResult, DecodedFrame, Plane};
pub use status::{ReturnCode, UnavailableReason};
pub use stream::{NalUnitReader, StreamSummary, write_unit};
