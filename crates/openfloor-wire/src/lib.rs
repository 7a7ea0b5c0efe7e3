//! Open Floor wire encoding.
//!
//! Turns the records of `openfloor-types` into JSON text and back, reads
//! and writes them as files, and loads codec settings from TOML.
//!
//! ## Architecture
//!
//! - **Codec**: encodes any record to (pretty or compact) JSON and decodes it
//!   back with a document size limit
//! - **CodecConfig**: output style and size limit, loadable from TOML
//! - **store**: save and load records as files on disk

pub mod codec;
pub mod config;
pub mod error;
pub mod store;

pub use codec::{from_json, to_json, Codec};
pub use config::{load_config, CodecConfig};
pub use error::{WireError, WireResult};
pub use store::{load_record, save_record};
