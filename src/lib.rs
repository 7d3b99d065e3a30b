//! Downloads every published version of the Fabric `intermediary` mappings
//! and exports each one as a normalized JSON document.
//!
//! The interesting pieces are the [`tiny`] decoder, which understands both
//! Tiny v1 and Tiny v2 payloads, and the [`pipeline`] coordinator, which
//! fans the per-version work out across a small fixed pool of workers.
//! Network and archive access go through the [`fetch::Fetcher`] and
//! [`archive::ArchiveReader`] traits so the pipeline can run against fakes.
extern crate indexmap;
extern crate failure;
extern crate failure_derive;
extern crate log;
extern crate crossbeam;
extern crate parking_lot;
extern crate curl;
#[macro_use]
extern crate scopeguard;
extern crate zip;

pub mod archive;
pub mod catalog;
pub mod emit;
pub mod fetch;
pub mod pipeline;
pub mod tiny;

pub use self::archive::{ArchiveReader, ZipArchiveReader};
pub use self::fetch::{CurlFetcher, Fetcher};
pub use self::pipeline::{BatchSummary, FetcherConfig, IntermediaryFetcher};
pub use self::tiny::{MappingData, MemberMapping};
