//! # idcache testkit
//!
//! Testing utilities for the identity cache.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Decode vectors**: Known rights values with their expected capability sets
//! - **Generators**: Proptest strategies for raw permission payloads
//! - **Fixtures**: A cache wired to an in-memory identity service, and
//!   observers that record what they receive
//!
//! ## Decode Vectors
//!
//! ```rust
//! use idcache_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok) in verify_all_vectors() {
//!     assert!(ok, "vector {} failed", name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use idcache_testkit::generators::raw_permissions;
//!
//! proptest! {
//!     #[test]
//!     fn decoding_never_drops_names(raw in raw_permissions()) {
//!         let map = idcache_core::decode_permissions(&raw);
//!         prop_assert_eq!(map.len(), raw.len());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use idcache_testkit::fixtures::{Recorder, TestFixture};
//! use idcache_core::ScopedValue;
//!
//! let fixture = TestFixture::new();
//! let recorder = Recorder::<ScopedValue>::new();
//! let _sub = fixture.cache.subscribe_scope(recorder.observer(), "docs", Some("e1"));
//! assert_eq!(recorder.len(), 1);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{Recorder, TestFixture, TEST_EMAIL, TEST_PASSWORD};
