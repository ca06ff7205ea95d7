//! Locality-sensitive hashing used to split nodes into buckets.

pub mod superbit;

pub use superbit::SuperBitHasher;
