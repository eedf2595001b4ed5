// SPDX-License-Identifier: MIT OR Apache-2.0
// Project: rustgensum
// File: digest.rs
// Author: Volker Schwaberow <volker@schwaberow.de>
// Copyright (c) 2022 Volker Schwaberow

use crate::rgs::error::{ChecksumError, Result};
use digest::{Digest, DynDigest};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

/// Digest algorithms a checksum run can be asked for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter)]
pub enum DigestAlgorithm {
	Blake2b,
	Blake2s,
	Blake3,
	Md2,
	Md4,
	Md5,
	Ripemd160,
	Ripemd320,
	Sha1,
	Sha224,
	Sha256,
	Sha384,
	Sha512,
	Sha3_224,
	Sha3_256,
	Sha3_384,
	Sha3_512,
	Sm3,
	Streebog256,
	Streebog512,
	Tiger,
	Whirlpool,
}

impl DigestAlgorithm {
	pub fn name(self) -> &'static str {
		match self {
			Self::Blake2b => "blake2b",
			Self::Blake2s => "blake2s",
			Self::Blake3 => "blake3",
			Self::Md2 => "md2",
			Self::Md4 => "md4",
			Self::Md5 => "md5",
			Self::Ripemd160 => "ripemd160",
			Self::Ripemd320 => "ripemd320",
			Self::Sha1 => "sha1",
			Self::Sha224 => "sha224",
			Self::Sha256 => "sha256",
			Self::Sha384 => "sha384",
			Self::Sha512 => "sha512",
			Self::Sha3_224 => "sha3_224",
			Self::Sha3_256 => "sha3_256",
			Self::Sha3_384 => "sha3_384",
			Self::Sha3_512 => "sha3_512",
			Self::Sm3 => "sm3",
			Self::Streebog256 => "streebog256",
			Self::Streebog512 => "streebog512",
			Self::Tiger => "tiger",
			Self::Whirlpool => "whirlpool",
		}
	}

	/// Resolve a user supplied name. Matching ignores case, treats `-`
	/// and `_` alike and accepts the OpenSSL spellings of a few names.
	pub fn from_name(name: &str) -> Result<Self> {
		let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
		let canonical = match normalized.as_str() {
			"blake2b512" => "blake2b",
			"blake2s256" => "blake2s",
			"rmd160" | "ripemd" => "ripemd160",
			"sha_1" => "sha1",
			"sha_224" => "sha224",
			"sha_256" => "sha256",
			"sha_384" => "sha384",
			"sha_512" => "sha512",
			other => other,
		};
		Self::iter()
			.find(|alg| alg.name() == canonical)
			.ok_or_else(|| {
				ChecksumError::UnsupportedAlgorithm(name.to_string())
			})
	}

	fn hasher(self) -> Box<dyn DynDigest> {
		match self {
			Self::Blake2b => Box::new(blake2::Blake2b512::new()),
			Self::Blake2s => Box::new(blake2::Blake2s256::new()),
			Self::Blake3 => Box::new(blake3::Hasher::new()),
			Self::Md2 => Box::new(md2::Md2::new()),
			Self::Md4 => Box::new(md4::Md4::new()),
			Self::Md5 => Box::new(md5::Md5::new()),
			Self::Ripemd160 => Box::new(ripemd::Ripemd160::new()),
			Self::Ripemd320 => Box::new(ripemd::Ripemd320::new()),
			Self::Sha1 => Box::new(sha1::Sha1::new()),
			Self::Sha224 => Box::new(sha2::Sha224::new()),
			Self::Sha256 => Box::new(sha2::Sha256::new()),
			Self::Sha384 => Box::new(sha2::Sha384::new()),
			Self::Sha512 => Box::new(sha2::Sha512::new()),
			Self::Sha3_224 => Box::new(sha3::Sha3_224::new()),
			Self::Sha3_256 => Box::new(sha3::Sha3_256::new()),
			Self::Sha3_384 => Box::new(sha3::Sha3_384::new()),
			Self::Sha3_512 => Box::new(sha3::Sha3_512::new()),
			Self::Sm3 => Box::new(sm3::Sm3::new()),
			Self::Streebog256 => Box::new(streebog::Streebog256::new()),
			Self::Streebog512 => Box::new(streebog::Streebog512::new()),
			Self::Tiger => Box::new(tiger::Tiger::new()),
			Self::Whirlpool => Box::new(whirlpool::Whirlpool::new()),
		}
	}
}

impl fmt::Display for DigestAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Incremental digest state for one algorithm.
///
/// Chunks must be fed in stream order. [`Accumulator::finalize`] takes the
/// accumulator by value, so a digest can only be produced once.
pub struct Accumulator {
	algorithm: DigestAlgorithm,
	digest: Box<dyn DynDigest>,
}

impl Accumulator {
	pub fn new(algorithm: DigestAlgorithm) -> Self {
		Self {
			algorithm,
			digest: algorithm.hasher(),
		}
	}

	pub fn from_name(name: &str) -> Result<Self> {
		DigestAlgorithm::from_name(name).map(Self::new)
	}

	pub fn algorithm(&self) -> DigestAlgorithm {
		self.algorithm
	}

	pub fn update(&mut self, chunk: &[u8]) {
		self.digest.update(chunk);
	}

	pub fn finalize(self) -> String {
		hex::encode(self.digest.finalize())
	}
}
