// SPDX-License-Identifier: MIT OR Apache-2.0
// Project: rustgensum
// File: lib.rs
// Author: Volker Schwaberow <volker@schwaberow.de>
// Copyright (c) 2022 Volker Schwaberow

pub mod rgs {
	pub mod app;
	pub mod checksum;
	pub mod digest;
	pub mod error;
	pub mod progress;
	pub mod render;
	pub mod stream;
}

pub use rgs::checksum::{
	run_all, AlgorithmJob, ChecksumOptions, DigestResult, Schedule,
};
pub use rgs::error::{ChecksumError, Result};
