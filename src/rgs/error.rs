// SPDX-License-Identifier: MIT OR Apache-2.0
// Project: rustgensum
// File: error.rs
// Author: Volker Schwaberow <volker@schwaberow.de>
// Copyright (c) 2022 Volker Schwaberow

use std::io;
use std::path::PathBuf;

/// Failures surfaced by a checksum run.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
	#[error("failed to read '{}': {source}", path.display())]
	Io { path: PathBuf, source: io::Error },

	#[error("unsupported digest algorithm `{0}`")]
	UnsupportedAlgorithm(String),

	#[error("cancelled after another job failed")]
	Cancelled,

	#[error("no digest algorithms requested")]
	NoAlgorithms,

	#[error("failed to draw progress: {0}")]
	Render(#[source] io::Error),
}

impl ChecksumError {
	pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}
}

pub type Result<T> = std::result::Result<T, ChecksumError>;
