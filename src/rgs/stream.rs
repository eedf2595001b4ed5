// SPDX-License-Identifier: MIT OR Apache-2.0
// Project: rustgensum
// File: stream.rs
// Author: Volker Schwaberow <volker@schwaberow.de>
// Copyright (c) 2022 Volker Schwaberow

use crate::rgs::error::{ChecksumError, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A file opened for one sequential pass.
///
/// The size is captured once at open time and is not refreshed while
/// streaming.
pub struct FileStream {
	path: PathBuf,
	size: u64,
	reader: BufReader<File>,
}

impl FileStream {
	pub fn open(path: &Path) -> Result<Self> {
		let file =
			File::open(path).map_err(|e| ChecksumError::io(path, e))?;
		let size = file
			.metadata()
			.map_err(|e| ChecksumError::io(path, e))?
			.len();
		Ok(Self {
			path: path.to_path_buf(),
			size,
			reader: BufReader::new(file),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn size(&self) -> u64 {
		self.size
	}

	/// Consume the stream and yield its contents in chunks of at most
	/// `chunk_size` bytes.
	pub fn chunks(self, chunk_size: usize) -> Chunks {
		Chunks {
			path: self.path,
			reader: self.reader,
			buffer: vec![0; chunk_size.max(1)],
			done: false,
		}
	}
}

/// Lazy, finite sequence of chunks from a [`FileStream`].
///
/// After end of file or the first read error the iterator is fused.
pub struct Chunks {
	path: PathBuf,
	reader: BufReader<File>,
	buffer: Vec<u8>,
	done: bool,
}

impl Iterator for Chunks {
	type Item = Result<Vec<u8>>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		loop {
			match self.reader.read(&mut self.buffer) {
				Ok(0) => {
					self.done = true;
					return None;
				}
				Ok(count) => {
					return Some(Ok(self.buffer[..count].to_vec()))
				}
				Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
					continue
				}
				Err(e) => {
					self.done = true;
					return Some(Err(ChecksumError::io(&self.path, e)));
				}
			}
		}
	}
}
