// SPDX-License-Identifier: MIT OR Apache-2.0
// Project: rustgensum
// File: app.rs
// Author: Volker Schwaberow <volker@schwaberow.de>
// Copyright (c) 2022 Volker Schwaberow

use crate::rgs::checksum::{self, ChecksumOptions, DigestResult, Schedule};
use crate::rgs::digest::DigestAlgorithm;
use crate::rgs::progress::{ProgressConfig, ProgressMode};
use crate::rgs::render::Renderer;
use crate::rgs::stream::DEFAULT_CHUNK_SIZE;
use clap::{crate_name, Arg, ArgAction, ArgMatches};
use clap_complete::{generate, Generator, Shell};
use console::Term;
use indicatif::ProgressDrawTarget;
use log::{error, info};
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::IntoEnumIterator;

const DEFAULT_ALGORITHMS: [&str; 4] = ["md5", "sha1", "sha256", "sha512"];

const HELP_TEMPLATE: &str = "{before-help}{name} {version}
Written by {author-with-newline}{about-with-newline}
  rgs <FILE>                       md5, sha1, sha256 and sha512 of FILE
  rgs -a sha256 -a blake3 <FILE>   selected algorithms, in that order
{usage-heading} {usage}

{all-args}{after-help}
";

/// Everything a checksum run needs, resolved from the command line.
#[derive(Clone, Debug)]
pub struct RunSettings {
	pub path: PathBuf,
	pub algorithms: Vec<String>,
	pub options: ChecksumOptions,
	pub progress: ProgressConfig,
	pub color: bool,
}

impl RunSettings {
	fn from_matches(m: &ArgMatches) -> Result<Self, Box<dyn Error>> {
		let path = m
			.get_one::<PathBuf>("FILE")
			.cloned()
			.ok_or("no file provided")?;
		let algorithms: Vec<String> = m
			.get_many::<String>("algorithm")
			.map(|values| values.cloned().collect())
			.unwrap_or_default();
		let throttle = Duration::from_millis(
			m.get_one::<u64>("throttle-ms").copied().unwrap_or(30),
		);
		let chunk_size = m
			.get_one::<u64>("chunk-size")
			.map(|size| *size as usize)
			.unwrap_or(DEFAULT_CHUNK_SIZE);
		let schedule = if m.get_flag("parallel") {
			Schedule::Parallel
		} else {
			Schedule::Sequential
		};
		let mode = m
			.get_one::<ProgressMode>("progress")
			.copied()
			.unwrap_or_default();
		Ok(Self {
			path,
			algorithms,
			options: ChecksumOptions {
				chunk_size,
				throttle,
				schedule,
			},
			progress: ProgressConfig { mode },
			color: !m.get_flag("no-color"),
		})
	}
}

fn build_cli() -> clap::Command {
	clap::Command::new(crate_name!())
		.color(clap::ColorChoice::Never)
		.help_template(HELP_TEMPLATE)
		.bin_name("rgs")
		.version(clap::crate_version!())
		.author(clap::crate_authors!())
		.about("Compute several checksums of a file with live progress")
		.arg(
			Arg::new("FILE")
				.help("File to checksum")
				.value_parser(clap::value_parser!(PathBuf))
				.required_unless_present_any(["list", "completions"]),
		)
		.arg(
			Arg::new("algorithm")
				.short('a')
				.long("algorithm")
				.help("Digest algorithm, repeatable or comma separated (e.g., sha256)")
				.action(ArgAction::Append)
				.value_delimiter(',')
				.default_values(DEFAULT_ALGORITHMS),
		)
		.arg(
			Arg::new("chunk-size")
				.long("chunk-size")
				.help("Bytes read per chunk")
				.value_parser(clap::value_parser!(u64).range(1..))
				.default_value("65536"),
		)
		.arg(
			Arg::new("throttle-ms")
				.long("throttle-ms")
				.help("Minimum milliseconds between progress redraws")
				.value_parser(clap::value_parser!(u64))
				.default_value("30"),
		)
		.arg(
			Arg::new("parallel")
				.long("parallel")
				.help("Hash every algorithm on its own thread")
				.action(ArgAction::SetTrue),
		)
		.arg(
			Arg::new("progress")
				.long("progress")
				.help("Live progress display (auto, always, never)")
				.value_parser(clap::value_parser!(ProgressMode))
				.default_value("auto"),
		)
		.arg(
			Arg::new("no-color")
				.long("no-color")
				.help("Disable colored output")
				.action(ArgAction::SetTrue),
		)
		.arg(
			Arg::new("log-file")
				.long("log-file")
				.help("Append log records to this file instead of stderr")
				.value_parser(clap::value_parser!(PathBuf)),
		)
		.arg(
			Arg::new("list")
				.long("list")
				.help("List supported algorithms")
				.action(ArgAction::SetTrue),
		)
		.arg(
			Arg::new("completions")
				.long("completions")
				.help("Print shell completions")
				.value_parser(clap::value_parser!(Shell)),
		)
}

fn print_completions<G: Generator>(gen: G, cmd: &mut clap::Command) {
	generate(gen, cmd, "rgs", &mut io::stdout());
}

fn init_logging(log_file: Option<&PathBuf>) -> io::Result<()> {
	let mut builder = env_logger::Builder::from_env(
		env_logger::Env::default().default_filter_or("info"),
	);
	if let Some(path) = log_file {
		let file =
			OpenOptions::new().create(true).append(true).open(path)?;
		builder.target(env_logger::Target::Pipe(Box::new(file)));
	}
	// A logger may already be installed when embedded.
	let _ = builder.try_init();
	Ok(())
}

/// Run every requested checksum against the settings' file, drawing to
/// stdout. Failures are logged rather than returned.
pub fn calculate_all_checksums(
	settings: &RunSettings,
) -> Option<Vec<DigestResult>> {
	let is_tty = io::stdout().is_terminal();
	let color = settings.color
		&& is_tty
		&& colored::control::SHOULD_COLORIZE.should_colorize();
	let mut renderer = build_renderer(&settings.progress, is_tty, color);
	report_outcome(
		&settings.path,
		checksum::run_all(
			&settings.path,
			&settings.algorithms,
			&settings.options,
			&mut renderer,
		),
	)
}

fn build_renderer(
	progress: &ProgressConfig,
	is_tty: bool,
	color: bool,
) -> Renderer<io::Stdout> {
	if !progress.is_live(is_tty) {
		return Renderer::plain(io::stdout(), color);
	}
	// Forced live output on a pipe still repaints, so draw unconditionally.
	let target = if is_tty {
		ProgressDrawTarget::stdout()
	} else {
		ProgressDrawTarget::term_like(Box::new(Term::stdout()))
	};
	Renderer::live(target, Some(Term::stdout()), color)
}

fn report_outcome(
	path: &Path,
	outcome: crate::rgs::error::Result<Vec<DigestResult>>,
) -> Option<Vec<DigestResult>> {
	match outcome {
		Ok(results) => {
			info!("Checksums calculated for file: {}", path.display());
			Some(results)
		}
		Err(err) => {
			error!(
				"Error calculating checksums for {}: {}",
				path.display(),
				err
			);
			None
		}
	}
}

pub fn run() -> Result<(), Box<dyn Error>> {
	let m = build_cli().get_matches();

	if let Some(shell) = m.get_one::<Shell>("completions").copied() {
		print_completions(shell, &mut build_cli());
		return Ok(());
	}
	if m.get_flag("list") {
		for alg in DigestAlgorithm::iter() {
			println!("{}", alg);
		}
		return Ok(());
	}

	init_logging(m.get_one::<PathBuf>("log-file"))?;
	if m.get_flag("no-color") {
		colored::control::set_override(false);
	}
	let settings = RunSettings::from_matches(&m)?;
	if calculate_all_checksums(&settings).is_none() {
		std::process::exit(1);
	}
	Ok(())
}
