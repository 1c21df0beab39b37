use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::prefix::Prefix;
use crate::io::{build_output_path, read_file};

/// Mutable chain state, kept behind a single lock.
///
/// The random generator lives next to the mapping so that a generation
/// walk samples under the same exclusive access it reads with. One lock
/// in the whole type, so there is no lock ordering to get wrong.
struct ChainState {
	/// Mapping from a prefix key to the words observed after that prefix.
	/// Suffixes keep their observation order; repeats are meaningful, a
	/// word recorded three times is three times as likely to be chosen.
	mapping: HashMap<String, Vec<String>>,
	rng: StdRng,
}

/// Serializable snapshot of a chain: its order and full mapping.
///
/// This is the on-disk format, written and read with `postcard`.
#[derive(Serialize, Deserialize)]
struct ChainSnapshot {
	order: usize,
	mapping: HashMap<String, Vec<String>>,
}

/// A fixed-order Markov chain over words.
///
/// The chain remembers, for every sequence of `order` consecutive words
/// seen during ingestion, the words observed immediately after it, and
/// generates new text by repeatedly sampling a recorded suffix for the
/// current window.
///
/// # Responsibilities
/// - Accumulate prefix/suffix observations from ingested text
/// - Generate word sequences by weighted random sampling
/// - Merge with another chain of the same order (parallel corpus builds)
/// - Save and load its state as a binary snapshot
///
/// # Invariants
/// - `order` is fixed at construction and never changes
/// - Every key in the mapping is the space-joined form of exactly `order`
///   words
/// - A suffix list is created by its first append and is never empty once
///   present
///
/// # Concurrency
/// All methods take `&self`; a single internal mutex serializes access to
/// the mapping. [`Chain::feed`] locks once per token, so concurrent callers
/// interleave at token granularity. [`Chain::generate`] holds the lock for
/// its whole walk and therefore sees one consistent view of the mapping.
pub struct Chain {
	order: usize,
	state: Mutex<ChainState>,
}

impl Chain {
	/// Creates an empty chain with prefixes of `order` words.
	///
	/// The random source is seeded from the operating system. Use
	/// [`Chain::with_rng`] to inject a seeded generator instead.
	///
	/// # Notes
	/// - `order` 0 is degenerate but supported: every observation lands in
	///   a single global suffix list keyed by the empty string, and
	///   generation samples from that one list.
	pub fn new(order: usize) -> Self {
		Self::with_rng(order, StdRng::from_os_rng())
	}

	/// Creates an empty chain using the given random generator.
	///
	/// With a generator seeded via `SeedableRng::seed_from_u64`, generation
	/// output is fully determined by the mapping contents and the word
	/// budget, which makes sampling behavior testable.
	pub fn with_rng(order: usize, rng: StdRng) -> Self {
		Self {
			order,
			state: Mutex::new(ChainState { mapping: HashMap::new(), rng }),
		}
	}

	/// Rebuilds a chain from enumerated key/suffix-list pairs.
	///
	/// Re-inserting the exact pairs returned by [`Chain::entries`] yields a
	/// chain equivalent to the one they came from. Pairs with an empty
	/// suffix list are skipped so that no empty list becomes observable.
	pub fn from_entries<I>(order: usize, entries: I) -> Self
	where
		I: IntoIterator<Item = (String, Vec<String>)>,
	{
		let chain = Self::new(order);
		{
			let mut state = chain.state();
			for (key, suffixes) in entries {
				if suffixes.is_empty() {
					continue;
				}
				state.mapping.entry(key).or_default().extend(suffixes);
			}
		}
		chain
	}

	/// Returns the prefix length this chain was constructed with.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Returns the number of distinct prefix keys recorded so far.
	pub fn key_count(&self) -> usize {
		self.state().mapping.len()
	}

	/// Returns `true` if no text has been ingested yet.
	pub fn is_empty(&self) -> bool {
		self.state().mapping.is_empty()
	}

	/// Locks the chain state, recovering the guard if a holder panicked.
	///
	/// Every critical section leaves the mapping structurally sound (a
	/// single append or a read), so a poisoned lock carries no torn state.
	fn state(&self) -> MutexGuard<'_, ChainState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Ingests a text, recording each word as a suffix of the window of
	/// words that preceded it.
	///
	/// The text is split on whitespace. The window starts out all-empty,
	/// so the first word of every call is recorded under the all-empty
	/// key; generation starts from that same key, which is how generated
	/// output picks up the opening word of an ingested sequence.
	///
	/// # Parameters
	/// - `text`: Arbitrary text. Empty input is a no-op.
	///
	/// # Returns
	/// The number of words ingested.
	///
	/// # Notes
	/// - The lock is taken and released once per word, so concurrent
	///   `feed` and `generate` calls interleave between words.
	pub fn feed(&self, text: &str) -> usize {
		let mut prefix = Prefix::new(self.order);
		let mut count = 0;
		for word in text.split_whitespace() {
			let key = prefix.to_key();
			log::trace!("recording '{}' after key '{}'", word, key);
			self.state().mapping.entry(key).or_default().push(word.to_owned());
			prefix.shift(word);
			count += 1;
		}
		count
	}

	/// Ingests text from a reader, line by line.
	///
	/// Each line is fed as an independent sequence: the window resets at
	/// every line boundary, so words do not chain across lines. This is
	/// the sentence-boundary treatment corpus files get in
	/// [`Chain::from_file`].
	///
	/// # Returns
	/// The total number of words ingested.
	///
	/// # Errors
	/// Only a read failure from the underlying source. Reaching end of
	/// input is normal termination, not an error.
	pub fn feed_from<R: BufRead>(&self, reader: R) -> io::Result<usize> {
		let mut count = 0;
		for line in reader.lines() {
			count += self.feed(&line?);
		}
		Ok(count)
	}

	/// Generates at most `n` words from the chain.
	///
	/// Starts from the all-empty window and repeatedly samples one of the
	/// words recorded after the current window, sliding the window over
	/// the chosen word. A word recorded several times for the same window
	/// is proportionally more likely to be chosen.
	///
	/// # Parameters
	/// - `n`: Maximum number of words to produce. 0 yields an empty string.
	///
	/// # Returns
	/// The chosen words joined by single spaces. The result is shorter
	/// than `n` words when a window with no recorded continuation is
	/// reached, and empty when the chain is untrained. Generation never
	/// fails.
	///
	/// # Notes
	/// - The lock is held for the entire walk: one generation run sees a
	///   single consistent mapping, and blocks concurrent ingestion for
	///   its (bounded) duration.
	pub fn generate(&self, n: usize) -> String {
		let mut state = self.state();
		let ChainState { mapping, rng } = &mut *state;

		let mut prefix = Prefix::new(self.order);
		let mut words: Vec<String> = Vec::new();
		for _ in 0..n {
			let choices = match mapping.get(&prefix.to_key()) {
				Some(choices) if !choices.is_empty() => choices,
				_ => break,
			};
			let next = choices[rng.random_range(0..choices.len())].clone();
			prefix.shift(&next);
			words.push(next);
		}
		words.join(" ")
	}

	/// Enumerates every prefix key with its ordered suffix list.
	///
	/// The returned pairs are a complete copy of the chain's observations;
	/// feeding them to [`Chain::from_entries`] reconstructs an equivalent
	/// chain. Enumeration order is unspecified, suffix order within a key
	/// is the observation order.
	pub fn entries(&self) -> Vec<(String, Vec<String>)> {
		self.state()
			.mapping
			.iter()
			.map(|(key, suffixes)| (key.clone(), suffixes.clone()))
			.collect()
	}

	/// Merges another chain's observations into this one.
	///
	/// Suffix lists for matching keys are concatenated, so merged
	/// observations keep their weight. Intended for parallel corpus
	/// builds, where worker threads each build a partial chain.
	///
	/// # Errors
	/// Returns an error if the chain orders do not match.
	pub fn merge(&self, other: &Self) -> Result<(), String> {
		if self.order != other.order {
			return Err(format!(
				"Order mismatch: self={}, other={}",
				self.order, other.order
			));
		}

		let entries = other.entries();
		let mut state = self.state();
		for (key, suffixes) in entries {
			if suffixes.is_empty() {
				continue;
			}
			state.mapping.entry(key).or_default().extend(suffixes);
		}
		Ok(())
	}

	/// Writes a binary snapshot of the chain (order and full mapping).
	///
	/// Uses `postcard` for compact serialization. The random generator is
	/// not part of the snapshot; a loaded chain gets a fresh one.
	///
	/// # Errors
	/// Serialization or file write failure.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
		let snapshot = {
			let state = self.state();
			ChainSnapshot { order: self.order, mapping: state.mapping.clone() }
		};
		let bytes = postcard::to_stdvec(&snapshot)?;
		std::fs::write(path, bytes)?;
		log::debug!("saved chain snapshot ({} keys)", snapshot.mapping.len());
		Ok(())
	}

	/// Loads a chain from a binary snapshot written by [`Chain::save`].
	///
	/// # Errors
	/// File read or deserialization failure.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
		let bytes = std::fs::read(path)?;
		let snapshot: ChainSnapshot = postcard::from_bytes(&bytes)?;
		log::debug!(
			"loaded chain snapshot (order {}, {} keys)",
			snapshot.order,
			snapshot.mapping.len()
		);
		Ok(Self {
			order: snapshot.order,
			state: Mutex::new(ChainState {
				mapping: snapshot.mapping,
				rng: StdRng::from_os_rng(),
			}),
		})
	}

	/// Builds a chain from a text corpus, with a binary cache.
	///
	/// If a `.bin` snapshot of a previous build exists next to the corpus
	/// and its order matches, it is loaded directly. Otherwise the corpus
	/// is read, built in parallel and the snapshot written for future
	/// fast loading.
	///
	/// Each corpus line is ingested as an independent sequence.
	///
	/// # Errors
	/// File I/O or serialization failure while reading the corpus or
	/// handling the cache.
	pub fn from_file<P: AsRef<Path>>(path: P, order: usize) -> Result<Self, Box<dyn std::error::Error>> {
		let cache_path = build_output_path(&path, "bin")?;
		if cache_path.exists() {
			let chain = Self::load(&cache_path)?;
			if chain.order == order {
				return Ok(chain);
			}
			// Stale cache from a different order, rebuild below
		}

		let chain = Self::build_from_lines(order, read_file(&path)?)?;
		chain.save(&cache_path)?;
		Ok(chain)
	}

	/// Splits corpus lines into chunks, builds a partial chain per chunk
	/// on worker threads and merges them into the final chain.
	///
	/// # Notes
	/// - Chunk count is derived from the CPU count.
	/// - Uses MPSC channels to collect partial chains from threads.
	/// - A window never spans two lines, so chunk boundaries do not
	///   change the result.
	fn build_from_lines(order: usize, lines: Vec<String>) -> Result<Self, String> {
		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = ((lines.len() + chunks - 1) / chunks).max(1);

		let (tx, rx) = mpsc::channel();
		for chunk in lines.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();

			thread::spawn(move || {
				let partial = Chain::new(order);
				for line in &chunk {
					partial.feed(line);
				}
				tx.send(partial).expect("Failed to send from thread");
			});
		}
		drop(tx);

		let merged = Chain::new(order);
		for partial in rx.iter() {
			merged.merge(&partial)?;
		}
		log::debug!("built chain from {} lines ({} keys)", lines.len(), merged.key_count());
		Ok(merged)
	}
}
