use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use rs_markov_core::model::chain::Chain;

/// Per-test scratch directory under the system temp dir.
fn scratch_dir(test: &str) -> PathBuf {
	let dir = std::env::temp_dir().join(format!("rs-markov-tests-{}", std::process::id())).join(test);
	fs::create_dir_all(&dir).expect("failed to create scratch dir");
	dir
}

fn mapping_of(chain: &Chain) -> HashMap<String, Vec<String>> {
	chain.entries().into_iter().collect()
}

#[test]
fn snapshot_round_trips_through_save_and_load() {
	let chain = Chain::new(2);
	chain.feed("the quick brown fox jumps over the lazy dog");

	let path = scratch_dir("snapshot").join("chain.bin");
	chain.save(&path).expect("save failed");

	let loaded = Chain::load(&path).expect("load failed");
	assert_eq!(loaded.order(), chain.order());
	assert_eq!(mapping_of(&loaded), mapping_of(&chain));

	// A loaded chain keeps generating
	assert!(!loaded.generate(5).is_empty());
}

#[test]
fn feed_from_treats_lines_as_independent_sequences() {
	let chain = Chain::new(1);
	let count = chain.feed_from(Cursor::new("a b\nc d\n")).expect("read failed");
	assert_eq!(count, 4);

	let mapping = mapping_of(&chain);
	// Both line openers land under the all-empty key
	assert_eq!(mapping[""], vec!["a", "c"]);
	assert_eq!(mapping["a"], vec!["b"]);
	// The window reset at the line boundary: "b" never chained into "c"
	assert!(!mapping.contains_key("b"));
}

#[test]
fn from_file_builds_and_caches_a_chain() {
	let dir = scratch_dir("from_file");
	let corpus = dir.join("corpus.txt");
	fs::write(&corpus, "alpha beta\nalpha gamma\n").expect("failed to write corpus");

	let chain = Chain::from_file(&corpus, 1).expect("build failed");
	assert_eq!(chain.order(), 1);

	let mapping = mapping_of(&chain);
	// Partial chains merge in nondeterministic order, so compare contents,
	// not positions.
	assert_eq!(mapping[""], vec!["alpha", "alpha"]);
	let mut followers = mapping["alpha"].clone();
	followers.sort();
	assert_eq!(followers, vec!["beta", "gamma"]);

	// The binary cache was written next to the corpus and reloads equal
	assert!(dir.join("corpus.bin").exists());
	let cached = Chain::from_file(&corpus, 1).expect("cache load failed");
	assert_eq!(mapping_of(&cached), mapping);
}

#[test]
fn from_file_rebuilds_when_the_cached_order_differs() {
	let dir = scratch_dir("stale_cache");
	let corpus = dir.join("corpus.txt");
	fs::write(&corpus, "one two three\n").expect("failed to write corpus");

	let first = Chain::from_file(&corpus, 1).expect("build failed");
	assert_eq!(first.order(), 1);

	let rebuilt = Chain::from_file(&corpus, 2).expect("rebuild failed");
	assert_eq!(rebuilt.order(), 2);
	assert_eq!(mapping_of(&rebuilt)["one two"], vec!["three"]);
}

#[test]
fn from_file_accepts_an_empty_corpus() {
	let dir = scratch_dir("empty_corpus");
	let corpus = dir.join("corpus.txt");
	fs::write(&corpus, "").expect("failed to write corpus");

	let chain = Chain::from_file(&corpus, 2).expect("build failed");
	assert!(chain.is_empty());
	assert_eq!(chain.generate(5), "");
}

#[test]
fn generated_text_opens_with_a_corpus_line_opener() {
	let chain = Chain::new(2);
	chain.feed_from(Cursor::new("tell me a story\nsing me a song\n")).expect("read failed");

	for _ in 0..20 {
		let output = chain.generate(10);
		let first = output.split_whitespace().next().expect("trained chain generated nothing");
		assert!(first == "tell" || first == "sing", "unexpected opener {:?}", first);
	}
}
