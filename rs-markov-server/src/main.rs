use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{get, post, put, web, App, HttpResponse, HttpServer, Responder};

use clap::Parser;
use log::{info, warn};
use serde::Deserialize;

use rs_markov_core::io::list_files;
use rs_markov_core::model::chain::Chain;

/// Word budget used when `/v1/generate` is called without one.
const DEFAULT_WORDS: usize = 100;

/// Base name of the snapshot restored at startup and written by `/v1/save`.
const SNAPSHOT_NAME: &str = "chain";

/// Command-line configuration for the chain server.
#[derive(Parser, Clone)]
#[command(name = "rs-markov-server", about = "HTTP front end for the word chain")]
struct Config {
	/// Address to bind
	#[arg(long, default_value = "127.0.0.1")]
	host: String,

	/// Port to bind
	#[arg(long, default_value_t = 5000)]
	port: u16,

	/// Directory holding corpora (.txt) and chain snapshots (.bin)
	#[arg(long, default_value = "./data")]
	data_dir: PathBuf,

	/// Prefix length used when starting with a fresh chain
	#[arg(long, default_value_t = 2)]
	order: usize,

	/// Log level filter (error, warn, info, debug, trace)
	#[arg(long, default_value = "info")]
	log_level: String,
}

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	words: Option<usize>,
}

#[derive(Deserialize)]
struct CorpusQuery {
	names: Option<String>,
}

#[derive(Deserialize)]
struct SaveQuery {
	name: Option<String>,
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates at most `words` words from the shared chain and returns them
/// as the response body. An untrained chain yields an empty body.
#[get("/v1/generate")]
async fn get_generated(chain: web::Data<Chain>, query: web::Query<GenerateParams>) -> impl Responder {
	let words = query.words.unwrap_or(DEFAULT_WORDS);
	HttpResponse::Ok().body(chain.generate(words))
}

/// HTTP PUT endpoint `/v1/feed`
///
/// Ingests the raw request body as training text.
#[put("/v1/feed")]
async fn put_feed(chain: web::Data<Chain>, body: String) -> impl Responder {
	let count = chain.feed(&body);
	HttpResponse::Ok().body(format!("Ingested {} words", count))
}

#[get("/v1/corpora")]
async fn get_corpora(config: web::Data<Config>) -> impl Responder {
	match list_files(&config.data_dir, "txt") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n").replace(".txt", "")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list corpora"),
	}
}

/// HTTP PUT endpoint `/v1/load`
///
/// Builds the named corpora from the data directory and merges them into
/// the running chain. Loading only ever adds observations.
#[put("/v1/load")]
async fn put_load(
	chain: web::Data<Chain>,
	config: web::Data<Config>,
	query: web::Query<CorpusQuery>,
) -> impl Responder {
	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};

	let corpus_names: Vec<&str> = query_names
		.split(',')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();

	for name in corpus_names {
		let corpus_path = config.data_dir.join(format!("{}.txt", name));
		let partial = match Chain::from_file(&corpus_path, chain.order()) {
			Ok(partial) => partial,
			Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load corpus: {e}")),
		};
		match chain.merge(&partial) {
			Ok(_) => (),
			Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to merge corpus: {e}")),
		}
	}

	HttpResponse::Ok().body("Corpora loaded successfully")
}

/// HTTP POST endpoint `/v1/save`
///
/// Writes a binary snapshot of the chain into the data directory, where
/// the next server start picks it up.
#[post("/v1/save")]
async fn post_save(
	chain: web::Data<Chain>,
	config: web::Data<Config>,
	query: web::Query<SaveQuery>,
) -> impl Responder {
	let name = query.name.as_deref().unwrap_or(SNAPSHOT_NAME);
	let path = config.data_dir.join(format!("{}.bin", name));
	match chain.save(&path) {
		Ok(_) => HttpResponse::Ok().body("Chain saved successfully"),
		Err(e) => HttpResponse::InternalServerError().body(format!("Failed to save chain: {e}")),
	}
}

#[get("/v1/stats")]
async fn get_stats(chain: web::Data<Chain>) -> impl Responder {
	HttpResponse::Ok().body(format!("order: {}\nkeys: {}", chain.order(), chain.key_count()))
}

/// Main entry point for the server.
///
/// Restores the chain snapshot from the data directory when one exists,
/// otherwise starts with a fresh chain of the configured order, then
/// serves the REST endpoints. The chain's own lock is the serialization
/// point, so no wrapper lock is needed around the shared state.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	let config = Config::parse();

	env_logger::Builder::from_default_env()
		.filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
		.init();

	let snapshot_path = config.data_dir.join(format!("{}.bin", SNAPSHOT_NAME));
	let chain = if snapshot_path.exists() {
		match Chain::load(&snapshot_path) {
			Ok(chain) => {
				info!(
					"restored chain snapshot (order {}, {} keys)",
					chain.order(),
					chain.key_count()
				);
				chain
			}
			Err(e) => {
				warn!("failed to restore snapshot ({}), starting empty", e);
				Chain::new(config.order)
			}
		}
	} else {
		Chain::new(config.order)
	};

	let shared_chain = web::Data::new(chain);
	let shared_config = web::Data::new(config.clone());

	info!("listening on {}:{}", config.host, config.port);
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_chain.clone())
			.app_data(shared_config.clone())
			.service(get_generated)
			.service(put_feed)
			.service(get_corpora)
			.service(put_load)
			.service(post_save)
			.service(get_stats)
	})
		.bind((config.host.clone(), config.port))?
		.run()
		.await
}
