// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Streaming baseline.
//!
//! Streams a synthetic Rust document into a [`CodePreview`] chunk by chunk,
//! the way a chat response arrives, while a simulated viewport scrolls along.
//! Prints the highlighting counters at the end.
//!
//! Usage: `baseline [config.toml]`. Set `RUST_LOG=codeview=debug` for a trace.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use codeview::{CodePreview, ColorMapper, SynopticTokenizer, ViewConfig, WorkerPool};
use tracing_subscriber::EnvFilter;

const DOCUMENT_LINES: usize = 2_000;
const CHUNK_BYTES: usize = 512;
const VIEWPORT_HEIGHT: u32 = 600;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codeview=info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match ViewConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load {path}: {err}");
                std::process::exit(1);
            }
        },
        None => ViewConfig::default(),
    };

    let tokenizer = Arc::new(SynopticTokenizer::new(config.tab_width));
    let pool = match WorkerPool::new(tokenizer, config.worker_threads) {
        Ok(pool) => Arc::new(pool),
        Err(err) => {
            eprintln!("failed to start tokenizer pool: {err}");
            std::process::exit(1);
        }
    };

    println!("=== codeview streaming baseline ===");
    println!(
        "{} lines, {} byte chunks, {} worker threads, {} ms debounce\n",
        DOCUMENT_LINES, CHUNK_BYTES, config.worker_threads, config.debounce_ms
    );

    let document = synthetic_document(DOCUMENT_LINES);
    let mut preview = CodePreview::new(config, pool.clone(), Arc::new(ColorMapper::default()));
    let started = Instant::now();
    preview.resize(VIEWPORT_HEIGHT, started);

    // Follow the tail like a chat view that sticks to the bottom.
    let mut streamed = 0;
    let mut repaints = 0;
    while streamed < document.len() {
        let end = next_boundary(&document, streamed + CHUNK_BYTES);
        let now = Instant::now();
        preview.append(&document[streamed..end], now);
        streamed = end;

        let bottom = preview.total_size().saturating_sub(VIEWPORT_HEIGHT);
        preview.scroll_to(bottom, now);
        repaints += preview.tick(now).updated.len();
        std::thread::sleep(Duration::from_millis(2));
    }
    let streaming_time = started.elapsed();

    // Let the last request fire and land.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let now = Instant::now();
        repaints += preview.tick(now).updated.len();
        if preview.scheduler().is_idle() || now > deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    // Jump back to the top and let that range highlight too.
    let now = Instant::now();
    preview.scroll_to(0, now);
    let settle = Instant::now() + Duration::from_secs(10);
    while !preview.scheduler().is_idle() && Instant::now() < settle {
        repaints += preview.tick(Instant::now()).updated.len();
        std::thread::sleep(Duration::from_millis(5));
    }

    let rows = preview.rows();
    let highlighted = rows.iter().filter(|row| row.highlighted).count();
    println!("Sample rows:");
    for row in rows.iter().take(5) {
        println!("  {}", row.to_ansi());
    }
    println!();

    println!("{}", report(&preview, streaming_time, repaints, highlighted, rows.len()));
    println!("Pool: {} jobs submitted, {} completed", pool.submitted(), pool.completed());
}

fn report(preview: &CodePreview, streaming_time: Duration, repaints: usize, highlighted: usize, rendered: usize) -> String {
    let metrics = preview.metrics();
    let mut out = String::new();
    let _ = writeln!(out, "Streaming took {:.2}s", streaming_time.as_secs_f64());
    let _ = writeln!(out, "Lines:            {}", preview.line_count());
    let _ = writeln!(out, "Watermark:        {}", preview.scheduler().watermark());
    let _ = writeln!(out, "Rendered rows:    {rendered} ({highlighted} highlighted)");
    let _ = writeln!(out, "Rows repainted:   {repaints}");
    let _ = writeln!(out, "Requests:         {}", metrics.requests);
    let _ = writeln!(out, "Commits:          {}", metrics.commits);
    let _ = writeln!(out, "Stale discards:   {}", metrics.stale_discards);
    let _ = writeln!(out, "Failures:         {}", metrics.failures);
    let _ = writeln!(out, "Rejected lines:   {}", metrics.rejected_lines);
    let _ = writeln!(out, "Lines tokenized:  {}", metrics.lines_tokenized);
    let _ = writeln!(
        out,
        "Tokenizer time:   {:.2}ms total, {}μs/line avg, {:.2}ms max call",
        metrics.total_time.as_secs_f64() * 1000.0,
        metrics.avg_time_per_line.as_micros(),
        metrics.max_call_time.as_secs_f64() * 1000.0
    );
    let _ = write!(out, "Row cache hit ratio: {:.1}%", metrics.cache_hit_ratio() * 100.0);
    out
}

/// Largest char boundary at or below `index`.
fn next_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn synthetic_document(lines: usize) -> String {
    let mut out = String::from("use std::collections::HashMap;\n\n");
    // Each entry is eight lines.
    for i in 0..lines.div_ceil(8) {
        let _ = write!(
            out,
            "/// Computes entry {i}.\n\
             pub fn entry_{i}(map: &mut HashMap<String, u64>) -> Option<u64> {{\n    \
                 let key = format!(\"key-{{}}\", {i});\n    \
                 // Bump the counter.\n    \
                 *map.entry(key.clone()).or_insert(0) += {i};\n    \
                 map.get(&key).copied()\n\
             }}\n\n"
        );
    }
    out
}
