//! Example: retrying an unreliable call with backoff and cancellation
//!
//! This example demonstrates:
//! 1. Simple retry with exponential backoff
//! 2. A retry predicate that only retries transient errors
//! 3. A deadline cutting a retry sequence short
//! 4. The backoff schedule itself
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run -p rebound-core --example retry_example
//! ```

use rebound_core::prelude::*;
use std::error::Error;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// A simulated API that fails the first few times
struct UnreliableApi {
    attempts: AtomicU32,
    fail_count: u32,
    kind: ErrorKind,
}

impl UnreliableApi {
    fn new(fail_count: u32, kind: ErrorKind) -> Self {
        Self {
            attempts: AtomicU32::new(0),
            fail_count,
            kind,
        }
    }

    async fn call(&self) -> Result<String, std::io::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if attempt <= self.fail_count {
            println!("  Attempt {attempt}: FAILED ({:?})", self.kind);
            Err(std::io::Error::new(self.kind, format!("failure on attempt {attempt}")))
        } else {
            println!("  Attempt {attempt}: SUCCESS");
            Ok("API response data".to_string())
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

fn is_transient(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::ConnectionReset)
}

/// Example 1: Simple retry with exponential backoff
async fn example_simple_retry() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Simple Retry with Exponential Backoff ===\n");

    let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(2), 2.0)?;
    let config = RetryConfig::new(policy, 5);
    let api = UnreliableApi::new(2, ErrorKind::TimedOut);

    let start = Instant::now();
    let result = run_with_retry(
        &CancellationSignal::new(),
        &config,
        || api.call(),
        is_transient,
    )
    .await?;

    println!("\nResult: {result}");
    println!("Total attempts: {}", api.total_attempts());
    println!("Total time: {:?}", start.elapsed());
    println!("Expected delays: 100ms + 200ms = ~300ms");

    Ok(())
}

/// Example 2: Non-transient errors are returned immediately
async fn example_predicate() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: Retry Predicate (Transient Errors Only) ===\n");

    let api = UnreliableApi::new(2, ErrorKind::PermissionDenied);

    let result = run_with_retry(
        &CancellationSignal::new(),
        &RetryConfig::default(),
        || api.call(),
        is_transient,
    )
    .await;

    match result {
        Err(RetryError::Attempt(err)) => println!("\nNot retried: {err}"),
        other => println!("\nUnexpected outcome: {other:?}"),
    }
    println!("Total attempts: {}", api.total_attempts());

    Ok(())
}

/// Example 3: A deadline stops an endless retry sequence
async fn example_deadline() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 3: Deadline ===\n");

    let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_millis(400), 2.0)?;
    let config = RetryConfig::unlimited(policy);
    let signal = CancellationSignal::new().with_timeout(Duration::from_secs(1));
    let api = UnreliableApi::new(u32::MAX, ErrorKind::ConnectionReset);

    let result = run_with_retry(&signal, &config, || api.call(), is_transient).await;

    if let Err(err) = result {
        println!("\nStopped: {err}");
        println!("Attempts before the deadline: {:?}", err.attempts());
    }

    Ok(())
}

/// Example 4: The pause schedule, with and without jitter
fn example_schedule() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 4: Backoff Schedule ===\n");

    let plain = BackoffPolicy::default();
    let jittered = BackoffPolicy::builder().jitter(0.2).build()?;

    for attempt in 1..=8 {
        println!(
            "  after attempt {attempt}: {:>10?} (jittered: {:?})",
            plain.pause(attempt),
            jittered.jittered_pause(attempt)
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    example_simple_retry().await?;
    example_predicate().await?;
    example_deadline().await?;
    example_schedule()?;

    Ok(())
}
