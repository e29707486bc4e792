//! Measures the actual over/under-sleep of the three hosttick delay variants
//! on this host, with and without the raised timer resolution. Useful when
//! tuning a frame loop: the residual error of `accurate` is what the loop
//! can stop compensating for.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use hosttick::Ticker;

#[derive(Debug, Parser)]
#[command(about = "Measure hosttick sleep accuracy on this host")]
struct Args {
    /// Iterations per variant/request pair.
    #[arg(long, default_value_t = 200)]
    iterations: u32,

    /// Requested delays to measure, in microseconds.
    #[arg(long, value_delimiter = ',', default_value = "500,1000,2000,5000,16667")]
    micros: Vec<u64>,

    /// Skip raising the OS timer resolution first, measuring the default
    /// scheduler granularity instead.
    #[arg(long)]
    no_raise: bool,

    /// Also demonstrate suspend/resume exclusion of paused wall time.
    #[arg(long)]
    suspend_demo: bool,
}

struct Stats {
    min_us: i64,
    mean_us: f64,
    max_us: i64,
}

fn measure(iterations: u32, micros: u64, sleep: impl Fn(u64)) -> Stats {
    let mut min_us = i64::MAX;
    let mut max_us = i64::MIN;
    let mut total_us = 0i64;
    for _ in 0..iterations {
        let start = Instant::now();
        sleep(micros);
        let error_us = start.elapsed().as_micros() as i64 - micros as i64;
        min_us = min_us.min(error_us);
        max_us = max_us.max(error_us);
        total_us += error_us;
    }
    Stats {
        min_us,
        mean_us: total_us as f64 / f64::from(iterations),
        max_us,
    }
}

fn suspend_demo(ticker: &Ticker) {
    let before = ticker.now();
    ticker.set_timing_enabled(false);
    std::thread::sleep(Duration::from_millis(250));
    ticker.set_timing_enabled(true);
    let leaked_ticks = ticker.now() - before;
    let leaked_us = leaked_ticks as u128 * 1_000_000 / u128::from(ticker.frequency());
    println!("suspend demo: 250 ms wall pause leaked {leaked_us} us of counted time");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let ticker = Ticker::global().context("probe the monotonic counter")?;

    println!(
        "counter: {:?} at {} ticks/sec, high-res timer: {}, resolution raised: {}",
        ticker.counter_source(),
        ticker.frequency(),
        ticker.has_high_res_timer(),
        !args.no_raise,
    );

    if !args.no_raise {
        hosttick::raise_timer_resolution().context("raise timer resolution")?;
    }

    println!(
        "{:<14} {:>10} {:>12} {:>12} {:>12}",
        "variant", "req us", "min err us", "mean err us", "max err us"
    );
    let variants: [(&str, fn(&Ticker, u64)); 3] = [
        ("accurate", Ticker::sleep_accurate),
        ("over-biased", Ticker::sleep_over_biased),
        ("under-biased", Ticker::sleep_under_biased),
    ];
    for &request in &args.micros {
        for (name, sleep) in variants {
            let stats = measure(args.iterations, request, |micros| sleep(ticker, micros));
            println!(
                "{:<14} {:>10} {:>12} {:>12.1} {:>12}",
                name, request, stats.min_us, stats.mean_us, stats.max_us
            );
        }
    }

    if args.suspend_demo {
        suspend_demo(ticker);
    }

    if !args.no_raise {
        hosttick::restore_timer_resolution();
    }
    Ok(())
}
