//! Performance benchmarks for the network health monitor
//!
//! The latency loop parses one ping transcript per cycle and aggregates a
//! window every flush, so these are the hot paths worth watching.

use clap::Parser;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use network_health_monitor::{
    cli::Cli,
    config::parser::ConfigParser,
    models::{Config, HealthSummary, LatencyWindow},
    monitor::lowest_latency,
    probe::parse::{parse_packet_loss, parse_ping_latency},
    types::{DnsCandidate, LatencyBand, LatencyCutoffs},
};
use std::net::{IpAddr, Ipv4Addr};

const PING_REPLY: &str = "PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=23.4 ms

--- 8.8.8.8 ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms
rtt min/avg/max/mdev = 23.400/23.400/23.400/0.000 ms
";

const PING_LOSS: &str = "PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=21.0 ms
64 bytes from 8.8.8.8: icmp_seq=3 ttl=117 time=25.7 ms

--- 8.8.8.8 ping statistics ---
5 packets transmitted, 2 received, 60% packet loss, time 4005ms
";

fn sample_window(size: usize) -> LatencyWindow {
    let mut window = LatencyWindow::new();
    for i in 0..size {
        window.push(20.0 + (i % 90) as f64);
    }
    window
}

fn sample_candidates(count: usize) -> Vec<(DnsCandidate, f64)> {
    (0..count)
        .map(|i| {
            let candidate = DnsCandidate::primary(
                format!("DNS {}", i),
                IpAddr::V4(Ipv4Addr::new(10, 0, (i / 256) as u8, (i % 256) as u8)),
            );
            (candidate, 10.0 + (i * 7 % 40) as f64)
        })
        .collect()
}

/// Benchmark ping output parsing
fn benchmark_ping_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("ping_parsing");

    group.bench_function("parse_latency", |b| {
        b.iter(|| black_box(parse_ping_latency(black_box(PING_REPLY))));
    });

    group.bench_function("parse_packet_loss", |b| {
        b.iter(|| black_box(parse_packet_loss(black_box(PING_LOSS))));
    });

    group.bench_function("parse_malformed", |b| {
        b.iter(|| black_box(parse_ping_latency(black_box("ping: unknown host"))));
    });

    group.finish();
}

/// Benchmark window aggregation at typical and oversized flush periods
fn benchmark_window_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_aggregation");
    let cutoffs = LatencyCutoffs::default();

    for size in [5, 50, 500].iter() {
        let window = sample_window(*size);
        group.bench_with_input(BenchmarkId::new("summarize", size), size, |b, _| {
            b.iter(|| black_box(HealthSummary::from_window(black_box(&window), cutoffs, 0, true)));
        });
    }

    group.bench_function("classify_band", |b| {
        let averages = [None, Some(12.0), Some(50.0), Some(99.9), Some(250.0)];
        b.iter(|| {
            for avg in averages {
                black_box(LatencyBand::classify(black_box(avg), cutoffs));
            }
        });
    });

    group.finish();
}

/// Benchmark candidate ranking over measured latencies
fn benchmark_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");

    for count in [6, 64].iter() {
        let measured = sample_candidates(*count);
        group.bench_with_input(BenchmarkId::new("lowest_latency", count), count, |b, _| {
            b.iter(|| {
                let best = lowest_latency(measured.iter().map(|(c, ms)| (c, *ms)));
                black_box(best);
            });
        });
    }

    group.finish();
}

/// Benchmark configuration loading
fn benchmark_config(c: &mut Criterion) {
    let mut group = c.benchmark_group("config");

    group.bench_function("validate_default", |b| {
        let config = Config::default();
        b.iter(|| black_box(config.validate()));
    });

    group.bench_function("parse_from_cli", |b| {
        let cli = Cli::parse_from([
            "nhm",
            "--env-file", "/nonexistent/nhm.env",
            "--poll-interval", "500",
            "--dns", "Google=8.8.8.8",
            "--dns", "Quad9=9.9.9.9",
        ]);
        b.iter(|| {
            let parser = ConfigParser::new(black_box(cli.clone()));
            black_box(parser.parse())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_ping_parsing,
    benchmark_window_aggregation,
    benchmark_ranking,
    benchmark_config
);
criterion_main!(benches);
