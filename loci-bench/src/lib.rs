//! Benchmark-only crate. The suites live under `benches/`.
