//! kafka_demo E2E Test Suite Orchestrator
//!
//! Runs the E2E tests in order:
//! 1. Negative tests (no broker needed)
//! 2. Basic publish (fan-out across groups)
//! 3. Partition tests
//! 4. Filter tests
//! 5. The full demo run
//!
//! ## Usage
//!
//! ```bash
//! # Run all tests
//! cargo run --release -p kafka_test
//!
//! # With a different broker
//! KAFKA_BOOTSTRAP_SERVERS="broker:9092" cargo run --release -p kafka_test
//! ```
//!
//! ## Exit Codes
//!
//! - 0: All tests passed
//! - 1: One or more tests failed, or the broker is not reachable

use kafka_test::setup::verify_server_ready;
use kafka_test::{
    test_basic_fanout, test_connection_refused, test_demo_run, test_filter_discards_world,
    test_invalid_partition_rejected, test_latch_timeout_is_explicit, test_partition_binding,
};

/// Test suite result tracking
struct TestSuiteResults {
    passed: usize,
    failed: usize,
    results: Vec<(&'static str, &'static str, bool)>, // (category, name, passed)
}

impl TestSuiteResults {
    fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    fn record(&mut self, category: &'static str, name: &'static str, passed: bool) {
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push((category, name, passed));
    }

    fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("TEST SUITE SUMMARY");
        println!("{}\n", "=".repeat(60));

        let mut current_category = "";
        for (category, name, passed) in &self.results {
            if *category != current_category {
                if !current_category.is_empty() {
                    println!();
                }
                println!("{}:", category);
                current_category = category;
            }
            let status = if *passed { "✅ PASSED" } else { "❌ FAILED" };
            println!("  {} - {}", name, status);
        }

        println!("\n{}", "-".repeat(60));
        println!(
            "Total: {} passed, {} failed, {} total",
            self.passed,
            self.failed,
            self.passed + self.failed
        );

        if self.failed == 0 {
            println!("\n✅ ALL TESTS PASSED");
        } else {
            println!("\n❌ SOME TESTS FAILED");
        }
    }
}

/// Run a single test and record the result
macro_rules! run_test {
    ($results:expr, $category:expr, $name:expr, $test_fn:expr) => {{
        let result = $test_fn.await;
        let passed = result.is_ok();
        if let Err(e) = &result {
            println!("❌ Test failed: {}", e);
        }
        $results.record($category, $name, passed);
        passed
    }};
}

fn section(title: &str) {
    println!("┌────────────────────────────────────────────────────────────┐");
    println!("│ {:<58} │", title);
    println!("└────────────────────────────────────────────────────────────┘\n");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║           kafka_demo E2E Test Suite                        ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    let mut results = TestSuiteResults::new();

    section("NEGATIVE TESTS");
    run_test!(results, "Negative", "Connection Refused", test_connection_refused());
    run_test!(results, "Negative", "Latch Timeout", test_latch_timeout_is_explicit());

    if let Err(e) = verify_server_ready().await {
        println!("❌ Broker not reachable: {}", e);
        results.print_summary();
        std::process::exit(1);
    }

    section("BASIC PUBLISH TESTS");
    run_test!(results, "Basic", "Group Fan-out", test_basic_fanout());

    section("PARTITION TESTS");
    run_test!(results, "Partition", "Partition Binding", test_partition_binding());
    run_test!(results, "Partition", "Invalid Partition", test_invalid_partition_rejected());

    section("FILTER TESTS");
    run_test!(results, "Filter", "Discard Predicate", test_filter_discards_world());

    section("DEMO");
    run_test!(results, "Demo", "Full Run", test_demo_run());

    // ==================== SUMMARY ====================
    results.print_summary();

    if results.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
