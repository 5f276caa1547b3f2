/* demos/demo.rs */

use ipgate::{GateOptions, IpGate, RequestInfo, get_client_ip, make_gate};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ipgate=trace"))
        .init();

    println!("=== IP Gate Examples ===\n");

    // Example 1: Peer address only
    example_1_peer_address();

    // Example 2: Forwarding headers
    example_2_forwarded();

    // Example 3: Address clean-up
    example_3_cleanup();

    // Example 4: Whitelist
    example_4_whitelist();

    // Example 5: Blacklist
    example_5_blacklist();

    println!("=== All examples completed! ===");
}

fn example_1_peer_address() {
    println!("Example 1: Peer address only");

    let req = RequestInfo::new().with_connection_address("192.0.2.123");
    println!("Resolved: {:?}", get_client_ip(&req, false));
    println!();
}

fn example_2_forwarded() {
    println!("Example 2: Forwarding headers");

    let req = RequestInfo::new()
        .with_connection_address("10.0.0.5")
        .with_header("X-Forwarded-For", "203.0.113.1, 192.168.1.10, 10.0.0.5");

    println!("Headers ignored:  {:?}", get_client_ip(&req, false));
    println!("Headers trusted:  {:?}", get_client_ip(&req, true));
    println!();
}

fn example_3_cleanup() {
    println!("Example 3: Address clean-up");

    let mapped = RequestInfo::new().with_connection_address("::ffff:198.51.100.42");
    println!("IPv4-mapped peer: {:?}", get_client_ip(&mapped, false));

    let with_port = RequestInfo::new().with_header("x-forwarded-for", "172.16.0.5:4500");
    println!("Port appended:    {:?}", get_client_ip(&with_port, true));
    println!();
}

fn example_4_whitelist() {
    println!("Example 4: Whitelist");

    let gate = IpGate::new(["203.0.113.45"], GateOptions::default());
    for peer in ["203.0.113.45", "198.51.100.1"] {
        let req = RequestInfo::new().with_connection_address(peer);
        println!("{peer:<15} -> {:?}", gate.check(&req));
    }
    println!();
}

fn example_5_blacklist() {
    println!("Example 5: Blacklist");

    let handler = make_gate("203.0.113.45", GateOptions::new().allow(false));
    for peer in ["203.0.113.45", "198.51.100.1"] {
        let req = RequestInfo::new().with_connection_address(peer);
        println!("{peer:<15} -> {:?}", handler(&req));
    }
    println!();
}
