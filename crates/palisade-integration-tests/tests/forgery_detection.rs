//! End-to-end exchange over real sockets.
//!
//! Whole nodes on loopback: UDP discovery through a single seed, HTTP
//! delivery, audit files checked afterwards. Role assignment follows the
//! ephemeral HTTP ports, so each test sorts its nodes by port before
//! deciding which audit file belongs to whom.

use std::time::Duration;

use palisade_integration_tests::test_config;
use palisade_node::Node;
use palisade_protocol::ReceivePolicy;
use tokio::time::timeout;

fn pid_of(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn three_nodes_detect_the_forgery() {
    let dir = tempfile::tempdir().unwrap();

    // One passive seed; the others announce to its discovery socket.
    let node_a = Node::bind(test_config(dir.path().join("a.log"), vec![]))
        .await
        .unwrap();
    let seed = node_a.discovery_addr();
    let node_b = Node::bind(test_config(dir.path().join("b.log"), vec![seed]))
        .await
        .unwrap();
    let node_c = Node::bind(test_config(dir.path().join("c.log"), vec![seed]))
        .await
        .unwrap();

    let port_a = node_a.local_addr().unwrap().port();
    let port_b = node_b.local_addr().unwrap().port();
    let port_c = node_c.local_addr().unwrap().port();

    let run_a = tokio::spawn(node_a.run());
    let run_b = tokio::spawn(node_b.run());
    let run_c = tokio::spawn(node_c.run());

    timeout(Duration::from_secs(30), async {
        run_a.await.unwrap().unwrap();
        run_b.await.unwrap().unwrap();
        run_c.await.unwrap().unwrap();
    })
    .await
    .expect("nodes did not finish the exchange");

    // Lowest HTTP port signs, second verifies, the rest forge.
    let mut order = vec![(port_a, "a"), (port_b, "b"), (port_c, "c")];
    order.sort();
    let signer_pid = pid_of(order[0].0);
    let verifier_pid = pid_of(order[1].0);

    let read = |name: &str| {
        std::fs::read_to_string(dir.path().join(format!("{}.log", name))).unwrap()
    };

    let verifier_log = read(order[1].1);
    assert_eq!(verifier_log.matches("WELCOME!!").count(), 1);
    assert_eq!(
        verifier_log.matches("INTRUDER ALERT!!! Posing as:").count(),
        1
    );
    assert!(verifier_log.contains(&format!("WELCOME!!  {}", signer_pid)));
    assert!(verifier_log.contains(&format!("INTRUDER ALERT!!! Posing as:  {}", signer_pid)));

    let signer_log = read(order[0].1);
    assert!(signer_log.contains(&format!("RECEIVE_SIGNED to  {}", verifier_pid)));
    assert!(signer_log.contains("Receiver acknowledged"));

    // The forger claims the signer's PID in its own envelope.
    let forger_log = read(order[2].1);
    assert!(forger_log.contains(&format!("RECEIVE_SIGNED to  {}", verifier_pid)));
    assert!(forger_log.contains(&format!("Sender:  {}", signer_pid)));

    for name in ["a", "b", "c"] {
        let log = read(name);
        assert!(log.contains("### Discovery Complete and Locked. Participant list is:"));
        assert!(log.contains(&format!("[0]  {}", signer_pid)));
        assert!(log.contains("Cleanup complete... Exiting process"));
    }

    // HTTP servers outlive run(); the verifier should report a locked
    // three-member roster resting in cleanup.
    let client = reqwest::Client::new();
    let status: serde_json::Value = client
        .get(format!("{}/", verifier_pid))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["locked"], true);
    assert_eq!(status["phase"], "CLEANUP");
    assert_eq!(status["role"], "verifier");
    assert_eq!(status["participants"].as_array().unwrap().len(), 3);
    assert_eq!(status["participants"][0]["pid"], signer_pid);
}

#[tokio::test]
async fn two_nodes_run_the_honest_exchange() {
    let dir = tempfile::tempdir().unwrap();

    let mut config_a = test_config(dir.path().join("a.log"), vec![]);
    config_a.receive_policy = ReceivePolicy::CleanupAfter(1);
    let node_a = Node::bind(config_a).await.unwrap();
    let seed = node_a.discovery_addr();

    let mut config_b = test_config(dir.path().join("b.log"), vec![seed]);
    config_b.receive_policy = ReceivePolicy::CleanupAfter(1);
    let node_b = Node::bind(config_b).await.unwrap();

    let port_a = node_a.local_addr().unwrap().port();
    let port_b = node_b.local_addr().unwrap().port();

    let run_a = tokio::spawn(node_a.run());
    let run_b = tokio::spawn(node_b.run());

    timeout(Duration::from_secs(30), async {
        run_a.await.unwrap().unwrap();
        run_b.await.unwrap().unwrap();
    })
    .await
    .expect("nodes did not finish the exchange");

    let mut order = vec![(port_a, "a"), (port_b, "b")];
    order.sort();
    let signer_pid = pid_of(order[0].0);

    let verifier_log =
        std::fs::read_to_string(dir.path().join(format!("{}.log", order[1].1))).unwrap();
    assert!(verifier_log.contains(&format!("WELCOME!!  {}", signer_pid)));
    assert_eq!(verifier_log.matches("INTRUDER ALERT!!! Posing as:").count(), 0);
}

#[tokio::test]
async fn garbage_signature_is_discarded_and_answered_ok() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::bind(test_config(dir.path().join("solo.log"), vec![]))
        .await
        .unwrap();
    let port = node.local_addr().unwrap().port();
    let run = tokio::spawn(node.run());

    // Hit the wire endpoint while the discovery window is still open.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/RECEIVE_SIGNED", port))
        .query(&[
            ("senderPID", "http://127.0.0.1:1"),
            ("plainText", "Go Ducks!"),
            ("signature", "zz"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");

    let status: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["phase"], "INIT");
    assert_eq!(status["locked"], false);
    assert_eq!(status["pid"], pid_of(port));

    // Alone in the roster the node cannot lock and aborts.
    let result = timeout(Duration::from_secs(10), run).await.unwrap().unwrap();
    assert!(result.is_err());

    let log = std::fs::read_to_string(dir.path().join("solo.log")).unwrap();
    assert!(log.contains("Discarding envelope:"));
    assert!(log.contains("Aborting, roster cannot lock:"));
}
