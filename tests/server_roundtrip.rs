//! Client/server round trips over real sockets.

use acdat::automaton::{SearchMode, Traversal};
use acdat::dat::{Trie, TrieOptions};
use acdat::server::{Endpoint, Listener, SearchClient, SearchServer, ServerConfig};
use std::sync::Arc;
use std::thread;

fn start(endpoint: &Endpoint) -> (Arc<SearchServer>, Endpoint, thread::JoinHandle<()>) {
    let mut trie = Trie::new(TrieOptions::default());
    trie.insert_with_data("he", b"pronoun").unwrap();
    trie.insert_with_data("she", b"").unwrap();
    trie.insert("his").unwrap();
    trie.insert_with_data("hers", "😀".as_bytes()).unwrap();
    trie.insert("naïve").unwrap();

    let config = ServerConfig {
        workers: 2,
        cache_size: 8,
        ..ServerConfig::default()
    };
    let server = SearchServer::new(Arc::new(trie.freeze(Traversal::Bfs)), config);
    let listener = Listener::bind(endpoint, 16).unwrap();
    let bound = listener.local_endpoint().unwrap();

    let handle = {
        let server = Arc::clone(&server);
        thread::spawn(move || server.serve(listener).unwrap())
    };
    (server, bound, handle)
}

fn needles(client: &mut SearchClient, text: &str, bits: u8) -> Vec<String> {
    client
        .query(text.as_bytes(), SearchMode(bits | SearchMode::NEEDLE))
        .unwrap()
        .into_iter()
        .map(|o| o.needle.unwrap())
        .collect()
}

#[test]
fn test_tcp_roundtrip() {
    let endpoint = Endpoint::tcp("127.0.0.1", 0).unwrap();
    let (server, bound, handle) = start(&endpoint);

    let mut client = SearchClient::connect(&bound).unwrap();
    assert_eq!(needles(&mut client, "ahishers", SearchMode::ALL), ["his", "she", "he", "hers"]);
    assert_eq!(needles(&mut client, "ahishers", SearchMode::FIRST), ["his"]);
    assert!(needles(&mut client, "nothing here", SearchMode::EXACT).is_empty());
    assert_eq!(needles(&mut client, "naïve", SearchMode::EXACT), ["naïve"]);

    // Same connection keeps working after an empty and a FIRST response
    let found = client
        .query(b"hers", SearchMode(SearchMode::USER_DATA | SearchMode::EXACT))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].user_data, "😀".as_bytes());
    assert!(found[0].needle.is_none());

    // Invalid UTF-8 is answered, not dropped
    assert!(client.query(b"he\xff", SearchMode(SearchMode::ALL)).unwrap().is_empty());
    assert!(client.contains("she").unwrap());

    drop(client);
    server.shutdown();
    handle.join().unwrap();
    assert!(server.queries_served() >= 7);
}

#[test]
fn test_unix_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acdat.sock");
    let (server, bound, handle) = start(&Endpoint::unix(&path));

    let mut clients: Vec<SearchClient> = (0..3).map(|_| SearchClient::connect(&bound).unwrap()).collect();
    for client in &mut clients {
        let found = client
            .query(b"ushe", SearchMode(SearchMode::USER_DATA | SearchMode::NEEDLE))
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].needle.as_deref(), Some("she"));
        assert!(found[0].user_data.is_empty());
        assert_eq!(found[1].user_data, b"pronoun");
    }

    drop(clients);
    server.shutdown();
    handle.join().unwrap();
    assert!(!path.exists());
    assert!(server.cache_hit_rate() > 0.0);
}
