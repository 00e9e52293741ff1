//! §8 scenario S3: losing a link forces recomputed paths onto the
//! surviving topology rather than continuing to point through a dead
//! link.

use mesh_core::model::{Adjacency, Lsa};
use mesh_topology::lsdb::LinkStateDb;
use mesh_topology::routing::shortest_path;

#[test]
fn path_reroutes_once_the_direct_link_lsa_is_withdrawn() {
    let mut lsdb = LinkStateDb::new();

    lsdb.offer(Lsa::new("a", 1, vec![Adjacency { neighbor_id: "b".into(), cost: 1.0 }]));
    lsdb.offer(Lsa::new(
        "b",
        2,
        vec![Adjacency { neighbor_id: "a".into(), cost: 1.0 }, Adjacency { neighbor_id: "c".into(), cost: 1.0 }],
    ));
    lsdb.offer(Lsa::new("c", 1, vec![Adjacency { neighbor_id: "b".into(), cost: 1.0 }]));

    let graph = lsdb.adjacency_graph();
    let direct = shortest_path(&graph, "a", "c", 8).expect("a path to c should exist through b");
    assert_eq!(direct.nodes, vec!["a", "b", "c"]);

    // "b" withdraws its link to "c" — a fresh, higher-version LSA without
    // that adjacency supersedes the old one.
    lsdb.offer(Lsa::new("b", 3, vec![Adjacency { neighbor_id: "a".into(), cost: 1.0 }]));
    let graph = lsdb.adjacency_graph();
    assert!(shortest_path(&graph, "a", "c", 8).is_none(), "c should be unreachable once b drops the link");
}
