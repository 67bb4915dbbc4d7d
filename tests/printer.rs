//! Status table, detailed dump and visualization output.

mod common;

use envoy_types::pb::envoy::admin::v3::{ClustersConfigDump, RoutesConfigDump};
use envoy_types::pb::envoy::service::status::v3::{
    per_xds_config::PerXdsConfig as Dump, ClientConfig, ConfigStatus,
};

use common::responses::{layered_client, node, per_xds, response, unsynced_client};
use csds_client::config::DumpTarget;
use csds_client::csds::classify::{FilterMode, NodeFilter};
use csds_client::csds::printer::{header, PrintOutcome, StatusPrinter};
use csds_client::graph::{NoBrowser, Visualizer, GRAPH_FILE};

fn row(id: &str, stream_type: &str, status: &str) -> String {
    format!("{:<50} {:<30} {:<30} \n", id, stream_type, status)
}

fn output(printer: StatusPrinter<Vec<u8>>) -> String {
    String::from_utf8(printer.into_inner()).unwrap()
}

fn stale_client(id: &str) -> ClientConfig {
    ClientConfig {
        node: Some(node(id, "ADS")),
        xds_config: vec![
            per_xds(ConfigStatus::Stale, Dump::RouteConfig(RoutesConfigDump::default())),
            per_xds(ConfigStatus::Stale, Dump::ClusterConfig(ClustersConfigDump::default())),
        ],
        ..Default::default()
    }
}

#[test]
fn three_unsynced_clients_print_na_rows() {
    let mut printer = StatusPrinter::new(Vec::new());
    let outcome = printer
        .print_response(&response(vec![
            unsynced_client("node-1"),
            unsynced_client("node-2"),
            unsynced_client("node-3"),
        ]))
        .unwrap();

    assert_eq!(outcome, PrintOutcome { rows: 3, dumped: false });
    let expected = [
        header(),
        row("node-1", "ADS", "N/A"),
        row("node-2", "ADS", "N/A"),
        row("node-3", "ADS", "N/A"),
    ]
    .concat();
    assert_eq!(output(printer), expected);
}

#[test]
fn stale_statuses_use_continuation_rows_and_dump_once() {
    let mut printer = StatusPrinter::new(Vec::new());
    let outcome = printer.print_response(&response(vec![stale_client("node-1")])).unwrap();

    assert_eq!(outcome, PrintOutcome { rows: 2, dumped: true });
    let text = output(printer);
    let table = [header(), row("node-1", "ADS", "RDS   STALE"), row("", "", "CDS   STALE")].concat();
    assert!(text.starts_with(&table));
    assert_eq!(text.matches("Detailed Config:").count(), 1);

    let dump = text.split_once("Detailed Config:\n").unwrap().1;
    let json: serde_json::Value = serde_json::from_str(dump).unwrap();
    assert_eq!(json["config"][0]["node"]["id"], "node-1");
    assert_eq!(json["config"][0]["xdsConfig"][1]["status"], "STALE");
}

#[test]
fn detail_from_several_clients_is_dumped_once() {
    let mut printer = StatusPrinter::new(Vec::new());
    let outcome = printer
        .print_response(&response(vec![stale_client("node-1"), stale_client("node-2")]))
        .unwrap();

    assert_eq!(outcome.rows, 4);
    assert_eq!(output(printer).matches("Detailed Config:").count(), 1);
}

#[test]
fn filters_skip_non_matching_clients() {
    let clients = response(vec![
        unsynced_client("projects/1/nodes/gke-a"),
        unsynced_client("projects/1/nodes/vm-b"),
        stale_client("projects/1/nodes/gke-c"),
    ]);

    let cases = [
        (FilterMode::Prefix, "projects/1/nodes/gke", 3),
        (FilterMode::Suffix, "vm-b", 1),
        (FilterMode::Regex, r"gke-[ab]$", 1),
        (FilterMode::Regex, "", 4),
    ];

    for (mode, pattern, rows) in cases {
        let filter = NodeFilter::new(mode, pattern).unwrap();
        let mut printer = StatusPrinter::new(Vec::new()).with_filter(Some(filter));
        let outcome = printer.print_response(&clients).unwrap();
        assert_eq!(outcome.rows, rows, "{mode} {pattern:?}");
    }
}

#[test]
fn filtered_out_detail_is_not_dumped() {
    let filter = NodeFilter::new(FilterMode::Prefix, "keep").unwrap();
    let mut printer = StatusPrinter::new(Vec::new()).with_filter(Some(filter));
    let outcome = printer
        .print_response(&response(vec![unsynced_client("keep-1"), stale_client("drop-1")]))
        .unwrap();

    assert_eq!(outcome, PrintOutcome { rows: 1, dumped: false });
    assert!(!output(printer).contains("drop-1"));
}

#[test]
fn dump_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");
    let mut printer =
        StatusPrinter::new(Vec::new()).with_dump_target(DumpTarget::File(path.clone()));

    printer.print_response(&response(vec![stale_client("node-1")])).unwrap();

    let text = output(printer);
    assert!(text.ends_with(&format!("Config has been saved to {}\n", path.display())));
    assert!(!text.contains("Detailed Config:"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["config"][0]["node"]["id"], "node-1");
}

#[test]
fn visualization_writes_graph_of_dump() {
    let dir = tempfile::tempdir().unwrap();
    let mut printer = StatusPrinter::new(Vec::new())
        .with_dump_target(DumpTarget::File(dir.path().join("dump.json")))
        .with_visualizer(Visualizer::new(dir.path(), Box::new(NoBrowser)));

    printer.print_response(&response(vec![layered_client("node-1")])).unwrap();

    let text = output(printer);
    assert!(text.ends_with("Config graph has been saved to config_graph.dot\n"));

    let dot = std::fs::read_to_string(dir.path().join(GRAPH_FILE)).unwrap();
    for edge in [
        "\"LDS0\"->\"RDS0\"",
        "\"LDS0\"->\"RDS1\"",
        "\"RDS0\"->\"CDS0\"",
        "\"RDS0\"->\"CDS1\"",
        "\"RDS1\"->\"CDS1\"",
    ] {
        assert_eq!(dot.matches(edge).count(), 1, "{edge}");
    }
    assert_eq!(dot.matches("->").count(), 5);
}

#[test]
fn empty_response_has_no_header() {
    let mut printer = StatusPrinter::new(Vec::new());
    printer.print_response(&response(Vec::new())).unwrap();
    assert_eq!(output(printer), "No xDS clients connected.\n");
}
