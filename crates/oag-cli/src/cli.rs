//! Command-line surface

use clap::{value_parser, Arg, ArgAction, Command};
use oag_core::{TraceKind, MAX_TRACE_DEPTH};
use oag_model::{OagStatus, ResourceType};
use std::path::PathBuf;

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).required(true).help(help)
}

fn file_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn resource_type_arg() -> Arg {
    Arg::new("resource-type")
        .required(true)
        .value_parser(|s: &str| s.parse::<ResourceType>())
        .help("Versioned resource kind: schema or oag")
}

fn comment_arg() -> Arg {
    Arg::new("comment").long("comment").short('m').help("Snapshot comment")
}

fn author_arg() -> Arg {
    Arg::new("created-by").long("created-by").help("Author recorded on the result")
}

fn edges_arg() -> Arg {
    Arg::new("edges")
        .long("edges")
        .value_parser(value_parser!(PathBuf))
        .help("JSON array of authoritative edges: {source, type, target, data}")
}

fn type_hint_arg() -> Arg {
    Arg::new("type-hint")
        .long("type-hint")
        .help("Entity type for records the prefix table cannot classify")
}

fn creation_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("name").long("name").help("Instance name"))
        .arg(Arg::new("description").long("description").help("Instance description"))
        .arg(author_arg())
        .arg(
            Arg::new("status")
                .long("status")
                .value_parser(|s: &str| s.parse::<OagStatus>())
                .help("Initial status: active, draft or archived"),
        )
}

fn schema_command() -> Command {
    Command::new("schema")
        .about("Manage schema definitions")
        .subcommand_required(true)
        .subcommand(
            Command::new("put")
                .about("Store or replace a schema from a JSON or YAML file")
                .arg(id_arg("id", "Schema id"))
                .arg(file_arg("file", "Schema definition file")),
        )
        .subcommand(Command::new("get").about("Print a stored schema").arg(id_arg("id", "Schema id")))
        .subcommand(Command::new("list").about("List stored schemas"))
        .subcommand(
            Command::new("lint")
                .about("Check naming, color and endpoint rules")
                .arg(id_arg("id", "Schema id")),
        )
        .subcommand(Command::new("remove").about("Delete a stored schema").arg(id_arg("id", "Schema id")))
        .subcommand(
            Command::new("snapshot")
                .about("Record the stored schema as a new version")
                .arg(id_arg("id", "Schema id"))
                .arg(comment_arg())
                .arg(author_arg()),
        )
        .subcommand(
            Command::new("restore")
                .about("Restore a schema from one of its versions")
                .arg(id_arg("id", "Schema id"))
                .arg(id_arg("version", "Version id to restore"))
                .arg(comment_arg())
                .arg(author_arg()),
        )
}

fn oag_command() -> Command {
    Command::new("oag")
        .about("Manage graph instances")
        .subcommand_required(true)
        .subcommand(creation_args(
            Command::new("create")
                .about("Create an empty instance bound to a schema")
                .arg(id_arg("schema", "Schema id")),
        ))
        .subcommand(creation_args(
            Command::new("template")
                .about("Create an instance from a built-in template")
                .arg(id_arg("template", "Template id")),
        ))
        .subcommand(creation_args(
            Command::new("import")
                .about("Assemble records into a new instance")
                .arg(id_arg("schema", "Schema id"))
                .arg(file_arg("records", "JSON array of source records"))
                .arg(edges_arg())
                .arg(type_hint_arg()),
        ))
        .subcommand(
            Command::new("list")
                .about("List instances, newest first")
                .arg(
                    Arg::new("status")
                        .long("status")
                        .value_parser(|s: &str| s.parse::<OagStatus>())
                        .help("Only instances with this status"),
                )
                .arg(Arg::new("schema").long("schema").help("Only instances bound to this schema"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Page size"),
                )
                .arg(
                    Arg::new("offset")
                        .long("offset")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Entries to skip"),
                ),
        )
        .subcommand(Command::new("get").about("Print an instance").arg(id_arg("id", "Instance id")))
        .subcommand(
            Command::new("update")
                .about("Shallow-merge a JSON object into an instance")
                .arg(id_arg("id", "Instance id"))
                .arg(file_arg("patch", "JSON object of fields to replace")),
        )
        .subcommand(
            Command::new("replace")
                .about("Replace an instance's graph after validating it")
                .arg(id_arg("id", "Instance id"))
                .arg(file_arg("graph", "JSON file with nodes and edges")),
        )
        .subcommand(
            Command::new("export")
                .about("Serialize an instance")
                .arg(id_arg("id", "Instance id"))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .default_value("json")
                        .help("json or yaml"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate an instance against its schema")
                .arg(id_arg("id", "Instance id")),
        )
        .subcommand(Command::new("stats").about("Node and edge counts").arg(id_arg("id", "Instance id")))
        .subcommand(
            Command::new("snapshot")
                .about("Record the instance as a new version")
                .arg(id_arg("id", "Instance id"))
                .arg(comment_arg())
                .arg(author_arg()),
        )
        .subcommand(
            Command::new("duplicate")
                .about("Copy an instance under a new id")
                .arg(id_arg("id", "Instance id"))
                .arg(Arg::new("name").long("name").help("Name of the copy")),
        )
        .subcommand(Command::new("delete").about("Delete an instance").arg(id_arg("id", "Instance id")))
}

fn oag_arg() -> Arg {
    id_arg("oag", "Instance id")
}

fn graph_command() -> Command {
    Command::new("graph")
        .about("Query and edit nodes and edges inside an instance")
        .subcommand_required(true)
        .subcommand(
            Command::new("nodes")
                .about("List nodes")
                .arg(oag_arg())
                .arg(Arg::new("type").long("type").help("Only nodes of this entity type"))
                .arg(
                    Arg::new("ids")
                        .long("id")
                        .action(ArgAction::Append)
                        .help("Only these node ids; repeatable"),
                ),
        )
        .subcommand(
            Command::new("edges")
                .about("List edges")
                .arg(oag_arg())
                .arg(Arg::new("type").long("type").help("Only edges of this relation type"))
                .arg(Arg::new("source").long("source").help("Only edges leaving this node"))
                .arg(Arg::new("target").long("target").help("Only edges entering this node")),
        )
        .subcommand(
            Command::new("node")
                .about("Print one node")
                .arg(oag_arg())
                .arg(id_arg("node", "Node id")),
        )
        .subcommand(
            Command::new("edge")
                .about("Print one edge")
                .arg(oag_arg())
                .arg(id_arg("edge", "Edge id")),
        )
        .subcommand(
            Command::new("add-node")
                .about("Add a node from a JSON file")
                .arg(oag_arg())
                .arg(file_arg("file", "JSON node: {id, type, label, data}")),
        )
        .subcommand(
            Command::new("update-node")
                .about("Shallow-merge a JSON object into a node")
                .arg(oag_arg())
                .arg(id_arg("node", "Node id"))
                .arg(file_arg("patch", "JSON object of fields to replace")),
        )
        .subcommand(
            Command::new("delete-node")
                .about("Delete a node and its edges")
                .arg(oag_arg())
                .arg(id_arg("node", "Node id")),
        )
        .subcommand(
            Command::new("add-edge")
                .about("Add an edge from a JSON file")
                .arg(oag_arg())
                .arg(file_arg("file", "JSON edge: {id, source, type, target, data}")),
        )
        .subcommand(
            Command::new("update-edge")
                .about("Shallow-merge a JSON object into an edge")
                .arg(oag_arg())
                .arg(id_arg("edge", "Edge id"))
                .arg(file_arg("patch", "JSON object of fields to replace")),
        )
        .subcommand(
            Command::new("delete-edge")
                .about("Delete an edge")
                .arg(oag_arg())
                .arg(id_arg("edge", "Edge id")),
        )
        .subcommand(
            Command::new("neighbors")
                .about("Relations entering and leaving a node")
                .arg(oag_arg())
                .arg(id_arg("node", "Node id")),
        )
        .subcommand(
            Command::new("search")
                .about("Nodes whose id or payload contains a keyword")
                .arg(oag_arg())
                .arg(id_arg("keyword", "Case-insensitive keyword")),
        )
        .subcommand(
            Command::new("merge")
                .about("Merge nodes and edges from a JSON file, skipping known ones")
                .arg(oag_arg())
                .arg(file_arg("file", "JSON file with nodes and edges")),
        )
}

fn trace_command() -> Command {
    Command::new("trace")
        .about("Trace requirements through an instance")
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Trace one entity")
                .arg(oag_arg())
                .arg(id_arg("entity", "Entity id"))
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .short('k')
                        .default_value(TraceKind::default().as_str())
                        .value_parser(|s: &str| s.parse::<TraceKind>())
                        .help("full_trace, impact_analysis or downstream_tasks"),
                )
                .arg(
                    Arg::new("depth")
                        .long("depth")
                        .short('d')
                        .default_value("3")
                        .value_parser(value_parser!(u8).range(1..=MAX_TRACE_DEPTH as i64))
                        .help("Hops to follow, 1 to 5"),
                ),
        )
        .subcommand(
            Command::new("batch")
                .about("Trace several entities")
                .arg(oag_arg())
                .arg(file_arg("file", "JSON array of {entityId, queryType, depth}")),
        )
        .subcommand(
            Command::new("path")
                .about("Paths from the roots down to an entity")
                .arg(oag_arg())
                .arg(id_arg("entity", "Entity id")),
        )
        .subcommand(
            Command::new("coverage")
                .about("Test cases verifying an entity")
                .arg(oag_arg())
                .arg(id_arg("entity", "Entity id")),
        )
}

fn version_command() -> Command {
    Command::new("version")
        .about("Inspect and manage version history")
        .subcommand_required(true)
        .subcommand(
            Command::new("history")
                .about("Versions, newest first")
                .arg(resource_type_arg())
                .arg(id_arg("id", "Resource id"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Page size"),
                )
                .arg(
                    Arg::new("offset")
                        .long("offset")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Entries to skip"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print one snapshot")
                .arg(resource_type_arg())
                .arg(id_arg("id", "Resource id"))
                .arg(id_arg("version", "Version id")),
        )
        .subcommand(
            Command::new("diff")
                .about("Compare two snapshots")
                .arg(resource_type_arg())
                .arg(id_arg("id", "Resource id"))
                .arg(id_arg("from", "Older version id"))
                .arg(id_arg("to", "Newer version id")),
        )
        .subcommand(
            Command::new("rollback")
                .about("Record an old snapshot's payload as the newest version")
                .arg(resource_type_arg())
                .arg(id_arg("id", "Resource id"))
                .arg(id_arg("version", "Version id to roll back to"))
                .arg(comment_arg())
                .arg(author_arg()),
        )
        .subcommand(
            Command::new("branches")
                .about("Divergent lines of history")
                .arg(resource_type_arg())
                .arg(id_arg("id", "Resource id")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete one snapshot")
                .arg(resource_type_arg())
                .arg(id_arg("id", "Resource id"))
                .arg(id_arg("version", "Version id")),
        )
}

/// Full command tree
pub(crate) fn command() -> Command {
    Command::new("oag")
        .version(oag_core::VERSION)
        .about("Schema-governed graph engine")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Storage root; overrides the config file and OAG_DATA_DIR"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Reject imports that produce warnings"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(schema_command())
        .subcommand(
            Command::new("assemble")
                .about("Build a graph from records without storing it")
                .arg(id_arg("schema", "Schema id"))
                .arg(file_arg("records", "JSON array of source records"))
                .arg(edges_arg())
                .arg(type_hint_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a graph file against a stored schema")
                .arg(id_arg("schema", "Schema id"))
                .arg(file_arg("graph", "JSON file with nodes and edges")),
        )
        .subcommand(oag_command())
        .subcommand(graph_command())
        .subcommand(trace_command())
        .subcommand(version_command())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn parses_typed_arguments() {
        let matches = command()
            .try_get_matches_from(["oag", "version", "history", "oag", "oag-0001", "--limit", "5"])
            .unwrap();
        let (_, version) = matches.subcommand().unwrap();
        let (_, history) = version.subcommand().unwrap();
        assert_eq!(history.get_one::<ResourceType>("resource-type"), Some(&ResourceType::Oag));
        assert_eq!(history.get_one::<usize>("limit"), Some(&5));
        assert_eq!(history.get_one::<usize>("offset"), Some(&0));
    }

    #[test]
    fn rejects_unknown_resource_type() {
        let err = command()
            .try_get_matches_from(["oag", "version", "branches", "graph", "x"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn trace_defaults_and_depth_range() {
        let matches = command()
            .try_get_matches_from(["oag", "trace", "run", "oag-0001", "SWR-1"])
            .unwrap();
        let (_, trace) = matches.subcommand().unwrap();
        let (_, run) = trace.subcommand().unwrap();
        assert_eq!(run.get_one::<TraceKind>("kind"), Some(&TraceKind::FullTrace));
        assert_eq!(
            run.get_one::<u8>("depth").map(|d| usize::from(*d)),
            Some(oag_core::DEFAULT_TRACE_DEPTH)
        );

        let err = command()
            .try_get_matches_from(["oag", "trace", "run", "oag-0001", "SWR-1", "--depth", "6"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn repeated_node_ids() {
        let matches = command()
            .try_get_matches_from(["oag", "graph", "nodes", "oag-0001", "--id", "A", "--id", "B"])
            .unwrap();
        let (_, graph) = matches.subcommand().unwrap();
        let (_, nodes) = graph.subcommand().unwrap();
        let ids: Vec<_> = nodes.get_many::<String>("ids").unwrap().collect();
        assert_eq!(ids, ["A", "B"]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = command()
            .try_get_matches_from(["oag", "schema", "list", "--data-dir", "/tmp/oag", "--strict"])
            .unwrap();
        assert!(matches.get_flag("strict"));
        assert_eq!(
            matches.get_one::<PathBuf>("data-dir"),
            Some(&PathBuf::from("/tmp/oag"))
        );
    }
}
