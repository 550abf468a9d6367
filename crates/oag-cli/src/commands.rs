//! Subcommand dispatch
//!
//! Every command prints its result to stdout as JSON, except `oag export`,
//! which prints the export verbatim. Batch traces print one entry per request,
//! carrying either the report or the error.

use anyhow::{bail, Context};
use clap::ArgMatches;
use oag_core::{
    CreateOptions, EdgeFilter, Engine, ExportFormat, HistoryQuery, ImportRequest, ListFilter,
    NodeFilter, RollbackOptions, SnapshotOptions, TraceKind, TraceRequest,
};
use oag_model::{Edge, GraphData, Node, OagStatus, PropertyMap, ResourceType, SchemaDefinition};
use oag_pipeline::{AuthoritativeEdge, AuthoritativeEdges};
use oag_validate::ValidationReport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// How a successful command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Nothing to report
    Clean,
    /// The command ran but its subject failed validation
    Invalid,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Clean => Self::SUCCESS,
            Outcome::Invalid => Self::FAILURE,
        }
    }
}

impl Outcome {
    fn of(report: &ValidationReport) -> Self {
        if report.is_valid() {
            Self::Clean
        } else {
            Self::Invalid
        }
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<Outcome> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(Outcome::Clean)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Schema file, YAML when the extension says so
pub(crate) fn read_schema(path: &Path) -> anyhow::Result<SchemaDefinition> {
    let yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if !yaml {
        return read_json(path);
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn path<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing argument <{name}>"))
}

fn string<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{name}>"))
}

fn optional(args: &ArgMatches, name: &str) -> Option<String> {
    args.get_one::<String>(name).cloned()
}

fn resource_type(args: &ArgMatches) -> anyhow::Result<ResourceType> {
    args.get_one::<ResourceType>("resource-type")
        .copied()
        .context("missing argument <resource-type>")
}

fn authoritative(args: &ArgMatches) -> anyhow::Result<Option<AuthoritativeEdges>> {
    args.get_one::<PathBuf>("edges")
        .map(|p| read_json::<Vec<AuthoritativeEdge>>(p).map(AuthoritativeEdges::new))
        .transpose()
}

fn creation_options(args: &ArgMatches) -> CreateOptions {
    CreateOptions {
        name: optional(args, "name"),
        description: optional(args, "description"),
        created_by: optional(args, "created-by"),
        status: args.get_one::<OagStatus>("status").copied().unwrap_or_default(),
    }
}

fn snapshot_options(args: &ArgMatches) -> SnapshotOptions {
    SnapshotOptions {
        comment: optional(args, "comment").unwrap_or_default(),
        created_by: optional(args, "created-by"),
        parent_version_id: None,
    }
}

fn rollback_options(args: &ArgMatches) -> RollbackOptions {
    RollbackOptions {
        comment: optional(args, "comment"),
        created_by: optional(args, "created-by"),
    }
}

/// Run the selected subcommand
pub(crate) async fn run(engine: &Engine, matches: &ArgMatches) -> anyhow::Result<Outcome> {
    match matches.subcommand() {
        Some(("schema", args)) => schema(engine, args).await,
        Some(("assemble", args)) => {
            let records: Vec<PropertyMap> = read_json(path(args, "records")?)?;
            let edges = authoritative(args)?;
            let assembled = engine
                .assemble(
                    string(args, "schema")?,
                    &records,
                    edges.as_ref(),
                    args.get_one::<String>("type-hint").map(String::as_str),
                )
                .await?;
            print(&json!({
                "data": assembled.data,
                "skipped": assembled.skipped,
                "unresolved": assembled.unresolved,
            }))
        }
        Some(("validate", args)) => {
            let graph: GraphData = read_json(path(args, "graph")?)?;
            let report = engine.validate(string(args, "schema")?, &graph).await?;
            print(&report)?;
            Ok(Outcome::of(&report))
        }
        Some(("oag", args)) => oag(engine, args).await,
        Some(("graph", args)) => graph(engine, args).await,
        Some(("trace", args)) => trace(engine, args).await,
        Some(("version", args)) => version(engine, args).await,
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("no command given"),
    }
}

async fn schema(engine: &Engine, matches: &ArgMatches) -> anyhow::Result<Outcome> {
    let schemas = engine.schemas();
    match matches.subcommand() {
        Some(("put", args)) => {
            let id = string(args, "id")?;
            let definition = read_schema(path(args, "file")?)?;
            let impact = schemas.put(id, &definition).await?;
            print(&json!({ "id": id, "version": definition.version, "impact": impact }))
        }
        Some(("get", args)) => print(&*schemas.get(string(args, "id")?).await?),
        Some(("list", _)) => print(&schemas.list().await?),
        Some(("lint", args)) => {
            let report = schemas.lint(string(args, "id")?).await?;
            print(&report)?;
            Ok(Outcome::of(&report))
        }
        Some(("remove", args)) => {
            let id = string(args, "id")?;
            schemas.remove(id).await?;
            print(&json!({ "removed": id }))
        }
        Some(("snapshot", args)) => {
            print(&engine.snapshot_schema(string(args, "id")?, snapshot_options(args)).await?)
        }
        Some(("restore", args)) => print(
            &engine
                .restore_schema(string(args, "id")?, string(args, "version")?, rollback_options(args))
                .await?
                .summary(),
        ),
        Some((other, _)) => bail!("unknown schema command {other}"),
        None => bail!("no schema command given"),
    }
}

async fn oag(engine: &Engine, matches: &ArgMatches) -> anyhow::Result<Outcome> {
    let oags = engine.oags();
    match matches.subcommand() {
        Some(("create", args)) => print(
            &oags
                .create_from_schema(string(args, "schema")?, creation_options(args))
                .await?
                .summary(),
        ),
        Some(("template", args)) => print(
            &oags
                .generate_from_template(string(args, "template")?, creation_options(args))
                .await?
                .summary(),
        ),
        Some(("import", args)) => {
            let request = ImportRequest {
                records: read_json(path(args, "records")?)?,
                authoritative: authoritative(args)?,
                type_hint: optional(args, "type-hint"),
                options: creation_options(args),
            };
            let outcome = oags.import_graph(string(args, "schema")?, request).await?;
            print(&json!({
                "instance": outcome.instance.summary(),
                "statistics": outcome.instance.data.statistics(),
                "skipped": outcome.skipped,
                "unresolved": outcome.unresolved,
                "report": outcome.report,
            }))?;
            Ok(Outcome::of(&outcome.report))
        }
        Some(("list", args)) => {
            let filter = ListFilter {
                status: args.get_one::<OagStatus>("status").copied(),
                schema_id: optional(args, "schema"),
                limit: args.get_one::<usize>("limit").copied(),
                offset: args.get_one::<usize>("offset").copied().unwrap_or_default(),
            };
            print(&oags.list_oags(&filter).await?)
        }
        Some(("get", args)) => print(&oags.get_oag(string(args, "id")?).await?),
        Some(("update", args)) => {
            let patch: PropertyMap = read_json(path(args, "patch")?)?;
            print(&oags.update_oag(string(args, "id")?, patch).await?.summary())
        }
        Some(("replace", args)) => {
            let graph: GraphData = read_json(path(args, "graph")?)?;
            let (instance, report) = oags.replace_graph(string(args, "id")?, graph).await?;
            print(&json!({ "instance": instance.summary(), "report": report }))?;
            Ok(Outcome::of(&report))
        }
        Some(("export", args)) => {
            let format: ExportFormat = string(args, "format")?.parse()?;
            println!("{}", oags.export_oag(string(args, "id")?, format).await?);
            Ok(Outcome::Clean)
        }
        Some(("validate", args)) => {
            let validation = oags.validate_oag(string(args, "id")?).await?;
            print(&validation)?;
            Ok(Outcome::of(&validation.report))
        }
        Some(("stats", args)) => print(&oags.statistics(string(args, "id")?).await?),
        Some(("snapshot", args)) => {
            print(&oags.snapshot(string(args, "id")?, snapshot_options(args)).await?.summary())
        }
        Some(("duplicate", args)) => print(
            &oags
                .duplicate_oag(string(args, "id")?, args.get_one::<String>("name").map(String::as_str))
                .await?
                .summary(),
        ),
        Some(("delete", args)) => {
            let id = string(args, "id")?;
            oags.delete_oag(id).await?;
            print(&json!({ "deleted": id }))
        }
        Some((other, _)) => bail!("unknown oag command {other}"),
        None => bail!("no oag command given"),
    }
}

async fn graph(engine: &Engine, matches: &ArgMatches) -> anyhow::Result<Outcome> {
    let graphs = engine.graphs();
    let Some((name, args)) = matches.subcommand() else {
        bail!("no graph command given");
    };
    let oag = string(args, "oag")?;
    match name {
        "nodes" => {
            let filter = NodeFilter {
                node_type: optional(args, "type"),
                ids: args
                    .get_many::<String>("ids")
                    .map(|ids| ids.cloned().collect()),
            };
            print(&graphs.nodes(oag, &filter).await?)
        }
        "edges" => {
            let filter = EdgeFilter {
                edge_type: optional(args, "type"),
                source: optional(args, "source"),
                target: optional(args, "target"),
            };
            print(&graphs.edges(oag, &filter).await?)
        }
        "node" => print(&graphs.node(oag, string(args, "node")?).await?),
        "edge" => print(&graphs.edge(oag, string(args, "edge")?).await?),
        "add-node" => {
            let node: Node = read_json(path(args, "file")?)?;
            print(&graphs.add_node(oag, node).await?)
        }
        "update-node" => {
            let patch: PropertyMap = read_json(path(args, "patch")?)?;
            print(&graphs.update_node(oag, string(args, "node")?, patch).await?)
        }
        "delete-node" => {
            let node = string(args, "node")?;
            let edges = graphs.delete_node(oag, node).await?;
            print(&json!({ "deleted": node, "edgesRemoved": edges }))
        }
        "add-edge" => {
            let edge: Edge = read_json(path(args, "file")?)?;
            print(&graphs.add_edge(oag, edge).await?)
        }
        "update-edge" => {
            let patch: PropertyMap = read_json(path(args, "patch")?)?;
            print(&graphs.update_edge(oag, string(args, "edge")?, patch).await?)
        }
        "delete-edge" => {
            let edge = string(args, "edge")?;
            graphs.delete_edge(oag, edge).await?;
            print(&json!({ "deleted": edge }))
        }
        "neighbors" => print(&graphs.neighbors(oag, string(args, "node")?).await?),
        "search" => print(&graphs.search(oag, string(args, "keyword")?).await?),
        "merge" => {
            let batch: GraphData = read_json(path(args, "file")?)?;
            print(&graphs.merge(oag, batch).await?)
        }
        other => bail!("unknown graph command {other}"),
    }
}

async fn trace(engine: &Engine, matches: &ArgMatches) -> anyhow::Result<Outcome> {
    let traces = engine.traces();
    let Some((name, args)) = matches.subcommand() else {
        bail!("no trace command given");
    };
    let oag = string(args, "oag")?;
    match name {
        "run" => {
            let kind = args.get_one::<TraceKind>("kind").copied().unwrap_or_default();
            let depth = args
                .get_one::<u8>("depth")
                .map(|d| usize::from(*d))
                .context("missing argument <depth>")?;
            print(&traces.trace(oag, string(args, "entity")?, kind, depth).await?)
        }
        "batch" => {
            let requests: Vec<TraceRequest> = read_json(path(args, "file")?)?;
            let results = traces.trace_batch(oag, &requests).await?;
            let entries: Vec<_> = requests
                .iter()
                .zip(results)
                .map(|(request, result)| match result {
                    Ok(report) => json!({ "entityId": request.entity_id, "result": report }),
                    Err(e) => json!({ "entityId": request.entity_id, "error": e.to_string() }),
                })
                .collect();
            print(&entries)
        }
        "path" => print(&traces.full_paths(oag, string(args, "entity")?).await?),
        "coverage" => print(&traces.coverage(oag, string(args, "entity")?).await?),
        other => bail!("unknown trace command {other}"),
    }
}

async fn version(engine: &Engine, matches: &ArgMatches) -> anyhow::Result<Outcome> {
    let versions = engine.versions();
    let Some((name, args)) = matches.subcommand() else {
        bail!("no version command given");
    };
    let kind = resource_type(args)?;
    let id = string(args, "id")?;
    match name {
        "history" => {
            let query = HistoryQuery {
                limit: args.get_one::<usize>("limit").copied(),
                offset: args.get_one::<usize>("offset").copied().unwrap_or_default(),
            };
            print(&versions.get_version_history(id, kind, query).await?)
        }
        "show" => print(&versions.get_version(id, kind, string(args, "version")?).await?),
        "diff" => print(
            &versions
                .diff(id, kind, string(args, "from")?, string(args, "to")?)
                .await?,
        ),
        "rollback" => print(
            &versions
                .rollback(id, kind, string(args, "version")?, rollback_options(args))
                .await?
                .summary(),
        ),
        "branches" => print(&versions.get_branches(id, kind).await?),
        "delete" => {
            let version_id = string(args, "version")?;
            versions.delete_version(id, kind, version_id).await?;
            print(&json!({ "deleted": version_id }))
        }
        other => bail!("unknown version command {other}"),
    }
}
