use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, info_span};

use retract_cli::logging::redact_value;
use retract_cli::report::{DatasetPlanReport, PlanReport, write_plan_report};
use retract_files::{
    DirStore, FolderSelection, ForceConfirm, RetractFilesRequest, StdinConfirm, resolve_bucket,
    retract_files,
};
use retract_model::{DatasetCategory, PidSource, RetractionConfig, TableRef};
use retract_plan::{PlanRequest, SandboxPlan, build_dataset_plan};
use retract_run::{
    CleaningRule, DeactivatedRetractionRule, ScriptExecutor, discover_retraction_info,
    load_roster, run_queries, verify_pid_table,
};
use retract_warehouse::{MemoryWarehouse, WarehouseCatalog};

use crate::cli::{DeactivatedArgs, FilesArgs, WarehouseArgs};
use crate::types::{
    DatasetSummary, DeactivatedDatasetSummary, DeactivatedRunSummary, FilesRunSummary,
    WarehouseRunSummary,
};

pub fn run_warehouse(args: &WarehouseArgs, config: &RetractionConfig) -> Result<WarehouseRunSummary> {
    let run_span = info_span!("warehouse", project = %args.project);
    let _run_guard = run_span.enter();
    let run_start = Instant::now();

    let warehouse = MemoryWarehouse::load(&args.catalog)
        .with_context(|| format!("load catalog snapshot {}", args.catalog.display()))?;
    let pid_source = warehouse_pid_source(args, &warehouse)?;
    debug!(pid_source = %describe_pid_source(&pid_source), "pid source resolved");

    let datasets = if args.datasets.is_empty() {
        warehouse
            .list_datasets(&args.project)
            .context("list datasets")?
    } else {
        args.datasets.clone()
    };
    let sandbox = SandboxPlan::new(&args.sandbox_dataset, &args.sandbox_prefix);
    if !args.dry_run {
        fs::create_dir_all(&args.output_dir)
            .with_context(|| format!("create {}", args.output_dir.display()))?;
    }

    let mut summaries = Vec::new();
    let mut report_datasets = Vec::new();
    let mut scripts = Vec::new();
    for dataset in &datasets {
        let dataset_span = info_span!("dataset", dataset = %dataset);
        let _dataset_guard = dataset_span.enter();
        // A targeted, supervised retraction: a listing failure aborts the
        // whole run instead of silently narrowing its scope.
        let existing_tables = warehouse
            .list_tables(&args.project, dataset)
            .with_context(|| format!("list tables for {dataset}"))?;
        let category = DatasetCategory::of(dataset);
        let plan = build_dataset_plan(
            config,
            &PlanRequest {
                project: &args.project,
                dataset,
                hpo_id: Some(&args.hpo_id),
                scope: args.scope.into(),
                pid_source: &pid_source,
                sandbox: &sandbox,
                existing_tables: &existing_tables,
            },
        )?;
        info!(
            category = %category,
            statement_count = plan.queries.len(),
            missing_tables = plan.missing_tables.len(),
            "dataset planned"
        );

        if !args.dry_run && !plan.queries.is_empty() {
            let path = args.output_dir.join(format!("retract_{dataset}.sql"));
            let mut script = ScriptExecutor::create(&path)?;
            run_queries(&mut script, &plan.queries)?;
            script.finish()?;
            scripts.push(path);
        }

        summaries.push(DatasetSummary {
            dataset: dataset.clone(),
            category,
            statements: plan.queries.len(),
            sandbox_tables: plan.sandbox_tables().len(),
            missing_tables: plan.missing_tables.len(),
        });
        report_datasets.push(DatasetPlanReport {
            dataset: dataset.clone(),
            category,
            missing_tables: plan.missing_tables,
            queries: plan.queries,
        });
    }

    let report = PlanReport {
        project: args.project.clone(),
        datasets: report_datasets,
    };
    let report_path = if args.dry_run {
        None
    } else {
        Some(write_plan_report(&args.output_dir, "warehouse", &report)?)
    };
    info!(
        dataset_count = datasets.len(),
        statement_count = report.statement_count(),
        duration_ms = run_start.elapsed().as_millis() as u64,
        "warehouse plan complete"
    );

    Ok(WarehouseRunSummary {
        project: args.project.clone(),
        pid_source: describe_pid_source(&pid_source),
        datasets: summaries,
        scripts,
        report: report_path,
        dry_run: args.dry_run,
    })
}

fn warehouse_pid_source(args: &WarehouseArgs, catalog: &dyn WarehouseCatalog) -> Result<PidSource> {
    if let Some(pids) = &args.pids {
        return Ok(PidSource::literal(pids.iter().copied())?);
    }
    let Some(pid_table) = &args.pid_table else {
        bail!("either --pid-table or --pids is required");
    };
    let pid_project = args.pid_project.as_ref().unwrap_or(&args.project);
    let table = TableRef::new(pid_project, &args.sandbox_dataset, pid_table);
    verify_pid_table(catalog, &table)
        .with_context(|| format!("pid table {table} failed the schema check"))?;
    Ok(PidSource::table(table))
}

fn describe_pid_source(source: &PidSource) -> String {
    match source {
        PidSource::Literal(pids) => {
            let rendered: Vec<String> = pids.iter().map(ToString::to_string).collect();
            format!(
                "literal ({} pids: {})",
                pids.len(),
                redact_value(&rendered.join(", "))
            )
        }
        PidSource::Table(table) => format!("table {table}"),
    }
}

pub fn run_deactivated(
    args: &DeactivatedArgs,
    config: &RetractionConfig,
) -> Result<DeactivatedRunSummary> {
    let run_span = info_span!("deactivated", project = %args.project, ticket = %args.ticket);
    let _run_guard = run_span.enter();
    let run_start = Instant::now();

    let warehouse = MemoryWarehouse::load(&args.catalog)
        .with_context(|| format!("load catalog snapshot {}", args.catalog.display()))?;
    let roster =
        load_roster(&args.roster).with_context(|| format!("load {}", args.roster.display()))?;
    if roster.is_empty() {
        bail!("roster {} contains no deactivation records", args.roster.display());
    }
    let dataset_filter = (!args.datasets.is_empty()).then(|| args.datasets.clone());
    let info = discover_retraction_info(
        &warehouse,
        &args.project,
        config,
        dataset_filter.as_deref(),
    )?;
    info!(
        roster_count = roster.len(),
        table_count = info.len(),
        "retraction info discovered"
    );

    let mut tables_by_dataset: BTreeMap<String, usize> = BTreeMap::new();
    for info_row in &info {
        *tables_by_dataset.entry(info_row.dataset.clone()).or_insert(0) += 1;
    }

    let roster_count = roster.len();
    let rule = DeactivatedRetractionRule::new(
        &args.project,
        &args.ticket,
        &args.sandbox_dataset,
        roster,
        info,
    );
    let specs = rule.get_query_specs()?;

    let mut statements_by_dataset: BTreeMap<String, usize> = BTreeMap::new();
    let mut queries_by_dataset: BTreeMap<String, Vec<retract_model::RetractionQuery>> =
        BTreeMap::new();
    for query in &specs {
        *statements_by_dataset
            .entry(query.target.dataset.clone())
            .or_insert(0) += 1;
        queries_by_dataset
            .entry(query.target.dataset.clone())
            .or_default()
            .push(query.clone());
    }

    let (script, report_path) = if args.dry_run {
        (None, None)
    } else {
        fs::create_dir_all(&args.output_dir)
            .with_context(|| format!("create {}", args.output_dir.display()))?;
        let path = args.output_dir.join(format!("retract_{}.sql", args.ticket));
        let mut script = ScriptExecutor::create(&path)?;
        run_queries(&mut script, &specs)?;
        script.finish()?;
        let report = PlanReport {
            project: args.project.clone(),
            datasets: queries_by_dataset
                .iter()
                .map(|(dataset, queries)| DatasetPlanReport {
                    dataset: dataset.clone(),
                    category: DatasetCategory::of(dataset),
                    missing_tables: Vec::new(),
                    queries: queries.clone(),
                })
                .collect(),
        };
        let report_path = write_plan_report(&args.output_dir, &args.ticket, &report)?;
        (Some(path), Some(report_path))
    };

    let datasets = tables_by_dataset
        .into_iter()
        .map(|(dataset, tables)| DeactivatedDatasetSummary {
            category: DatasetCategory::of(&dataset),
            statements: statements_by_dataset.get(&dataset).copied().unwrap_or(0),
            dataset,
            tables,
        })
        .collect();
    info!(
        statement_count = specs.len(),
        duration_ms = run_start.elapsed().as_millis() as u64,
        "deactivated plan complete"
    );

    Ok(DeactivatedRunSummary {
        project: args.project.clone(),
        ticket: args.ticket.clone(),
        roster_count,
        datasets,
        script,
        report: report_path,
        dry_run: args.dry_run,
    })
}

pub fn run_files(args: &FilesArgs, config: &RetractionConfig) -> Result<FilesRunSummary> {
    let run_span = info_span!("files", hpo_id = %args.hpo_id);
    let _run_guard = run_span.enter();

    let pids = files_pids(args)?;
    debug!(
        pid_count = pids.len(),
        pids = %redact_value(&render_pids(&pids)),
        "pid set loaded"
    );
    let bucket = resolve_bucket(&args.hpo_id, args.bucket.as_deref())?;
    let mut store = DirStore::new(&bucket);
    let selection = FolderSelection::parse(&args.folder);
    let request = RetractFilesRequest {
        config,
        pids: &pids,
        selection,
    };
    let report = if args.force {
        retract_files(&mut store, &mut ForceConfirm, &request)?
    } else {
        retract_files(&mut store, &mut StdinConfirm, &request)?
    };
    info!(
        folders_processed = report.folders_processed,
        files_rewritten = report.files.iter().filter(|file| file.reuploaded).count(),
        "file retraction complete"
    );

    Ok(FilesRunSummary {
        hpo_id: args.hpo_id.clone(),
        bucket,
        pid_count: pids.len(),
        report,
    })
}

fn files_pids(args: &FilesArgs) -> Result<BTreeSet<i64>> {
    let pids: BTreeSet<i64> = if let Some(pids) = &args.pids {
        pids.iter().copied().collect()
    } else if let Some(path) = &args.pid_file {
        let content =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let mut pids = BTreeSet::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let pid = line.parse::<i64>().with_context(|| {
                format!("{} line {}: invalid pid '{line}'", path.display(), number + 1)
            })?;
            pids.insert(pid);
        }
        pids
    } else {
        bail!("either --pid-file or --pids is required");
    };
    if pids.is_empty() {
        bail!("pid set is empty; nothing to retract");
    }
    Ok(pids)
}

fn render_pids(pids: &BTreeSet<i64>) -> String {
    let rendered: Vec<String> = pids.iter().map(ToString::to_string).collect();
    rendered.join(", ")
}
