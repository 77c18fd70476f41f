use crate::infra::{ListingStore, OfflineDistanceProvider, SettingsFile};
use clap::Args;
use rent_ranker::config::AppConfig;
use rent_ranker::error::AppError;
use rent_ranker::listings::{
    GroupTag, ImportSummary, Listing, ListingCsvImporter, ListingQuery, ListingQueryParams,
    ListingService, ListingServiceError, WeightConfigHolder,
};
use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type FileService = ListingService<ListingStore, SettingsFile>;

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// JSON listing store to rank
    #[arg(long)]
    pub(crate) listings: PathBuf,
    /// Weight settings file (defaults to APP_SETTINGS_FILE, then built-in weights)
    #[arg(long)]
    pub(crate) settings: Option<PathBuf>,
    /// Sort key, e.g. score, price, distance, cost_per_sqft
    #[arg(long, default_value = "score")]
    pub(crate) sort_by: String,
    /// Only rank listings carrying this group tag
    #[arg(long, default_value = "all")]
    pub(crate) group: String,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Headered CSV file with one listing per row
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// JSON listing store receiving the new listings
    #[arg(long)]
    pub(crate) listings: PathBuf,
    /// Weight settings file (defaults to APP_SETTINGS_FILE, then built-in weights)
    #[arg(long)]
    pub(crate) settings: Option<PathBuf>,
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let settings = args.settings.or(config.storage.settings_file.clone());
    let service = open_service(&args.listings, settings, &config)?;

    let query = ListingQuery::try_from(ListingQueryParams {
        sort_by: Some(args.sort_by),
        group: Some(args.group),
    })?;
    let listings = service.list(&query)?;

    print!("{}", render_ranking(&listings, &query));
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let settings = args.settings.or(config.storage.settings_file.clone());
    let service = open_service(&args.listings, settings, &config)?;

    let importer = ListingCsvImporter::from_reader(File::open(&args.csv)?)?;
    let summary = service.import(importer.into_rows())?;

    print!("{}", render_import_summary(&args.csv, &summary));
    Ok(())
}

fn open_service(
    listings: &Path,
    settings: Option<PathBuf>,
    config: &AppConfig,
) -> Result<FileService, AppError> {
    let store = ListingStore::open(listings).map_err(ListingServiceError::from)?;
    let settings = settings.map_or_else(SettingsFile::in_memory, SettingsFile::at);
    let holder = WeightConfigHolder::load(Arc::new(settings), config.scoring.default_weights());

    Ok(ListingService::new(
        Arc::new(store),
        holder,
        Arc::new(OfflineDistanceProvider),
    ))
}

pub(crate) fn render_ranking(listings: &[Listing], query: &ListingQuery) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Ranked listings ({} shown, sorted by {})",
        listings.len(),
        query.sort.key()
    );
    if listings.is_empty() {
        out.push_str("  no listings match\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:>3}  {:>5}  {:>8}  {:>7}  {:>8}  {:>4}  {:>5}  {:>6}  {:<7}  address",
        "#", "score", "price", "$/sqft", "$/occ", "beds", "baths", "dist", "group"
    );
    for (position, listing) in listings.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:>5}  {:>8}  {:>7}  {:>8}  {:>4}  {:>5}  {:>6}  {:<7}  {}",
            position + 1,
            cell(listing.score, 2),
            cell(listing.price, 0),
            cell(listing.metrics.cost_per_sqft, 2),
            cell(listing.metrics.cost_per_occupant, 0),
            cell(listing.bedrooms, 1),
            cell(listing.bathrooms, 1),
            cell(listing.distance, 1),
            group_cell(listing.group),
            listing.address
        );
    }
    out
}

pub(crate) fn render_import_summary(source: &Path, summary: &ImportSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Imported {}", source.display());
    let _ = writeln!(
        out,
        "- {} created | {} duplicate addresses skipped | {} rows rejected",
        summary.created, summary.duplicates, summary.rejected_rows
    );
    for issue in &summary.issues {
        match &issue.field {
            Some(field) => {
                let _ = writeln!(out, "  row {} [{}]: {}", issue.row, field, issue.message);
            }
            None => {
                let _ = writeln!(out, "  row {}: {}", issue.row, issue.message);
            }
        }
    }
    out
}

fn cell(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn group_cell(group: GroupTag) -> &'static str {
    match group {
        GroupTag::Unassigned => "",
        other => other.label(),
    }
}
