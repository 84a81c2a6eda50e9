//! Test-artifact generation.
//!
//! [`ArtifactGenerator::apply_intent`] executes a parsed [`CardIntent`] against
//! the repository in a fixed order: deletions, then refactors (excluding
//! anything just deleted), then creation. Every touched path must sit under
//! the tests directory and carry the spec suffix.
//!
//! | Module      | Responsibility                                  |
//! |-------------|-------------------------------------------------|
//! | `catalog`   | product catalog parsed from the page object     |
//! | `sequence`  | `<prefix>-<seq3>-<slug>` numbering              |
//! | `templates` | spec file bodies                                |
//! | `translate` | Portuguese-to-English titles and file names     |
//! | `steps`     | `test.step` instrumentation                     |
//! | `policy`    | agent policy document upsert                    |

pub mod catalog;
pub mod policy;
pub mod sequence;
pub mod steps;
pub mod templates;
pub mod translate;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::ArtifactError;
use crate::intent::paths::normalize_path;
use crate::intent::product::short_product_name;
use crate::intent::{CardIntent, IntentParser, RenamePair, TestLayout};
use crate::selector::WorkType;
use crate::util::slugify;
pub use catalog::{CatalogEntry, ProductCatalog};
use policy::PolicyUpdate;

static CART_SIGNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(carrinho|cart|checkout|subtotal|valor total|total da compra)").unwrap()
});

static INVENTORY_SIGNAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(inv-\d*|inventory|produto|product)").unwrap());

const CART_SLUG_MAX: usize = 60;

/// Which scenario a creation request maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Cart,
    Inventory,
    /// Neither signal found; the cart scenario is used.
    Unclassified,
}

impl Category {
    pub fn classify(text: &str) -> Self {
        if CART_SIGNAL.is_match(text) {
            Self::Cart
        } else if INVENTORY_SIGNAL.is_match(text) {
            Self::Inventory
        } else {
            Self::Unclassified
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Repository root; every relative path resolves against it.
    pub root: PathBuf,
    pub layout: TestLayout,
    /// Page object holding the product catalog, relative to `root`.
    pub catalog_path: PathBuf,
    /// Agent policy documents, relative to `root`.
    pub policy_docs: Vec<String>,
    pub dry_run: bool,
}

impl GeneratorConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layout: TestLayout::default(),
            catalog_path: PathBuf::from("pages/InventoryPage.ts"),
            policy_docs: vec![
                "AGENTS.md".to_string(),
                "CLAUDE.md".to_string(),
                ".github/copilot-instructions.md".to_string(),
            ],
            dry_run: false,
        }
    }
}

/// Card data the generator needs besides the intent.
#[derive(Debug, Clone)]
pub struct ArtifactContext {
    pub title: String,
    pub body: String,
    pub work_type: WorkType,
    /// Issue number, or 0 for drafts; drives the product pick.
    pub seed: u64,
}

/// What a run did, in repository-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactOperationSummary {
    pub created: Vec<String>,
    pub deleted: Vec<String>,
    pub refactored: Vec<String>,
    pub renamed: Vec<RenamePair>,
    pub missing: Vec<String>,
    pub warnings: Vec<String>,
}

impl ArtifactOperationSummary {
    fn push_refactored(&mut self, path: &str) {
        if !self.refactored.iter().any(|p| p == path) {
            self.refactored.push(path.to_string());
        }
    }

    /// `Generated:`/`Deleted:`/... report lines.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.extend(self.created.iter().map(|p| format!("Generated: {p}")));
        lines.extend(self.deleted.iter().map(|p| format!("Deleted: {p}")));
        lines.extend(self.refactored.iter().map(|p| format!("Refactored: {p}")));
        lines.extend(
            self.renamed
                .iter()
                .map(|r| format!("Renamed: {} -> {}", r.from, r.to)),
        );
        lines.extend(self.warnings.iter().map(|w| format!("Warning: {w}")));
        lines.extend(self.missing.iter().map(|p| format!("Missing: {p}")));
        lines
    }
}

#[derive(Debug)]
pub struct ArtifactGenerator {
    config: GeneratorConfig,
    parser: IntentParser,
}

impl ArtifactGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let parser = IntentParser::new(&config.layout);
        Self { config, parser }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn abs(&self, rel: &str) -> PathBuf {
        self.config.root.join(rel)
    }

    /// Every spec file under the tests directory, repository-relative and sorted.
    pub fn known_specs(&self) -> Vec<String> {
        let tests_root = self.abs(&self.config.layout.tests_dir);
        let mut specs: Vec<String> = WalkDir::new(&tests_root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let rel = entry.path().strip_prefix(&self.config.root).ok()?;
                let rel = normalize_path(&rel.to_string_lossy());
                self.config.layout.is_spec_file(&rel).then_some(rel)
            })
            .collect();
        specs.sort();
        specs
    }

    /// Parse card text against the current set of spec files.
    pub fn parse_intent(&self, title: &str, body: &str) -> CardIntent {
        self.parser.parse(title, body, &self.known_specs())
    }

    /// Reject paths that escape the tests directory or are not spec files.
    fn guard(&self, path: &str) -> Result<String, ArtifactError> {
        let layout = &self.config.layout;
        let normalized = normalize_path(path);
        let tests_prefix = format!("{}/", normalize_path(&layout.tests_dir));
        let escapes = Path::new(path.trim()).is_absolute()
            || normalized.split('/').any(|segment| segment == "..")
            || !normalized.starts_with(&tests_prefix);
        if escapes {
            return Err(ArtifactError::OutsideSandbox {
                path: PathBuf::from(path),
                sandbox: PathBuf::from(&layout.tests_dir),
            });
        }
        if !layout.is_spec_file(&normalized) {
            return Err(ArtifactError::NotSpecFile {
                path: PathBuf::from(normalized),
            });
        }
        Ok(normalized)
    }

    /// Execute `intent`; the summary lists what changed (or would change in dry-run).
    pub fn apply_intent(
        &self,
        intent: &CardIntent,
        ctx: &ArtifactContext,
    ) -> Result<ArtifactOperationSummary, ArtifactError> {
        let mut summary = ArtifactOperationSummary::default();

        if intent.delete {
            self.delete_requested(intent, &mut summary)?;
        }
        if intent.refactor() {
            self.refactor_requested(intent, &mut summary)?;
        }
        if intent.create {
            let created = self.create_requested(intent, ctx)?;
            summary.created.push(created);
        }

        if !intent.create
            && summary.deleted.is_empty()
            && summary.refactored.is_empty()
            && summary.renamed.is_empty()
        {
            return Err(ArtifactError::NoChanges);
        }
        Ok(summary)
    }

    fn delete_requested(
        &self,
        intent: &CardIntent,
        summary: &mut ArtifactOperationSummary,
    ) -> Result<(), ArtifactError> {
        let targets = intent.delete_targets();
        if targets.is_empty() {
            return Err(ArtifactError::DeleteWithoutPaths);
        }
        // Validate everything before the first removal.
        let targets: Vec<String> = targets
            .into_iter()
            .map(|path| self.guard(path))
            .collect::<Result<_, _>>()?;

        for rel in targets {
            let abs = self.abs(&rel);
            if !abs.is_file() {
                summary.missing.push(rel);
                continue;
            }
            if !self.config.dry_run {
                fs::remove_file(&abs).map_err(|e| ArtifactError::io(&abs, e))?;
            }
            info!(path = %rel, dry_run = self.config.dry_run, "Deleted spec file");
            summary.deleted.push(rel);
        }
        Ok(())
    }

    fn refactor_requested(
        &self,
        intent: &CardIntent,
        summary: &mut ArtifactOperationSummary,
    ) -> Result<(), ArtifactError> {
        let deleted: BTreeSet<String> = summary.deleted.iter().cloned().collect();

        for pair in &intent.explicit_rename_pairs {
            let from = self.guard(&pair.from)?;
            let to = self.guard(&pair.to)?;
            if deleted.contains(&from) {
                continue;
            }
            self.rename(&from, &to, summary)?;
        }

        let explicit: Vec<&str> = intent
            .explicit_paths
            .iter()
            .map(String::as_str)
            .filter(|path| {
                !intent
                    .explicit_rename_pairs
                    .iter()
                    .any(|pair| pair.from == *path || pair.to == *path)
            })
            .collect();

        let mut candidates: Vec<String> = Vec::new();
        for path in &explicit {
            let rel = self.guard(path)?;
            if deleted.contains(&rel) {
                continue;
            }
            if self.abs(&rel).is_file() {
                candidates.push(rel);
            } else if !summary.missing.contains(&rel) {
                summary.missing.push(rel);
            }
        }
        // Scan the suite when the card names no files, or only files it just deleted.
        let all_deleted = !explicit.is_empty()
            && explicit.iter().all(|path| deleted.contains(&normalize_path(path)));
        let scanned = (explicit.is_empty() && intent.explicit_rename_pairs.is_empty()) || all_deleted;

        if intent.refactor_titles || intent.refactor_files {
            let targets = if scanned {
                self.translation_candidates(&deleted)?
            } else {
                candidates.clone()
            };
            for rel in targets {
                let current = self.translate_one(&rel, intent, summary)?;
                if let Some(position) = candidates.iter().position(|c| c == &rel) {
                    candidates[position] = current;
                }
            }
        }

        if intent.instrument_steps {
            let targets = if scanned {
                self.known_specs()
                    .into_iter()
                    .filter(|rel| !deleted.contains(rel))
                    .collect()
            } else {
                candidates
            };
            for rel in targets {
                self.instrument_one(&rel, summary)?;
            }
        }

        if intent.update_agent_policy {
            for doc in &self.config.policy_docs {
                match policy::upsert_policy_section(&self.abs(doc), self.config.dry_run)? {
                    PolicyUpdate::Appended => summary.push_refactored(doc),
                    PolicyUpdate::AlreadyPresent => summary
                        .warnings
                        .push(format!("agent policy already present: {doc}")),
                    PolicyUpdate::Missing => summary.missing.push(doc.clone()),
                }
            }
        }
        Ok(())
    }

    /// Spec files whose name or titles show Portuguese vocabulary.
    fn translation_candidates(&self, excluded: &BTreeSet<String>) -> Result<Vec<String>, ArtifactError> {
        let mut out = Vec::new();
        for rel in self.known_specs() {
            if excluded.contains(&rel) {
                continue;
            }
            let abs = self.abs(&rel);
            let content = fs::read_to_string(&abs).map_err(|e| ArtifactError::io(&abs, e))?;
            let stem = self.config.layout.stem(&rel);
            if translate::has_portuguese_signal(stem) || translate::has_portuguese_titles(&content) {
                out.push(rel);
            }
        }
        debug!(count = out.len(), "Translation candidates");
        Ok(out)
    }

    /// Translate titles and file name of one spec; returns its current path.
    fn translate_one(
        &self,
        rel: &str,
        intent: &CardIntent,
        summary: &mut ArtifactOperationSummary,
    ) -> Result<String, ArtifactError> {
        let abs = self.abs(rel);
        if intent.refactor_titles {
            let original = fs::read_to_string(&abs).map_err(|e| ArtifactError::io(&abs, e))?;
            let updated = translate::translate_titles(&original);
            if updated != original {
                if !self.config.dry_run {
                    fs::write(&abs, &updated).map_err(|e| ArtifactError::io(&abs, e))?;
                }
                summary.push_refactored(rel);
            }
        }

        if intent.refactor_files
            && let Some(target) = translate::translate_file_name(rel, &self.config.layout.spec_suffix)
            && self.rename(rel, &target, summary)?
        {
            return Ok(target);
        }
        Ok(rel.to_string())
    }

    /// Rename when the source exists and the target does not; returns whether it happened.
    fn rename(&self, from: &str, to: &str, summary: &mut ArtifactOperationSummary) -> Result<bool, ArtifactError> {
        let (from_abs, to_abs) = (self.abs(from), self.abs(to));
        if !from_abs.is_file() {
            if !summary.missing.iter().any(|m| m == from) {
                summary.missing.push(from.to_string());
            }
            return Ok(false);
        }
        if to_abs.exists() {
            summary
                .warnings
                .push(format!("skip rename; target already exists: {to}"));
            return Ok(false);
        }
        if !self.config.dry_run {
            if let Some(parent) = to_abs.parent() {
                fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
            }
            fs::rename(&from_abs, &to_abs).map_err(|e| ArtifactError::io(&from_abs, e))?;
        }
        info!(from, to, "Renamed spec file");
        summary.renamed.push(RenamePair {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(true)
    }

    fn instrument_one(&self, rel: &str, summary: &mut ArtifactOperationSummary) -> Result<(), ArtifactError> {
        // A dry-run rename leaves the file at its old path.
        let path = if self.abs(rel).is_file() {
            rel.to_string()
        } else {
            match summary.renamed.iter().find(|r| r.to == rel) {
                Some(pair) => pair.from.clone(),
                None => return Ok(()),
            }
        };
        let abs = self.abs(&path);
        let original = fs::read_to_string(&abs).map_err(|e| ArtifactError::io(&abs, e))?;
        let updated = steps::instrument_steps(&original);
        if updated != original {
            if !self.config.dry_run {
                fs::write(&abs, &updated).map_err(|e| ArtifactError::io(&abs, e))?;
            }
            summary.push_refactored(rel);
        }
        Ok(())
    }

    fn create_requested(&self, intent: &CardIntent, ctx: &ArtifactContext) -> Result<String, ArtifactError> {
        let catalog = ProductCatalog::load(&self.config.root.join(&self.config.catalog_path))?;
        let text = format!("{} {}", ctx.title, ctx.body);

        match Category::classify(&text) {
            Category::Cart => self.create_cart(&catalog, ctx),
            Category::Inventory => {
                let name = intent
                    .product_name
                    .as_deref()
                    .ok_or(ArtifactError::MissingProductName)?;
                self.create_inventory(&catalog, name)
            }
            Category::Unclassified => {
                warn!(
                    title = %ctx.title,
                    work_type = %ctx.work_type,
                    "No explicit cart/inventory intent found; using default cart two-products scenario"
                );
                self.create_cart(&catalog, ctx)
            }
        }
    }

    fn write_new(&self, rel: &str, content: &str) -> Result<(), ArtifactError> {
        let abs = self.abs(rel);
        if abs.exists() {
            return Err(ArtifactError::Exists { path: PathBuf::from(rel) });
        }
        if !self.config.dry_run {
            if let Some(parent) = abs.parent() {
                fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
            }
            fs::write(&abs, content).map_err(|e| ArtifactError::io(&abs, e))?;
        }
        info!(path = %rel, dry_run = self.config.dry_run, "Generated spec file");
        Ok(())
    }

    fn sequenced_path(&self, folder: &str, prefix: &str, slug: &str) -> Result<String, ArtifactError> {
        let layout = &self.config.layout;
        let dir = format!("{}/{folder}", normalize_path(&layout.tests_dir));
        let id = sequence::next_sequence_id(&self.abs(&dir), prefix, &layout.spec_suffix)?;
        Ok(format!("{dir}/{prefix}-{id}-{slug}{}", layout.spec_suffix))
    }

    fn create_cart(&self, catalog: &ProductCatalog, ctx: &ArtifactContext) -> Result<String, ArtifactError> {
        let slug = match slugify(&ctx.title, CART_SLUG_MAX) {
            s if s.is_empty() => "two-products-cart-validation".to_string(),
            s => s,
        };
        let rel = self.sequenced_path("cart", "cart", &slug)?;
        let (first, second) = catalog.choose_two_keys(ctx.seed)?;
        self.write_new(&rel, &templates::cart_two_products(&first, &second))?;
        Ok(rel)
    }

    fn create_inventory(&self, catalog: &ProductCatalog, product_name: &str) -> Result<String, ArtifactError> {
        let short = short_product_name(product_name);
        let slug = match slugify(short, CART_SLUG_MAX) {
            s if s.is_empty() => "product".to_string(),
            s => s,
        };
        let rel = self.sequenced_path("inventory", "inv", &format!("{slug}-product-details"))?;
        let title = format!("{short} Product Details");
        let content = match catalog.find_by_name(product_name) {
            Some(entry) => templates::inventory_by_key(&title, &entry.key),
            None => templates::inventory_by_name(&title, product_name),
        };
        self.write_new(&rel, &content)?;
        Ok(rel)
    }

    /// Created, refactored and renamed spec files that exist on disk.
    pub fn runnable_targets(&self, summary: &ArtifactOperationSummary) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        let candidates = summary
            .created
            .iter()
            .chain(summary.refactored.iter())
            .chain(summary.renamed.iter().map(|r| &r.to));
        for path in candidates {
            if self.config.layout.is_spec_file(path)
                && self.abs(path).is_file()
                && !targets.contains(path)
            {
                targets.push(path.clone());
            }
        }
        targets
    }
}
