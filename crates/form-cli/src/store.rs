use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use form_spec::{CategorySpec, FieldDefinition};
use form_store::{AdminError, FieldConfigService, FieldPatch, JsonFileFieldStore};

use crate::CliResult;
use crate::input::{load_field, parse_condition, parse_field_type};

type Service = FieldConfigService<JsonFileFieldStore>;

pub const STORE_ENV: &str = "CATEGORY_FORMS_STORE";
const DEFAULT_STORE: &str = "category-forms.json";

#[derive(Args)]
pub struct StoreArgs {
    /// JSON store file (defaults to CATEGORY_FORMS_STORE or ./category-forms.json).
    #[arg(long, global = true, value_name = "FILE")]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    /// Create a category.
    Add {
        id: String,
        /// Display name (defaults to the id).
        #[arg(long)]
        name: Option<String>,
    },
    /// List categories.
    List,
    /// Delete a category together with its fields.
    Remove { id: String },
    /// Print a category and its fields as a definition document.
    Export { id: String },
}

#[derive(Subcommand)]
pub enum FieldCommand {
    /// List a category's fields in display order.
    List {
        category: String,
        /// Print the stored definitions as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Append a field to a category's form.
    Add(FieldAddArgs),
    /// Change attributes of an existing field.
    Update(FieldUpdateArgs),
    /// Delete a field and close the gap in the order.
    Remove { category: String, field_id: String },
    /// Move the field at position FROM to position TO (zero-based).
    Move {
        category: String,
        from: usize,
        to: usize,
    },
}

#[derive(Args)]
pub struct FieldAddArgs {
    category: String,
    #[arg(long, required_unless_present = "definition")]
    label: Option<String>,
    #[arg(long = "type", value_name = "TYPE", default_value = "text")]
    kind: String,
    /// Machine name (derived from the label when omitted).
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    placeholder: Option<String>,
    #[arg(long)]
    required: bool,
    #[arg(long = "option", value_name = "OPTION")]
    options: Vec<String>,
    #[arg(long)]
    min: Option<f64>,
    #[arg(long)]
    max: Option<f64>,
    #[arg(long)]
    step: Option<f64>,
    /// Show the field only while FIELD_ID holds VALUE.
    #[arg(long, value_name = "FIELD_ID=VALUE")]
    show_when: Option<String>,
    /// Read the definition from a JSON file instead of flags.
    #[arg(long, value_name = "FILE", conflicts_with = "label")]
    definition: Option<PathBuf>,
}

#[derive(Args)]
pub struct FieldUpdateArgs {
    field_id: String,
    #[arg(long)]
    label: Option<String>,
    #[arg(long = "type", value_name = "TYPE")]
    kind: Option<String>,
    #[arg(long)]
    placeholder: Option<String>,
    #[arg(long)]
    required: Option<bool>,
    /// Replace the option list.
    #[arg(long = "option", value_name = "OPTION")]
    options: Vec<String>,
    #[arg(long, value_name = "FIELD_ID=VALUE", conflicts_with = "always_show")]
    show_when: Option<String>,
    /// Remove the visibility condition.
    #[arg(long)]
    always_show: bool,
}

pub fn run_category(args: StoreArgs, command: CategoryCommand) -> CliResult<()> {
    let service = open_service(args)?;
    block_on(category_command(&service, command))
}

pub fn run_field(args: StoreArgs, command: FieldCommand) -> CliResult<()> {
    let service = open_service(args)?;
    block_on(field_command(&service, command))
}

async fn category_command(service: &Service, command: CategoryCommand) -> CliResult<()> {
    match command {
        CategoryCommand::Add { id, name } => {
            let name = name.unwrap_or_else(|| id.clone());
            let row = service.create_category(&id, &name).await.map_err(report)?;
            println!("Created category '{}' ({})", row.name, row.id);
        }
        CategoryCommand::List => {
            for row in service.categories().await.map_err(report)? {
                let count = service.fields(&row.id).await.map_err(report)?.len();
                println!("{}\t{}\t{} field(s)", row.id, row.name, count);
            }
        }
        CategoryCommand::Remove { id } => {
            let removed = service.delete_category(&id).await.map_err(report)?;
            println!("Removed category '{}' and {} field(s)", id, removed);
        }
        CategoryCommand::Export { id } => {
            let row = service
                .categories()
                .await
                .map_err(report)?
                .into_iter()
                .find(|row| row.id == id)
                .ok_or_else(|| format!("category '{}' not found", id))?;
            let fields = service.fields(&id).await.map_err(report)?;
            let category = CategorySpec::new(row.id, row.name).with_fields(fields);
            println!("{}", serde_json::to_string_pretty(&category)?);
        }
    }
    Ok(())
}

async fn field_command(service: &Service, command: FieldCommand) -> CliResult<()> {
    match command {
        FieldCommand::List { category, json } => {
            let fields = service.fields(&category).await.map_err(report)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&fields)?);
            } else {
                print_fields(&fields);
            }
        }
        FieldCommand::Add(add) => {
            let category = add.category.clone();
            let draft = draft_from_args(add)?;
            let field = service.add_field(&category, draft).await.map_err(report)?;
            println!(
                "Added field '{}' ({}) at position {}",
                field.label, field.id, field.order
            );
        }
        FieldCommand::Update(update) => {
            let field_id = update.field_id.clone();
            let patch = patch_from_args(update)?;
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            let field = service.update_field(&field_id, patch).await.map_err(report)?;
            println!("Updated field '{}' ({})", field.label, field.id);
        }
        FieldCommand::Remove { category, field_id } => {
            let remaining = service
                .remove_field(&category, &field_id)
                .await
                .map_err(report)?;
            println!("Removed field {}", field_id);
            print_fields(&remaining);
        }
        FieldCommand::Move { category, from, to } => {
            let fields = service
                .move_field(&category, from, to)
                .await
                .map_err(report)?;
            print_fields(&fields);
        }
    }
    Ok(())
}

fn resolve_store_path(store: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match store {
        Some(path) => path,
        None => env::var_os(STORE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE)),
    };
    if candidate.as_os_str().is_empty() {
        return Err("store path cannot be empty".into());
    }
    Ok(candidate)
}

fn open_service(args: StoreArgs) -> CliResult<Service> {
    let path = resolve_store_path(args.store)?;
    tracing::debug!(store = %path.display(), "using store file");
    Ok(FieldConfigService::new(Arc::new(JsonFileFieldStore::new(
        path,
    ))))
}

fn block_on<F: Future<Output = CliResult<()>>>(future: F) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

/// Prints the user-facing notice, plus the stored order when the store handed one back.
fn report(err: AdminError) -> Box<dyn std::error::Error> {
    eprintln!("{}", err.notice().message);
    if let Some(fields) = err.authoritative() {
        eprintln!("Current order:");
        for field in fields {
            eprintln!("  {}. {} ({})", field.order, field.label, field.id);
        }
    }
    err.into()
}

fn print_fields(fields: &[FieldDefinition]) {
    if fields.is_empty() {
        println!("No fields.");
        return;
    }
    for field in fields {
        let mut entry = format!(
            "{}. {} [{}] {}",
            field.order,
            field.label,
            field.kind.as_str(),
            field.id
        );
        if field.required {
            entry.push_str(" *");
        }
        if let Some(condition) = &field.conditional_field {
            entry.push_str(&format!(
                " (shown when {} = {})",
                condition.field_id, condition.value
            ));
        }
        println!("{}", entry);
    }
}

fn draft_from_args(args: FieldAddArgs) -> CliResult<FieldDefinition> {
    if let Some(path) = &args.definition {
        return load_field(path);
    }
    let label = args.label.ok_or("--label is required")?;
    let mut draft = FieldDefinition::new(label, parse_field_type(&args.kind)?)?
        .required(args.required)
        .with_options(args.options)
        .with_bounds(args.min, args.max, args.step);
    if let Some(name) = args.name {
        draft.name = name;
    }
    if let Some(placeholder) = args.placeholder {
        draft = draft.with_placeholder(placeholder);
    }
    if let Some(raw) = args.show_when {
        let (field_id, value) = parse_condition(&raw)?;
        draft = draft.shown_when(field_id, value);
    }
    Ok(draft)
}

fn patch_from_args(args: FieldUpdateArgs) -> CliResult<FieldPatch> {
    let mut patch = FieldPatch {
        label: args.label,
        placeholder: args.placeholder.map(Some),
        required: args.required,
        ..FieldPatch::default()
    };
    if let Some(kind) = args.kind {
        patch.kind = Some(parse_field_type(&kind)?);
    }
    if !args.options.is_empty() {
        patch.options = Some(args.options);
    }
    if args.always_show {
        patch.conditional_field = Some(None);
    } else if let Some(raw) = args.show_when {
        let (field_id, value) = parse_condition(&raw)?;
        patch.conditional_field = Some(Some(form_spec::ConditionalField { field_id, value }));
    }
    Ok(patch)
}
